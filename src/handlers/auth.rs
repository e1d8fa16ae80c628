/// Registration, login, and logout
use actix_web::{cookie::Cookie, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{self, passwords, SESSION_COOKIE};
use crate::db;
use crate::error::{AppError, Result};
use crate::handlers::{base_context, html, redirect};
use crate::render::TemplateRenderer;
use crate::validators;

/// Clamp `next` to a same-site path. Anything else falls back to the home
/// page so the login form cannot redirect off-site.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

pub async fn login_form(
    query: web::Query<LoginQuery>,
    user: auth::MaybeUser,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let mut ctx = base_context(&user);
    ctx.insert(
        "form".to_string(),
        json!({ "username": "", "next": query.next.as_deref().unwrap_or("") }),
    );
    Ok(html(renderer.render("login", &ctx)?))
}

/// Verify credentials and start a session. Bad credentials re-render the
/// form with a single non-field error; nothing reveals which part failed.
pub async fn login(
    form: web::Form<LoginForm>,
    pool: web::Data<PgPool>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let user = db::users::get_by_username(&pool, &form.username).await?;
    let verified = match &user {
        Some(user) => passwords::verify_password(&form.password, &user.password_hash),
        None => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        let mut ctx = base_context(&auth::MaybeUser(None));
        ctx.insert(
            "form".to_string(),
            json!({
                "username": form.username,
                "next": form.next.as_deref().unwrap_or(""),
                "errors": { "__all__": "Invalid username or password." },
            }),
        );
        return Ok(html(renderer.render("login", &ctx)?));
    };

    let session = db::sessions::create_session(&pool, user.id).await?;
    tracing::info!(username = %user.username, "login");

    Ok(HttpResponse::Found()
        .insert_header((
            actix_web::http::header::LOCATION,
            safe_next(form.next.as_deref()).to_string(),
        ))
        .cookie(auth::session_cookie(session.id))
        .finish())
}

/// End the session named by the cookie and clear it. Safe to call without
/// a live session.
pub async fn logout(req: HttpRequest, pool: web::Data<PgPool>) -> Result<HttpResponse> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if let Ok(session_id) = Uuid::parse_str(cookie.value()) {
            db::sessions::revoke_session(&pool, session_id).await?;
        }
    }

    let mut removal = Cookie::new(SESSION_COOKIE, "");
    removal.set_path("/");
    removal.make_removal();

    Ok(HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, "/"))
        .cookie(removal)
        .finish())
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters."))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}

impl SignupForm {
    /// Field name and message of the first failed check, if any.
    fn first_error(&self) -> Option<(&'static str, String)> {
        if let Err(errors) = self.validate() {
            for field in ["username", "password"] {
                if let Some(list) = errors.field_errors().get(field) {
                    let message = list
                        .first()
                        .and_then(|e| e.message.as_ref())
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Invalid value.".to_string());
                    return Some((field, message));
                }
            }
        }
        if !validators::validate_username(&self.username) {
            return Some((
                "username",
                "Usernames may only contain letters, digits, - and _.".to_string(),
            ));
        }
        None
    }
}

pub async fn signup_form(
    user: auth::MaybeUser,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let mut ctx = base_context(&user);
    ctx.insert("form".to_string(), json!({ "username": "" }));
    Ok(html(renderer.render("signup", &ctx)?))
}

/// Register a new account and log it straight in.
pub async fn signup(
    form: web::Form<SignupForm>,
    pool: web::Data<PgPool>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let render_with_error = |field: &str, message: &str| -> Result<HttpResponse> {
        let mut ctx = base_context(&auth::MaybeUser(None));
        ctx.insert(
            "form".to_string(),
            json!({ "username": form.username, "errors": { field: message } }),
        );
        Ok(html(renderer.render("signup", &ctx)?))
    };

    if let Some((field, message)) = form.first_error() {
        return render_with_error(field, &message);
    }

    let hash = passwords::hash_password(&form.password)?;

    let user = match db::users::create_user(&pool, &form.username, &hash).await {
        Ok(user) => user,
        Err(AppError::Validation(message)) => return render_with_error("username", &message),
        Err(other) => return Err(other),
    };

    let session = db::sessions::create_session(&pool, user.id).await?;
    tracing::info!(username = %user.username, "signup");

    Ok(HttpResponse::Found()
        .insert_header((actix_web::http::header::LOCATION, "/"))
        .cookie(auth::session_cookie(session.id))
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(safe_next(Some("/create/")), "/create/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn signup_form_surfaces_first_problem() {
        let form = SignupForm {
            username: "ab".to_string(),
            password: "longenough".to_string(),
        };
        let (field, _) = form.first_error().unwrap();
        assert_eq!(field, "username");

        let form = SignupForm {
            username: "has space".to_string(),
            password: "longenough".to_string(),
        };
        let (field, message) = form.first_error().unwrap();
        assert_eq!(field, "username");
        assert!(message.contains("letters"));

        let form = SignupForm {
            username: "alice".to_string(),
            password: "short".to_string(),
        };
        let (field, _) = form.first_error().unwrap();
        assert_eq!(field, "password");

        let form = SignupForm {
            username: "alice".to_string(),
            password: "longenough".to_string(),
        };
        assert!(form.first_error().is_none());
    }
}
