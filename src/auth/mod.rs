/// Authentication
///
/// Browser-cookie sessions: a login creates a `sessions` row and sets its
/// id in an HttpOnly cookie. The extractors below resolve that cookie to
/// the requesting identity.
///
/// `CurrentUser` enforces authentication - extraction fails with a
/// redirect to the login entry point carrying a `next` parameter.
/// `MaybeUser` never fails and is the `current_identity()` contract for
/// pages that render for both anonymous and logged-in visitors.
pub mod passwords;

use actix_web::cookie::Cookie;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::AppError;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "quill_session";

/// Requesting identity, resolved from the session cookie
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

/// Optional identity for pages that serve anonymous visitors too
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

/// Build the session cookie set on login.
pub fn session_cookie(session_id: Uuid) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, session_id.to_string())
        .path("/")
        .http_only(true)
        .finish()
}

async fn identity_from_request(req: &HttpRequest) -> Option<CurrentUser> {
    let pool = req.app_data::<web::Data<PgPool>>()?.get_ref().clone();
    let cookie = req.cookie(SESSION_COOKIE)?;
    let session_id = Uuid::parse_str(cookie.value()).ok()?;

    match db::sessions::session_user(&pool, session_id).await {
        Ok(Some(user)) => Some(CurrentUser {
            id: user.id,
            username: user.username,
        }),
        Ok(None) => None,
        Err(err) => {
            tracing::warn!("session lookup failed: {}", err);
            None
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match identity_from_request(&req).await {
                Some(user) => Ok(user),
                None => Err(AppError::LoginRequired {
                    next: req.path().to_string(),
                }),
            }
        })
    }
}

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { Ok(MaybeUser(identity_from_request(&req).await)) })
    }
}
