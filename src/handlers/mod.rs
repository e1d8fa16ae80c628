/// HTTP handlers
///
/// One module per surface area. Handlers stay thin: extract identity and
/// input, call a service, hand a context to the renderer or redirect.
pub mod auth;
pub mod comments;
pub mod follows;
pub mod media;
pub mod posts;

use actix_web::{http::header, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::MaybeUser;
use crate::render::Context;

/// `?page=N` on every listing view
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Context seeded with the requesting identity for the nav bar.
pub(crate) fn base_context(user: &MaybeUser) -> Context {
    let mut ctx = Context::new();
    let value = match &user.0 {
        Some(u) => json!({ "username": u.username }),
        None => Value::Null,
    };
    ctx.insert("user".to_string(), value);
    ctx
}

pub(crate) fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}
