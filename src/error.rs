/// Error types
///
/// Errors are resolved at the handler boundary and converted to the HTTP
/// responses a browser expects from a server-rendered site: 404 pages,
/// redirects to the login entry point, and re-rendered forms (the
/// `Validation` variant is normally intercepted by the handler before it
/// can surface as a response).
use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::render::escape;

/// Result type for quill operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced group, post, or author does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Empty or malformed user input; handlers re-render the form
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anonymous caller on an authentication-required path
    #[error("Login required")]
    LoginRequired { next: String },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Cache operation failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Login entry point; unauthenticated requests are redirected here with a
/// `next` parameter pointing back at the originally requested path.
pub const LOGIN_PATH: &str = "/auth/login/";

/// Build the redirect target for an unauthenticated request.
pub fn login_redirect_target(next: &str) -> String {
    format!("{}?next={}", LOGIN_PATH, urlencoding::encode(next))
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::LoginRequired { .. } => StatusCode::FOUND,
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::LoginRequired { next } => HttpResponse::Found()
                .insert_header((header::LOCATION, login_redirect_target(next)))
                .finish(),
            AppError::NotFound(what) => HttpResponse::NotFound()
                .content_type("text/html; charset=utf-8")
                .body(format!(
                    "<!DOCTYPE html><html><head><title>Not found</title></head>\
                     <body><h1>404 Not Found</h1><p>{}</p></body></html>",
                    escape(what)
                )),
            other => {
                tracing::error!("request failed: {}", other);
                HttpResponse::build(other.status_code())
                    .content_type("text/html; charset=utf-8")
                    .body(
                        "<!DOCTYPE html><html><head><title>Server error</title></head>\
                         <body><h1>500 Server Error</h1></body></html>"
                            .to_string(),
                    )
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_encodes_next() {
        assert_eq!(
            login_redirect_target("/posts/7/comment/"),
            "/auth/login/?next=%2Fposts%2F7%2Fcomment%2F"
        );
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::LoginRequired { next: "/".into() }.status_code(),
            StatusCode::FOUND
        );
        assert_eq!(
            AppError::Database("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn login_required_response_carries_location() {
        let resp = AppError::LoginRequired {
            next: "/create/".into(),
        }
        .error_response();
        let location = resp
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert_eq!(location, "/auth/login/?next=%2Fcreate%2F");
    }
}
