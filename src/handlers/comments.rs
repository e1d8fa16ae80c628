/// Comment submission
use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::{AppError, Result};
use crate::handlers::redirect;
use crate::services::CommentService;

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

/// Attach a comment to a post. Empty text persists nothing and bounces
/// back to the detail page with an inline error flag; an unknown post is
/// a 404.
pub async fn add_comment(
    post_id: web::Path<i64>,
    user: CurrentUser,
    form: web::Form<CommentForm>,
    comments: web::Data<CommentService>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();

    match comments.create(post_id, user.id, &form.text).await {
        Ok(_) => Ok(redirect(&format!("/posts/{}/", post_id))),
        Err(AppError::Validation(_)) => {
            Ok(redirect(&format!("/posts/{}/?comment_error=1", post_id)))
        }
        Err(other) => Err(other),
    }
}
