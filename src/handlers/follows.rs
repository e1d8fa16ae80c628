/// Follow graph: personalized feed and follow/unfollow actions
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::auth::{CurrentUser, MaybeUser};
use crate::db;
use crate::error::{AppError, Result};
use crate::handlers::{base_context, html, redirect, PageQuery};
use crate::pagination;
use crate::render::TemplateRenderer;
use crate::services::{FollowService, PostService};

/// Feed of posts by followed authors. Login required; an empty follow set
/// is an empty feed, not an error.
pub async fn follow_index(
    query: web::Query<PageQuery>,
    user: CurrentUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let page = pagination::requested_page(query.page.as_deref());
    let page_obj = posts.page_feed(user.id, page).await?;

    let mut ctx = base_context(&MaybeUser(Some(user)));
    ctx.insert("page_obj".to_string(), serde_json::to_value(&page_obj)?);

    Ok(html(renderer.render("follow", &ctx)?))
}

/// Follow an author, then return to their profile. Self-follow and
/// duplicates are silent no-ops; an unknown author is a 404.
pub async fn profile_follow(
    username: web::Path<String>,
    user: CurrentUser,
    pool: web::Data<PgPool>,
    follows: web::Data<FollowService>,
) -> Result<HttpResponse> {
    let author = db::users::get_by_username(&pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("author '{}'", username)))?;

    follows.follow(user.id, author.id).await?;
    Ok(redirect(&format!("/profile/{}/", author.username)))
}

/// Drop the follow edge to an author, then return to their profile.
/// Unfollowing someone not followed is a silent no-op.
pub async fn profile_unfollow(
    username: web::Path<String>,
    user: CurrentUser,
    pool: web::Data<PgPool>,
    follows: web::Data<FollowService>,
) -> Result<HttpResponse> {
    let author = db::users::get_by_username(&pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("author '{}'", username)))?;

    follows.unfollow_by_username(user.id, &author.username).await?;
    Ok(redirect(&format!("/profile/{}/", author.username)))
}
