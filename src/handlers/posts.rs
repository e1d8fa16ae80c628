/// Post pages: listings, detail, creation, and author-only edits
use std::time::Duration;

use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{CurrentUser, MaybeUser};
use crate::cache::{PageCache, INDEX_PAGE_KEY};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::handlers::{base_context, html, redirect, PageQuery};
use crate::media::MediaStore;
use crate::pagination;
use crate::render::{Context, TemplateRenderer};
use crate::services::{GroupService, PostService};

/// Multipart body of the post create/edit forms. Every field is optional
/// at the protocol level; validation happens against the decoded values.
#[derive(Debug, MultipartForm)]
pub struct PostForm {
    pub text: Option<Text<String>>,
    pub group: Option<Text<String>>,
    #[multipart(limit = "10MB")]
    pub image: Option<TempFile>,
}

impl PostForm {
    fn text(&self) -> &str {
        self.text.as_ref().map(|t| t.as_str()).unwrap_or("")
    }

    /// The group select posts an empty string for "no group".
    fn group_id(&self) -> Option<i64> {
        self.group
            .as_ref()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse().ok())
    }

    async fn image_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.image {
            Some(file) if file.size > 0 => {
                let bytes = tokio::fs::read(file.file.path()).await?;
                Ok(Some(bytes))
            }
            _ => Ok(None),
        }
    }
}

/// Home page. The rendered body is cached whole for a short TTL, so reads
/// within the window see the previous body even after new posts land.
/// Cache failures degrade to rendering fresh.
pub async fn index(
    query: web::Query<PageQuery>,
    user: MaybeUser,
    posts: web::Data<PostService>,
    cache: web::Data<dyn PageCache>,
    renderer: web::Data<dyn TemplateRenderer>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    match cache.get(INDEX_PAGE_KEY).await {
        Ok(Some(body)) => return Ok(html(body)),
        Ok(None) => {}
        Err(err) => tracing::warn!("index cache read failed: {}", err),
    }

    let page = pagination::requested_page(query.page.as_deref());
    let page_obj = posts.page_all(page).await?;

    let mut ctx = base_context(&user);
    ctx.insert("page_obj".to_string(), serde_json::to_value(&page_obj)?);
    let body = renderer.render("index", &ctx)?;

    let ttl = Duration::from_secs(config.cache.index_ttl_secs);
    if let Err(err) = cache.set(INDEX_PAGE_KEY, &body, ttl).await {
        tracing::warn!("index cache write failed: {}", err);
    }

    Ok(html(body))
}

/// Posts of one group, newest-first. Unknown slug is a 404.
pub async fn group_posts(
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
    user: MaybeUser,
    posts: web::Data<PostService>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let page = pagination::requested_page(query.page.as_deref());
    let (group, page_obj) = posts.page_group(&slug, page).await?;

    let mut ctx = base_context(&user);
    ctx.insert("group".to_string(), serde_json::to_value(&group)?);
    ctx.insert("page_obj".to_string(), serde_json::to_value(&page_obj)?);

    Ok(html(renderer.render("group_list", &ctx)?))
}

/// Author profile: their posts plus a follow/unfollow control for other
/// logged-in visitors.
pub async fn profile(
    username: web::Path<String>,
    query: web::Query<PageQuery>,
    user: MaybeUser,
    posts: web::Data<PostService>,
    follows: web::Data<crate::services::FollowService>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let page = pagination::requested_page(query.page.as_deref());
    let (author, page_obj) = posts.page_author(&username, page).await?;

    let following = match &user.0 {
        Some(viewer) => follows.is_following(viewer.id, author.id).await?,
        None => false,
    };

    let mut ctx = base_context(&user);
    ctx.insert("author".to_string(), serde_json::to_value(&author)?);
    ctx.insert("following".to_string(), Value::Bool(following));
    ctx.insert("page_obj".to_string(), serde_json::to_value(&page_obj)?);

    Ok(html(renderer.render("profile", &ctx)?))
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub comment_error: Option<String>,
}

/// Single post with its comments and the add-comment form.
pub async fn post_detail(
    post_id: web::Path<i64>,
    query: web::Query<DetailQuery>,
    user: MaybeUser,
    posts: web::Data<PostService>,
    comments: web::Data<crate::services::CommentService>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = posts
        .get_view(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;
    let comment_list = comments.list_for_post(post_id).await?;

    let mut ctx = base_context(&user);
    ctx.insert("post".to_string(), serde_json::to_value(&post)?);
    ctx.insert(
        "comments".to_string(),
        serde_json::to_value(&comment_list)?,
    );
    if query.comment_error.is_some() {
        ctx.insert(
            "form".to_string(),
            json!({ "errors": { "text": "Text cannot be empty." } }),
        );
    }

    Ok(html(renderer.render("post_detail", &ctx)?))
}

async fn form_context(
    user: &CurrentUser,
    groups: &GroupService,
    form: Value,
    is_edit: bool,
) -> Result<Context> {
    let mut ctx = base_context(&MaybeUser(Some(user.clone())));
    ctx.insert(
        "groups".to_string(),
        serde_json::to_value(&groups.list().await?)?,
    );
    ctx.insert("form".to_string(), form);
    ctx.insert("is_edit".to_string(), Value::Bool(is_edit));
    Ok(ctx)
}

/// Blank creation form. Login required.
pub async fn post_create_form(
    user: CurrentUser,
    groups: web::Data<GroupService>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let ctx = form_context(&user, &groups, json!({ "text": "" }), false).await?;
    Ok(html(renderer.render("create_post", &ctx)?))
}

/// Create a post. Validation failures re-render the form with the entered
/// values; success lands on the author's profile.
pub async fn post_create(
    user: CurrentUser,
    form: MultipartForm<PostForm>,
    posts: web::Data<PostService>,
    groups: web::Data<GroupService>,
    store: web::Data<MediaStore>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let text = form.text().to_string();
    let group_id = form.group_id();

    let image = match form.image_bytes().await? {
        Some(bytes) => match store.save_image(&bytes).await {
            Ok(rel) => Some(rel),
            Err(AppError::Validation(msg)) => {
                let ctx = form_context(
                    &user,
                    &groups,
                    json!({ "text": text, "group_id": group_id, "errors": { "image": msg } }),
                    false,
                )
                .await?;
                return Ok(html(renderer.render("create_post", &ctx)?));
            }
            Err(other) => return Err(other),
        },
        None => None,
    };

    match posts
        .create(user.id, &text, group_id, image.as_deref())
        .await
    {
        Ok(_) => Ok(redirect(&format!("/profile/{}/", user.username))),
        Err(AppError::Validation(msg)) => {
            let ctx = form_context(
                &user,
                &groups,
                json!({ "text": text, "group_id": group_id, "errors": { "text": msg } }),
                false,
            )
            .await?;
            Ok(html(renderer.render("create_post", &ctx)?))
        }
        Err(other) => Err(other),
    }
}

/// Edit form, prefilled. Non-authors (and unknown posts) are silently
/// redirected to the detail page rather than shown an error.
pub async fn post_edit_form(
    post_id: web::Path<i64>,
    user: CurrentUser,
    posts: web::Data<PostService>,
    groups: web::Data<GroupService>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = match posts.get(post_id).await? {
        Some(post) if post.author_id == user.id => post,
        _ => return Ok(redirect(&format!("/posts/{}/", post_id))),
    };

    let form = json!({
        "post_id": post.id,
        "text": post.text,
        "group_id": post.group_id,
    });
    let ctx = form_context(&user, &groups, form, true).await?;
    Ok(html(renderer.render("create_post", &ctx)?))
}

/// Apply an edit. The ownership check mirrors the form: a non-author write
/// changes nothing and lands on the detail page.
pub async fn post_edit(
    post_id: web::Path<i64>,
    user: CurrentUser,
    form: MultipartForm<PostForm>,
    posts: web::Data<PostService>,
    groups: web::Data<GroupService>,
    store: web::Data<MediaStore>,
    renderer: web::Data<dyn TemplateRenderer>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let detail = format!("/posts/{}/", post_id);

    match posts.get(post_id).await? {
        Some(post) if post.author_id == user.id => {}
        _ => return Ok(redirect(&detail)),
    }

    let text = form.text().to_string();
    let group_id = form.group_id();

    let new_image = match form.image_bytes().await? {
        Some(bytes) => match store.save_image(&bytes).await {
            Ok(rel) => Some(rel),
            Err(AppError::Validation(msg)) => {
                let form = json!({
                    "post_id": post_id, "text": text, "group_id": group_id,
                    "errors": { "image": msg },
                });
                let ctx = form_context(&user, &groups, form, true).await?;
                return Ok(html(renderer.render("create_post", &ctx)?));
            }
            Err(other) => return Err(other),
        },
        None => None,
    };

    match posts
        .update(post_id, user.id, &text, group_id, new_image.as_deref())
        .await
    {
        Ok(_) => Ok(redirect(&detail)),
        Err(AppError::Validation(msg)) => {
            let form = json!({
                "post_id": post_id, "text": text, "group_id": group_id,
                "errors": { "text": msg },
            });
            let ctx = form_context(&user, &groups, form, true).await?;
            Ok(html(renderer.render("create_post", &ctx)?))
        }
        Err(other) => Err(other),
    }
}
