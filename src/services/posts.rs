/// Post service - listing rules, creation, and author-only edits
///
/// Every listing returns `PostView` rows (author and group pre-resolved)
/// ordered newest-first by creation timestamp; equal timestamps keep
/// insertion order via the ascending id tie-break.
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Group, Post, PostView, User};
use crate::pagination::{self, Page, POSTS_PER_PAGE};
use crate::validators;

#[derive(Clone)]
pub struct PostService {
    pool: PgPool,
}

impl PostService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All posts, paginated.
    pub async fn page_all(&self, requested_page: i64) -> Result<Page<PostView>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        let window = pagination::window(total, POSTS_PER_PAGE, requested_page);

        let items = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.text, p.created_at, p.image, p.author_id,
                   u.username AS author_username,
                   p.group_id, g.title AS group_title, g.slug AS group_slug
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            ORDER BY p.created_at DESC, p.id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, window))
    }

    /// Posts in one group, paginated. NotFound if the slug is unknown.
    pub async fn page_group(
        &self,
        slug: &str,
        requested_page: i64,
    ) -> Result<(Group, Page<PostView>)> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = $1")
            .bind(group.id)
            .fetch_one(&self.pool)
            .await?;
        let window = pagination::window(total, POSTS_PER_PAGE, requested_page);

        let items = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.text, p.created_at, p.image, p.author_id,
                   u.username AS author_username,
                   p.group_id, g.title AS group_title, g.slug AS group_slug
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            WHERE p.group_id = $1
            ORDER BY p.created_at DESC, p.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(group.id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((group, Page::new(items, window)))
    }

    /// Posts by one author, paginated. NotFound if the username is unknown.
    pub async fn page_author(
        &self,
        username: &str,
        requested_page: i64,
    ) -> Result<(User, Page<PostView>)> {
        let author = crate::db::users::get_by_username(&self.pool, username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("author '{}'", username)))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author.id)
            .fetch_one(&self.pool)
            .await?;
        let window = pagination::window(total, POSTS_PER_PAGE, requested_page);

        let items = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.text, p.created_at, p.image, p.author_id,
                   u.username AS author_username,
                   p.group_id, g.title AS group_title, g.slug AS group_slug
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            WHERE p.author_id = $1
            ORDER BY p.created_at DESC, p.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(author.id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((author, Page::new(items, window)))
    }

    /// Posts authored by users the viewer follows, paginated. Empty when
    /// the viewer follows no one.
    pub async fn page_feed(&self, viewer_id: Uuid, requested_page: i64) -> Result<Page<PostView>> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM posts p
            WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1)
            "#,
        )
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;
        let window = pagination::window(total, POSTS_PER_PAGE, requested_page);

        let items = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.text, p.created_at, p.image, p.author_id,
                   u.username AS author_username,
                   p.group_id, g.title AS group_title, g.slug AS group_slug
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1)
            ORDER BY p.created_at DESC, p.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(viewer_id)
        .bind(window.limit)
        .bind(window.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, window))
    }

    /// One post with author/group resolved, for the detail page.
    pub async fn get_view(&self, post_id: i64) -> Result<Option<PostView>> {
        let post = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.text, p.created_at, p.image, p.author_id,
                   u.username AS author_username,
                   p.group_id, g.title AS group_title, g.slug AS group_slug
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN groups g ON g.id = p.group_id
            WHERE p.id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Raw post row, for ownership checks and edit-form initial values.
    pub async fn get(&self, post_id: i64) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, text, created_at, author_id, group_id, image
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Create a new post. Text must be non-empty; a group reference, if
    /// given, must exist.
    pub async fn create(
        &self,
        author_id: Uuid,
        text: &str,
        group_id: Option<i64>,
        image: Option<&str>,
    ) -> Result<Post> {
        validators::validate_text(text).map_err(AppError::Validation)?;

        if let Some(gid) = group_id {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM groups WHERE id = $1)")
                    .bind(gid)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(AppError::Validation(
                    "Selected group does not exist.".to_string(),
                ));
            }
        }

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, author_id, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, text, created_at, author_id, group_id, image
            "#,
        )
        .bind(text)
        .bind(author_id)
        .bind(group_id)
        .bind(image)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    /// Edit text/group/image in place. The UPDATE is scoped to the author
    /// so a non-owner write affects zero rows; creation timestamp and
    /// author are never touched. `new_image = None` keeps the current one.
    pub async fn update(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: &str,
        group_id: Option<i64>,
        new_image: Option<&str>,
    ) -> Result<bool> {
        validators::validate_text(text).map_err(AppError::Validation)?;

        if let Some(gid) = group_id {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM groups WHERE id = $1)")
                    .bind(gid)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(AppError::Validation(
                    "Selected group does not exist.".to_string(),
                ));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET text = $1, group_id = $2, image = COALESCE($3, image)
            WHERE id = $4 AND author_id = $5
            "#,
        )
        .bind(text)
        .bind(group_id)
        .bind(new_image)
        .bind(post_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
