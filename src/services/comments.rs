/// Comment service
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Comment, CommentView};
use crate::validators;

#[derive(Clone)]
pub struct CommentService {
    pool: PgPool,
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Comments for the detail page, newest-first.
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>> {
        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.id, c.post_id, c.text, c.created_at,
                   u.username AS author_username
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at DESC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Add a comment to an existing post. NotFound if the post is gone;
    /// empty text persists nothing.
    pub async fn create(&self, post_id: i64, author_id: Uuid, text: &str) -> Result<Comment> {
        validators::validate_text(text).map_err(AppError::Validation)?;

        let post_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        if !post_exists {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, created_at
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }
}
