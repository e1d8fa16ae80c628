/// Follow service
///
/// Follow edges are pure presence/absence: create and delete are both
/// idempotent, duplicates are closed out by the unique (user, author)
/// constraint rather than a racy read-before-write.
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Clone)]
pub struct FollowService {
    pool: PgPool,
}

impl FollowService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a follow edge; returns true if a new row was inserted.
    /// Self-follow and duplicates are no-ops.
    pub async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        if user_id == author_id {
            return Ok(false);
        }

        let inserted = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    /// Delete the follow edge to the named author if present; absence is
    /// not an error.
    pub async fn unfollow_by_username(&self, user_id: Uuid, author_username: &str) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follows
            USING users u
            WHERE follows.author_id = u.id
              AND follows.user_id = $1
              AND u.username = $2
            "#,
        )
        .bind(user_id)
        .bind(author_username)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    /// Does `user_id` follow `author_id`?
    pub async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let following: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(following)
    }
}
