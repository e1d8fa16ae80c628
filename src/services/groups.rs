/// Group service
///
/// Groups are created administratively (seed data or SQL); the application
/// surface only reads them.
use sqlx::PgPool;

use crate::error::Result;
use crate::models::Group;

#[derive(Clone)]
pub struct GroupService {
    pool: PgPool,
}

impl GroupService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, title, slug, description
            FROM groups
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    /// All groups, for the post form's group selector.
    pub async fn list(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, title, slug, description
            FROM groups
            ORDER BY title, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    pub async fn exists(&self, group_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM groups WHERE id = $1)")
            .bind(group_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
