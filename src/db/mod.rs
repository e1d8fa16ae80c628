/// Database access
///
/// Pool creation, embedded migrations, and identity persistence. Domain
/// queries for posts/comments/follows live in `services`.
pub mod sessions;
pub mod users;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Embedded migrations from `./migrations`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Create the PostgreSQL connection pool.
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.url)
        .await?;
    info!(
        max_connections = config.max_connections,
        "database pool created"
    );
    Ok(pool)
}

/// Apply pending migrations.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    MIGRATOR.run(pool).await?;
    info!("database migrations applied");
    Ok(())
}
