/// Session database operations
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Session, User};

/// Sessions live this long; there is no sliding renewal.
const SESSION_TTL_DAYS: i64 = 30;

/// Create a new session for a logged-in user.
pub async fn create_session(pool: &PgPool, user_id: Uuid) -> Result<Session> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(SESSION_TTL_DAYS);

    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (id, user_id, created_at, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, created_at, expires_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(now)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(session)
}

/// Resolve a session cookie value to its user, if the session is live.
pub async fn session_user(pool: &PgPool, session_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.password_hash, u.created_at
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.id = $1 AND s.expires_at > NOW()
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Delete a session. Absence is not an error.
pub async fn revoke_session(pool: &PgPool, session_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;

    Ok(())
}
