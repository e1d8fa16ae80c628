/// Data models
///
/// Entity structs map 1:1 onto the tables in `migrations/`; the `*View`
/// structs are the display joins listing and detail pages render from.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered identity capable of authoring content
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side login record referenced by the session cookie
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A named topical collection of posts
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A single authored article
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

/// Post joined with author username and group title/slug for display
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

/// A reply attached to exactly one post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Comment joined with author username for display
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_username: String,
}

/// A directed subscription edge: `user_id` follows `author_id`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: i64,
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}
