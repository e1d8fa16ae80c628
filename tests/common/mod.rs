//! Shared setup for integration tests.
//!
//! Tests run against the database named by TEST_DATABASE_URL and skip
//! cleanly when it is unset. Each test creates its own uniquely-named
//! users and groups, so tests stay independent under parallel execution.
#![allow(dead_code)]

use actix_web::cookie::Cookie;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use quill::auth;
use quill::db;
use quill::models::User;

pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    db::MIGRATOR.run(&pool).await.expect("run migrations");
    Some(pool)
}

/// Unique name so parallel tests never collide on the username constraint.
pub fn uniq(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

pub async fn create_user(pool: &PgPool, prefix: &str) -> User {
    let hash = auth::passwords::hash_password("password123").expect("hash password");
    db::users::create_user(pool, &uniq(prefix), &hash)
        .await
        .expect("create test user")
}

/// Log a user in out-of-band and return the session cookie for requests.
pub async fn session_cookie_for(pool: &PgPool, user: &User) -> Cookie<'static> {
    let session = db::sessions::create_session(pool, user.id)
        .await
        .expect("create session");
    auth::session_cookie(session.id)
}

pub async fn create_group(pool: &PgPool, prefix: &str) -> i64 {
    let slug = uniq(prefix);
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO groups (title, slug, description) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(format!("Group {}", slug))
    .bind(&slug)
    .bind("test group")
    .fetch_one(pool)
    .await
    .expect("create test group")
}

pub async fn group_slug(pool: &PgPool, group_id: i64) -> String {
    sqlx::query_scalar("SELECT slug FROM groups WHERE id = $1")
        .bind(group_id)
        .fetch_one(pool)
        .await
        .expect("group slug")
}
