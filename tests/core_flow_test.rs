//! Service-level tests of the core rules: listing order, pagination,
//! follow-graph guards, ownership, validation, and referential behavior.
mod common;

use quill::error::AppError;
use quill::services::{CommentService, FollowService, PostService};

#[tokio::test]
async fn author_listing_is_newest_first_with_stable_ties() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let author = common::create_user(&pool, "order").await;

    let mut ids = Vec::new();
    for i in 0..13 {
        let post = posts
            .create(author.id, &format!("post number {}", i), None, None)
            .await
            .unwrap();
        ids.push(post.id);
    }

    // Collapse every timestamp so ordering falls through to the tie-break.
    sqlx::query("UPDATE posts SET created_at = '2026-01-01T00:00:00Z' WHERE author_id = $1")
        .bind(author.id)
        .execute(&pool)
        .await
        .unwrap();

    let (_, page1) = posts.page_author(&author.username, 1).await.unwrap();
    assert_eq!(page1.items.len(), 10);
    assert_eq!(page1.total_pages, 2);
    assert!(page1.has_next);
    assert!(!page1.has_previous);
    let page1_ids: Vec<i64> = page1.items.iter().map(|p| p.id).collect();
    assert_eq!(page1_ids, ids[..10].to_vec(), "ties keep insertion order");

    let (_, page2) = posts.page_author(&author.username, 2).await.unwrap();
    assert_eq!(page2.items.len(), 3);
    let page2_ids: Vec<i64> = page2.items.iter().map(|p| p.id).collect();
    assert_eq!(page2_ids, ids[10..].to_vec());
}

#[tokio::test]
async fn newer_timestamps_come_first() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let author = common::create_user(&pool, "recent").await;

    let old = posts.create(author.id, "older", None, None).await.unwrap();
    let new = posts.create(author.id, "newer", None, None).await.unwrap();
    sqlx::query("UPDATE posts SET created_at = '2025-01-01T00:00:00Z' WHERE id = $1")
        .bind(old.id)
        .execute(&pool)
        .await
        .unwrap();

    let (_, page) = posts.page_author(&author.username, 1).await.unwrap();
    let ids: Vec<i64> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![new.id, old.id]);
}

#[tokio::test]
async fn out_of_range_page_clamps() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let author = common::create_user(&pool, "clamp").await;

    for i in 0..11 {
        posts
            .create(author.id, &format!("p{}", i), None, None)
            .await
            .unwrap();
    }

    let (_, page) = posts.page_author(&author.username, 99).await.unwrap();
    assert_eq!(page.number, 2);
    assert_eq!(page.items.len(), 1);

    let (_, page) = posts.page_author(&author.username, 1).await.unwrap();
    assert_eq!(page.number, 1);
    assert_eq!(page.items.len(), 10);
}

#[tokio::test]
async fn unknown_group_and_author_listings_are_not_found() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());

    let err = posts.page_group(&common::uniq("no-such-group"), 1).await;
    assert!(matches!(err, Err(AppError::NotFound(_))));

    let err = posts.page_author(&common::uniq("no-such-user"), 1).await;
    assert!(matches!(err, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn follow_guards_hold() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let follows = FollowService::new(pool.clone());
    let alice = common::create_user(&pool, "alice").await;
    let bob = common::create_user(&pool, "bob").await;

    // Self-follow never creates an edge.
    assert!(!follows.follow(alice.id, alice.id).await.unwrap());
    assert!(!follows.is_following(alice.id, alice.id).await.unwrap());

    assert!(follows.follow(alice.id, bob.id).await.unwrap());
    assert!(!follows.follow(alice.id, bob.id).await.unwrap());
    assert!(follows.is_following(alice.id, bob.id).await.unwrap());
    assert!(!follows.is_following(bob.id, alice.id).await.unwrap());

    let edges: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE user_id = $1 AND author_id = $2",
    )
    .bind(alice.id)
    .bind(bob.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(edges, 1);

    assert!(follows
        .unfollow_by_username(alice.id, &bob.username)
        .await
        .unwrap());
    assert!(!follows
        .unfollow_by_username(alice.id, &bob.username)
        .await
        .unwrap());
    assert!(!follows.is_following(alice.id, bob.id).await.unwrap());
}

#[tokio::test]
async fn feed_contains_followed_authors_only() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let follows = FollowService::new(pool.clone());
    let reader = common::create_user(&pool, "reader").await;
    let followed = common::create_user(&pool, "followed").await;
    let other = common::create_user(&pool, "other").await;

    follows.follow(reader.id, followed.id).await.unwrap();
    let wanted = posts
        .create(followed.id, "from someone I follow", None, None)
        .await
        .unwrap();
    posts
        .create(other.id, "from a stranger", None, None)
        .await
        .unwrap();

    let feed = posts.page_feed(reader.id, 1).await.unwrap();
    let ids: Vec<i64> = feed.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![wanted.id]);

    // A viewer following no one gets an empty feed, not an error.
    let feed = posts.page_feed(other.id, 1).await.unwrap();
    assert!(feed.items.is_empty());
    assert_eq!(feed.total_pages, 1);
}

#[tokio::test]
async fn post_validation_rejects_bad_input() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let author = common::create_user(&pool, "writer").await;

    let err = posts.create(author.id, "   \n ", None, None).await;
    assert!(matches!(err, Err(AppError::Validation(_))));

    let err = posts.create(author.id, "text", Some(-1), None).await;
    assert!(matches!(err, Err(AppError::Validation(_))));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
        .bind(author.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "failed validation must persist nothing");
}

#[tokio::test]
async fn edits_are_scoped_to_the_author() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let author = common::create_user(&pool, "owner").await;
    let intruder = common::create_user(&pool, "intruder").await;

    let post = posts
        .create(author.id, "original", None, None)
        .await
        .unwrap();

    let changed = posts
        .update(post.id, intruder.id, "hijacked", None, None)
        .await
        .unwrap();
    assert!(!changed);

    let changed = posts
        .update(post.id, author.id, "revised", None, None)
        .await
        .unwrap();
    assert!(changed);

    let stored = posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "revised");
    assert_eq!(stored.author_id, author.id);
}

#[tokio::test]
async fn empty_comment_persists_nothing() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let comments = CommentService::new(pool.clone());
    let author = common::create_user(&pool, "commenter").await;
    let post = posts.create(author.id, "a post", None, None).await.unwrap();

    let err = comments.create(post.id, author.id, "  ").await;
    assert!(matches!(err, Err(AppError::Validation(_))));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(post.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let err = comments.create(post.id + 1_000_000, author.id, "hello").await;
    assert!(matches!(err, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn deleting_a_post_cascades_to_comments() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let comments = CommentService::new(pool.clone());
    let author = common::create_user(&pool, "cascade").await;
    let post = posts.create(author.id, "doomed", None, None).await.unwrap();
    comments.create(post.id, author.id, "nice").await.unwrap();

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post.id)
        .execute(&pool)
        .await
        .unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(post.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn deleting_a_group_detaches_its_posts() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let posts = PostService::new(pool.clone());
    let author = common::create_user(&pool, "grouped").await;
    let group_id = common::create_group(&pool, "doomed-group").await;

    let post = posts
        .create(author.id, "survives its group", Some(group_id), None)
        .await
        .unwrap();

    sqlx::query("DELETE FROM groups WHERE id = $1")
        .bind(group_id)
        .execute(&pool)
        .await
        .unwrap();

    let stored = posts.get(post.id).await.unwrap().unwrap();
    assert_eq!(stored.group_id, None);
    assert_eq!(stored.text, "survives its group");
}

#[tokio::test]
async fn duplicate_usernames_are_rejected() {
    let Some(pool) = common::test_pool().await else {
        return;
    };
    let name = common::uniq("taken");
    let hash = quill::auth::passwords::hash_password("password123").unwrap();

    quill::db::users::create_user(&pool, &name, &hash).await.unwrap();
    let err = quill::db::users::create_user(&pool, &name, &hash).await;
    assert!(matches!(err, Err(AppError::Validation(_))));
}
