/// Quill
///
/// A server-rendered blogging platform. Users author posts, organize them
/// into groups, comment on posts, and follow other authors to receive a
/// personalized feed.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers, one per use case
/// - `services`: business logic over the relational store
/// - `models`: entity and display-join structs
/// - `db`: pool creation, migrations, identity persistence
/// - `auth`: password hashing, sessions, request identity extractors
/// - `cache`: injectable full-page response cache
/// - `pagination`: page-window computation for listing views
/// - `render`: template-renderer contract and the built-in HTML renderer
/// - `media`: image blob storage for post attachments
/// - `error`: error types and HTTP mapping
/// - `config`: configuration management
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod pagination;
pub mod render;
pub mod services;
pub mod validators;

pub use config::Config;
pub use error::{AppError, Result};
