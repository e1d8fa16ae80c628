use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill::cache::{PageCache, RedisPageCache};
use quill::config::Config;
use quill::handlers;
use quill::media::MediaStore;
use quill::render::{HtmlRenderer, TemplateRenderer};
use quill::services::{CommentService, FollowService, GroupService, PostService};
use quill::{db, AppError};

async fn health(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool.get_ref())
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    tracing::info!(env = %config.app.env, "starting quill");

    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;
    tracing::info!("database ready");

    let redis_client = redis::Client::open(config.cache.url.clone())?;
    let redis_manager = redis::aio::ConnectionManager::new(redis_client).await?;
    let cache: Arc<dyn PageCache> = Arc::new(RedisPageCache::new(redis_manager));
    tracing::info!("redis connected");

    let renderer: Arc<dyn TemplateRenderer> = Arc::new(HtmlRenderer);
    let media_store = web::Data::new(MediaStore::new(config.media.root.clone()));

    let bind = (config.app.host.clone(), config.app.port);
    tracing::info!(host = %bind.0, port = bind.1, "listening");

    let pool_data = web::Data::new(pool.clone());
    let config_data = web::Data::new(config);
    let cache_data = web::Data::from(cache);
    let renderer_data = web::Data::from(renderer);
    let post_service = web::Data::new(PostService::new(pool.clone()));
    let group_service = web::Data::new(GroupService::new(pool.clone()));
    let comment_service = web::Data::new(CommentService::new(pool.clone()));
    let follow_service = web::Data::new(FollowService::new(pool.clone()));

    HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(cache_data.clone())
            .app_data(renderer_data.clone())
            .app_data(media_store.clone())
            .app_data(post_service.clone())
            .app_data(group_service.clone())
            .app_data(comment_service.clone())
            .app_data(follow_service.clone())
            .wrap(TracingLogger::default())
            .wrap(Logger::default())
            .route("/health", web::get().to(health))
            .route("/", web::get().to(handlers::posts::index))
            .route("/group/{slug}/", web::get().to(handlers::posts::group_posts))
            .route("/create/", web::get().to(handlers::posts::post_create_form))
            .route("/create/", web::post().to(handlers::posts::post_create))
            .route("/posts/{post_id}/", web::get().to(handlers::posts::post_detail))
            .route(
                "/posts/{post_id}/edit/",
                web::get().to(handlers::posts::post_edit_form),
            )
            .route(
                "/posts/{post_id}/edit/",
                web::post().to(handlers::posts::post_edit),
            )
            .route(
                "/posts/{post_id}/comment/",
                web::post().to(handlers::comments::add_comment),
            )
            .route("/follow/", web::get().to(handlers::follows::follow_index))
            .route(
                "/profile/{username}/",
                web::get().to(handlers::posts::profile),
            )
            .route(
                "/profile/{username}/follow/",
                web::post().to(handlers::follows::profile_follow),
            )
            .route(
                "/profile/{username}/unfollow/",
                web::post().to(handlers::follows::profile_unfollow),
            )
            .route("/auth/login/", web::get().to(handlers::auth::login_form))
            .route("/auth/login/", web::post().to(handlers::auth::login))
            .route("/auth/logout/", web::post().to(handlers::auth::logout))
            .route("/auth/signup/", web::get().to(handlers::auth::signup_form))
            .route("/auth/signup/", web::post().to(handlers::auth::signup))
            .route(
                "/media/{path:.*}",
                web::get().to(handlers::media::serve_media),
            )
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
