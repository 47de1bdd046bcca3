use axum::{routing::{get, post, put, delete}, Router, extract::DefaultBodyLimit};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod lifecycle;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use troth_shared::clients::db::{create_pool, DbPool};
use troth_shared::clients::minio::MinioClient;
use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::clients::redis::RedisClient;
use troth_shared::middleware::{init_metrics, init_tracing, metrics_middleware, render_metrics};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub minio: MinioClient,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("troth-user");

    let config = AppConfig::load()?;
    let port = config.port;

    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;
    let metrics = init_metrics()?;

    let state = Arc::new(AppState { db, config, rabbitmq, redis, minio, metrics });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_user_registered(sub_state).await {
            tracing::error!(error = %e, "user.registered subscriber failed");
        }
    });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_status_changed(sub_state).await {
            tracing::error!(error = %e, "user.status_changed subscriber failed");
        }
    });

    let metrics_handle = state.metrics.clone();

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || render_metrics(metrics_handle.clone())))
        // Profiles
        .route("/me", get(routes::profile::get_profile).patch(routes::profile::update_profile))
        .route("/profiles/:id", get(routes::profile::get_public_profile))
        .route("/search", get(routes::search::search_profiles))
        .route("/photo", post(routes::photo::upload_photo)
            .layer(DefaultBodyLimit::max(10 * 1024 * 1024)))
        // Favorites
        .route("/favorites", get(routes::favorites::list_favorites))
        .route("/favorites/:id", post(routes::favorites::add_favorite).delete(routes::favorites::remove_favorite))
        // Interests
        .route("/interests", post(routes::interests::send_interest))
        .route("/interests/quota", get(routes::interests::quota))
        .route("/interests/received", get(routes::interests::list_received))
        .route("/interests/sent", get(routes::interests::list_sent))
        .route("/interests/:id", delete(routes::interests::withdraw_interest))
        .route("/interests/:id/respond", put(routes::interests::respond_interest))
        // Matches
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/:id", delete(routes::matches::unmatch))
        // Proposals
        .route("/proposals", get(routes::proposals::list_proposals).post(routes::proposals::create_proposal))
        .route("/proposals/:id/respond", put(routes::proposals::respond_proposal))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "troth-user starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
