use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod rules;
mod schema;
mod services;

use config::AppConfig;
use troth_shared::clients::db::{create_pool, DbPool};
use troth_shared::clients::minio::MinioClient;
use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::middleware::{init_metrics, init_tracing, metrics_middleware, render_metrics};

const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub minio: MinioClient,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("troth-moderation");

    let config = AppConfig::load()?;
    let port = config.port;

    // Set JWT_SECRET env var for the auth extractor middleware
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;
    let metrics = init_metrics()?;

    let state = Arc::new(AppState { db, config, rabbitmq, minio, metrics });

    let proposal_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_proposal_answered(proposal_state).await {
            tracing::error!(error = %e, "proposal event subscriber failed");
        }
    });

    let admin_routes = Router::new()
        .route("/reports", get(routes::admin_routes::list_reports))
        .route("/reports/:id", get(routes::admin_routes::get_report))
        .route("/reports/:id/review", put(routes::admin_routes::review_report))
        .route("/users/:id", get(routes::admin_routes::get_user_sanctions))
        .route("/users/:id/sanction", post(routes::admin_routes::issue_sanction))
        .route("/users/:id/sanction/:sid", delete(routes::admin_routes::lift_sanction))
        .route("/sanctions", get(routes::admin_routes::list_active_sanctions))
        .route("/stats", get(routes::admin_routes::get_stats))
        .route("/audit-log", get(routes::admin_routes::get_audit_log))
        .route("/verifications", get(routes::verification_routes::list_verifications))
        .route("/verifications/:id", get(routes::verification_routes::get_verification))
        .route("/verifications/:id/review", put(routes::verification_routes::review_verification))
        .route("/proposals", get(routes::proposal_routes::list_proposal_alerts))
        .route("/proposals/:id/acknowledge", put(routes::proposal_routes::acknowledge_proposal_alert));

    let metrics_handle = state.metrics.clone();

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || render_metrics(metrics_handle.clone())))
        .route("/report", post(routes::user_routes::create_report))
        .route("/verifications", post(routes::verification_routes::submit_verification))
        .route(
            "/verifications/upload",
            post(routes::verification_routes::upload_verification).layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES)),
        )
        .route("/verifications/mine", get(routes::verification_routes::my_verifications))
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "troth-moderation starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
