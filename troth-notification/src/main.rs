use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod hub;
mod models;
mod routes;
mod schema;
mod services;
mod templates;

use config::AppConfig;
use hub::NotificationHub;
use troth_shared::clients::db::{create_pool, DbPool};
use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::middleware::{init_metrics, init_tracing, metrics_middleware, render_metrics};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub hub: NotificationHub,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("troth-notification");

    let config = AppConfig::load()?;
    let port = config.port;

    // Set JWT_SECRET env var for the auth extractor middleware
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let hub = NotificationHub::with_capacity(config.hub_capacity);
    let metrics = init_metrics()?;

    let state = Arc::new(AppState { db, config, rabbitmq, hub, metrics });

    let relationship_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_relationship_events(relationship_state).await {
            tracing::error!(error = %e, "relationship event subscriber failed");
        }
    });

    let message_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_message_events(message_state).await {
            tracing::error!(error = %e, "message event subscriber failed");
        }
    });

    let moderation_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_moderation_events(moderation_state).await {
            tracing::error!(error = %e, "moderation event subscriber failed");
        }
    });

    let metrics_handle = state.metrics.clone();

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || render_metrics(metrics_handle.clone())))
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/stream", get(routes::stream::stream_notifications))
        .route("/notifications/unread-count", get(routes::notifications::unread_count))
        .route("/notifications/mark-all-read", post(routes::notifications::mark_all_read))
        .route("/notifications/:id/read", post(routes::notifications::mark_read))
        .route("/notifications/:id", delete(routes::notifications::delete_notification))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "troth-notification starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
