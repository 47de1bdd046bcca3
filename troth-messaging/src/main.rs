use axum::{routing::{get, post, delete}, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use troth_shared::clients::db::{create_pool, DbPool};
use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::middleware::{init_metrics, init_tracing, metrics_middleware, render_metrics};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("troth-messaging");

    let config = AppConfig::load()?;
    let port = config.port;

    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let metrics = init_metrics()?;

    let state = Arc::new(AppState { db, config, rabbitmq, metrics });

    // Conversations follow the match lifecycle
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_match_events(sub_state).await {
            tracing::error!(error = %e, "match event subscriber failed");
        }
    });

    let metrics_handle = state.metrics.clone();

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || render_metrics(metrics_handle.clone())))
        // Conversations
        .route("/conversations", get(routes::conversations::list_conversations))
        // Messages
        .route("/conversations/:id/messages", get(routes::messages::list_messages).post(routes::messages::send_message))
        .route("/conversations/:id/read", post(routes::messages::mark_as_read))
        .route("/messages/:id", delete(routes::messages::delete_message))
        .route("/unread-count", get(routes::messages::get_unread_count))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "troth-messaging starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
