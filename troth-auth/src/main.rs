use axum::{routing::{get, post, put}, Router};
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
use troth_shared::clients::email::EmailClient;
use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::clients::redis::RedisClient;
use troth_shared::middleware::{init_metrics, init_tracing, metrics_middleware, render_metrics};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub email: EmailClient,
    pub metrics: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("troth-auth");

    let config = AppConfig::load()?;
    let port = config.port;

    // Extractors in troth-shared validate tokens against this variable
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let email = EmailClient::new(&config.resend_api_key, &config.from_email, "Troth");
    let metrics = init_metrics()?;

    let state = Arc::new(AppState { db, config, rabbitmq, redis, email, metrics });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_verification_reviewed(sub_state).await {
            tracing::error!(error = %e, "verification subscriber failed");
        }
    });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_sanctions(sub_state).await {
            tracing::error!(error = %e, "sanction subscriber failed");
        }
    });

    let metrics_handle = state.metrics.clone();

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || render_metrics(metrics_handle.clone())))
        .route("/signup", post(routes::register::register))
        .route("/login", post(routes::login::login))
        .route("/verify-email", post(routes::verify_email::verify_email))
        .route("/resend-code", post(routes::resend_code::resend_code))
        .route("/refresh", post(routes::refresh::refresh_token))
        .route("/logout", post(routes::logout::logout))
        .route("/me", get(routes::me::me))
        // Admin user management
        .route("/admin/users", get(routes::admin_users::list_users))
        .route("/admin/users/:id", get(routes::admin_users::get_user))
        .route("/admin/users/:id/status", put(routes::admin_users::set_status))
        .route("/admin/users/:id/role", put(routes::admin_users::set_role))
        .route(
            "/admin/users/:id/trust-score/recalculate",
            post(routes::admin_users::recalculate_trust_score),
        )
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "troth-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
