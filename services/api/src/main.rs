mod auth;
mod error;
mod sync;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use leadbridge_common::types::ServiceInfo;
use leadbridge_config::{init_tracing, AppConfig};
use leadbridge_sync::SyncSettings;
use sqlx::PgPool;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub source_pool: PgPool,
    pub sync_token: String,
    pub settings: SyncSettings,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo::new("leadbridge-api"))
}

async fn metrics() -> impl IntoResponse {
    let body = "\
# HELP leadbridge_up Service up indicator\n\
# TYPE leadbridge_up gauge\n\
leadbridge_up 1\n\
# HELP leadbridge_info Service info\n\
# TYPE leadbridge_info gauge\n\
leadbridge_info{service=\"leadbridge-api\",version=\"0.1.0\"} 1\n";

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(tower_http::cors::Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/metrics", get(metrics))
        .merge(sync::router())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    tracing::info!(service = "leadbridge-api", "starting");

    let pool = leadbridge_db::create_pool(&config.database_url)
        .await
        .expect("failed to create target database pool");
    let source_pool = leadbridge_db::create_pool(&config.source_database_url)
        .await
        .expect("failed to create source database pool");

    let state = AppState {
        pool,
        source_pool,
        sync_token: config.sync_token.clone(),
        settings: SyncSettings::from_env(),
    };

    let app = build_router(state);
    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
