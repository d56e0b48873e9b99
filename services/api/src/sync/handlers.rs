use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use leadbridge_db::account::pg_repository::PgAccountDirectory;
use leadbridge_db::checkpoint::pg_repository::PgCheckpointRepository;
use leadbridge_db::lead::pg_repository::PgLeadRepository;
use leadbridge_db::remark::pg_repository::PgRemarkRepository;
use leadbridge_sync::source::PgSourceReader;
use leadbridge_sync::{SyncEngine, SyncSummary};

use crate::auth::bearer_authorized;
use crate::error::ApiError;
use crate::AppState;

pub async fn trigger_daily_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncSummary>, ApiError> {
    if !bearer_authorized(&headers, &state.sync_token) {
        tracing::warn!("sync trigger rejected: bad or missing bearer token");
        return Err(ApiError::Unauthorized);
    }

    let engine = SyncEngine::new(
        PgSourceReader::new(state.source_pool.clone()),
        PgLeadRepository::new(state.pool.clone()),
        PgRemarkRepository::new(state.pool.clone()),
        PgCheckpointRepository::new(state.pool.clone()),
        PgAccountDirectory::new(state.pool.clone()),
        state.settings.clone(),
    );

    let summary = engine.run_daily().await?;
    Ok(Json(summary))
}
