mod handlers;

use axum::routing::post;
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    // GET is accepted as an alias so the daily cron can stay a plain curl
    Router::new().route(
        "/sync/leads",
        post(handlers::trigger_daily_sync).get(handlers::trigger_daily_sync),
    )
}
