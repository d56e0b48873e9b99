use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use leadbridge_common::error::BridgeError;

pub enum ApiError {
    Unauthorized,
    Bridge(BridgeError),
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self::Bridge(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Bridge(BridgeError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg),
            ApiError::Bridge(BridgeError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            // A sync run that cannot reach its stores is an upstream failure
            ApiError::Bridge(BridgeError::Database(msg)) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Bridge(other) => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
