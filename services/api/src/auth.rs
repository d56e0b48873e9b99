use axum::http::{header, HeaderMap};

/// Shared-secret check for the sync trigger: the Authorization header must
/// carry exactly `Bearer <token>`.
pub fn bearer_authorized(headers: &HeaderMap, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}
