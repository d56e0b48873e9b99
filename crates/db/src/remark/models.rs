use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only remark attached to a lead by `external_ref`.
///
/// Remarks are joined by external ref rather than the internal lead id so a
/// remark can land before its lead is materialized. Rows are never updated
/// or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remark {
    pub id: Uuid,
    pub external_ref: String,
    pub noted_at: DateTime<Utc>,
    pub body: String,
    pub noted_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Remark {
    pub fn key(&self) -> RemarkKey {
        RemarkKey {
            external_ref: self.external_ref.clone(),
            noted_at: self.noted_at,
            body: self.body.clone(),
        }
    }
}

/// Natural dedup key for a remark.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemarkKey {
    pub external_ref: String,
    pub noted_at: DateTime<Utc>,
    pub body: String,
}
