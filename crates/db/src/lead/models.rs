use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical target-store shape of a source lead.
///
/// `external_ref` is the stable natural key (the source row id, stringified).
/// It is the only join key between source and target and is never
/// regenerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub external_ref: String,
    pub owner_account_id: Uuid,
    pub territory: String,
    pub lifecycle_status: String,
    pub subject_name: String,
    pub contact_phone: Option<String>,
    pub alt_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub treatment: String,
    pub sub_treatment: Option<String>,
    pub source_channel: Option<String>,
    pub campaign: Option<String>,
    pub budget: Option<String>,
    pub is_hot: bool,
    pub detail: Option<String>,
    pub follow_up_on: Option<NaiveDate>,
    pub enquired_at: Option<DateTime<Utc>>,
    pub entered_at: Option<DateTime<Utc>>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The subset of an existing target row consulted by change detection.
#[derive(Debug, Clone)]
pub struct LeadSnapshot {
    pub external_ref: String,
    pub subject_name: String,
    pub contact_phone: Option<String>,
    pub lifecycle_status: String,
    pub owner_account_id: Uuid,
    pub territory: String,
    pub treatment: String,
    pub follow_up_on: Option<NaiveDate>,
    pub source_updated_at: Option<DateTime<Utc>>,
}
