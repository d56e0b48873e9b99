use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable sync cursor for one source, keyed by `source_type`.
///
/// `last_synced_at` never decreases across commits; `last_synced_id` breaks
/// ties among rows sharing the max committed timestamp. The row also acts as
/// a lease: `status` is `running` while an invocation holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    pub source_type: String,
    pub last_synced_at: DateTime<Utc>,
    pub last_synced_id: Option<i64>,
    pub records_count: i64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
