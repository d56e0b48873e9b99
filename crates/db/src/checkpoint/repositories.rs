use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::checkpoint::models::SyncCheckpoint;
use leadbridge_common::error::BridgeResult;

#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Get or create the checkpoint for a source type. A freshly created row
    /// starts `lookback_days` in the past so the first run has a window.
    async fn get_or_create(
        &self,
        source_type: &str,
        lookback_days: i64,
    ) -> BridgeResult<SyncCheckpoint>;

    /// Atomically take the lease: flips status to `running` unless another
    /// invocation already holds a fresh lease. Returns `None` when held.
    async fn acquire(&self, source_type: &str) -> BridgeResult<Option<SyncCheckpoint>>;

    /// Commit one page: advance the cursor (monotonically, ties broken by
    /// id) and add to the cumulative record count.
    async fn advance(
        &self,
        source_type: &str,
        last_synced_at: DateTime<Utc>,
        last_synced_id: i64,
        records: i64,
    ) -> BridgeResult<SyncCheckpoint>;

    /// Release the lease: back to `idle`, or `failed` with a message.
    async fn release(&self, source_type: &str, error: Option<&str>) -> BridgeResult<()>;
}
