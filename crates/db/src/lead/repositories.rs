use async_trait::async_trait;

use crate::lead::models::{Lead, LeadSnapshot};
use leadbridge_common::error::BridgeResult;

#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Fetch change-detection snapshots for the given external refs.
    async fn snapshots_by_refs(&self, refs: &[String]) -> BridgeResult<Vec<LeadSnapshot>>;

    /// Bulk-insert one chunk of new leads. Rows whose `external_ref` already
    /// exists (lost race with a concurrent run) are silently skipped.
    /// Returns the number of rows actually inserted.
    async fn insert_many(&self, leads: &[Lead]) -> BridgeResult<u64>;

    /// Apply one chunk of updates inside a single transaction.
    async fn update_many(&self, leads: &[Lead]) -> BridgeResult<()>;

    /// Apply a single update outside any chunk transaction.
    async fn update_one(&self, lead: &Lead) -> BridgeResult<()>;
}
