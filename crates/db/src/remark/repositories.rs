use std::collections::HashSet;

use async_trait::async_trait;

use crate::remark::models::{Remark, RemarkKey};
use leadbridge_common::error::BridgeResult;

#[async_trait]
pub trait RemarkRepository: Send + Sync {
    /// Natural keys of all stored remarks for the given external refs.
    async fn existing_keys(&self, refs: &[String]) -> BridgeResult<HashSet<RemarkKey>>;

    /// Bulk-insert one chunk of remarks; duplicates on the natural key are
    /// silently dropped. Returns the number of rows actually inserted.
    async fn insert_many(&self, remarks: &[Remark]) -> BridgeResult<u64>;
}
