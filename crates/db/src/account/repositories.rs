use async_trait::async_trait;

use crate::account::models::{Account, NewAccount, Territory};
use leadbridge_common::error::BridgeResult;

/// Account-table access used only by the owner resolver and the
/// orchestrator's system-actor pre-flight.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// All active accounts, the per-run matching snapshot.
    async fn list_active(&self) -> BridgeResult<Vec<Account>>;

    /// Oldest active supervisory account; acts as the system actor and as
    /// the owner of an auto-created default territory.
    async fn find_supervisor(&self) -> BridgeResult<Option<Account>>;

    async fn login_exists(&self, login: &str) -> BridgeResult<bool>;

    async fn create_account(&self, account: NewAccount) -> BridgeResult<Account>;

    async fn find_territory(&self, name: &str) -> BridgeResult<Option<Territory>>;

    async fn create_territory(&self, name: &str, supervisor_id: uuid::Uuid)
        -> BridgeResult<Territory>;
}
