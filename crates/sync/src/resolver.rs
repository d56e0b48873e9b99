use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use leadbridge_common::error::BridgeError;
use leadbridge_db::account::models::{Account, NewAccount};
use leadbridge_db::account::repositories::AccountDirectory;

/// Credential stored on accounts the resolver synthesizes. Not a valid hash,
/// so the account cannot log in until someone sets a real password.
pub const PLACEHOLDER_CREDENTIAL: &str = "*locked*";

/// Which rule of the chain produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    Contains,
    FirstToken,
    Created,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub account_id: Uuid,
    pub territory: Option<String>,
    pub rule: MatchRule,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("owner not found: {0}")]
    NotFound(String),

    #[error("no supervisory account available to own the default territory")]
    NoSupervisor,

    #[error(transparent)]
    Directory(#[from] BridgeError),
}

/// Maps free-text owner names from the source onto internal accounts.
///
/// The chain is ordered, first match wins: exact (case-insensitive) →
/// raw-contains-account-name → first-token. On a complete miss, and when
/// auto-create is enabled, a new account is synthesized once per distinct
/// name per run; every outcome is cached for the lifetime of the run.
pub struct OwnerResolver {
    accounts: Vec<Account>,
    cache: HashMap<String, Option<Resolution>>,
    auto_create: bool,
    default_territory_name: String,
    default_territory: Option<String>,
    created_count: usize,
}

impl OwnerResolver {
    pub fn new(accounts: Vec<Account>, auto_create: bool, default_territory: &str) -> Self {
        Self {
            accounts,
            cache: HashMap::new(),
            auto_create,
            default_territory_name: default_territory.to_string(),
            default_territory: None,
            created_count: 0,
        }
    }

    /// Accounts created by this resolver during the current run.
    pub fn created_count(&self) -> usize {
        self.created_count
    }

    pub async fn resolve<A: AccountDirectory>(
        &mut self,
        raw_name: &str,
        dir: &A,
    ) -> Result<Resolution, ResolveError> {
        let trimmed = raw_name.trim();
        let key = trimmed.to_lowercase();
        if key.is_empty() {
            return Err(ResolveError::NotFound(raw_name.to_string()));
        }

        if let Some(cached) = self.cache.get(&key) {
            return cached
                .clone()
                .ok_or_else(|| ResolveError::NotFound(trimmed.to_string()));
        }

        if let Some(resolution) = self.match_known(&key) {
            self.cache.insert(key, Some(resolution.clone()));
            return Ok(resolution);
        }

        if !self.auto_create {
            // Negative outcomes are cached too; the same unknown name is not
            // re-scanned a hundred times within one batch.
            self.cache.insert(key, None);
            return Err(ResolveError::NotFound(trimmed.to_string()));
        }

        let resolution = self.create_owner(trimmed, dir).await?;
        self.cache.insert(key, Some(resolution.clone()));
        Ok(resolution)
    }

    fn match_known(&self, needle: &str) -> Option<Resolution> {
        for account in &self.accounts {
            if account.display_name.trim().to_lowercase() == needle {
                return Some(Resolution {
                    account_id: account.id,
                    territory: account.territory.clone(),
                    rule: MatchRule::Exact,
                });
            }
        }

        // "Dr. Ravi Kumar (Indore)" still finds the account named Ravi Kumar
        for account in &self.accounts {
            let name = account.display_name.trim().to_lowercase();
            if !name.is_empty() && needle.contains(&name) {
                return Some(Resolution {
                    account_id: account.id,
                    territory: account.territory.clone(),
                    rule: MatchRule::Contains,
                });
            }
        }

        let token = needle.split_whitespace().next()?;
        if token.chars().count() > 2 {
            for account in &self.accounts {
                let first = account
                    .display_name
                    .trim()
                    .to_lowercase()
                    .split_whitespace()
                    .next()
                    .map(|t| t.to_string());
                if first.as_deref() == Some(token) {
                    return Some(Resolution {
                        account_id: account.id,
                        territory: account.territory.clone(),
                        rule: MatchRule::FirstToken,
                    });
                }
            }
        }

        None
    }

    async fn create_owner<A: AccountDirectory>(
        &mut self,
        name: &str,
        dir: &A,
    ) -> Result<Resolution, ResolveError> {
        let territory = self.ensure_default_territory(dir).await?;
        let login = self.synthesize_login(name, dir).await?;

        let account = dir
            .create_account(NewAccount {
                login,
                display_name: name.to_string(),
                territory: territory.clone(),
                password_hash: PLACEHOLDER_CREDENTIAL.to_string(),
            })
            .await?;

        tracing::info!(owner = name, login = %account.login, "created account for unresolved owner");
        self.created_count += 1;

        let resolution = Resolution {
            account_id: account.id,
            territory: Some(territory),
            rule: MatchRule::Created,
        };
        // Created accounts join the snapshot so later raw variants of the
        // same person can match them.
        self.accounts.push(account);
        Ok(resolution)
    }

    async fn ensure_default_territory<A: AccountDirectory>(
        &mut self,
        dir: &A,
    ) -> Result<String, ResolveError> {
        if let Some(name) = &self.default_territory {
            return Ok(name.clone());
        }

        let name = self.default_territory_name.clone();
        if dir.find_territory(&name).await?.is_none() {
            let supervisor = dir
                .find_supervisor()
                .await?
                .ok_or(ResolveError::NoSupervisor)?;
            dir.create_territory(&name, supervisor.id).await?;
            tracing::info!(territory = %name, "created default territory");
        }

        self.default_territory = Some(name.clone());
        Ok(name)
    }

    async fn synthesize_login<A: AccountDirectory>(
        &self,
        name: &str,
        dir: &A,
    ) -> Result<String, ResolveError> {
        let base: String = name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(".")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
            .collect();
        let base = if base.is_empty() { "owner".to_string() } else { base };

        let mut candidate = base.clone();
        let mut suffix = 1u32;
        while dir.login_exists(&candidate).await?
            || self.accounts.iter().any(|a| a.login == candidate)
        {
            candidate = format!("{base}{suffix}");
            suffix += 1;
        }
        Ok(candidate)
    }
}
