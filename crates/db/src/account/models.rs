use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub login: String,
    pub display_name: String,
    pub territory: Option<String>,
    pub is_supervisor: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape for accounts synthesized by the owner resolver.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub login: String,
    pub display_name: String,
    pub territory: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Territory {
    pub id: Uuid,
    pub name: String,
    pub supervisor_id: Uuid,
    pub created_at: DateTime<Utc>,
}
