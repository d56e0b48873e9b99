use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::account::models::{Account, NewAccount, Territory};
use crate::account::repositories::AccountDirectory;
use leadbridge_common::error::{BridgeError, BridgeResult};

const ACCOUNT_COLUMNS: &str =
    "id, login, display_name, territory, is_supervisor, active, created_at, updated_at";

#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_account(row: PgRow) -> BridgeResult<Account> {
        Ok(Account {
            id: row.get("id"),
            login: row.get("login"),
            display_name: row.get("display_name"),
            territory: row.get("territory"),
            is_supervisor: row.get("is_supervisor"),
            active: row.get("active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn map_territory(row: PgRow) -> BridgeResult<Territory> {
        Ok(Territory {
            id: row.get("id"),
            name: row.get("name"),
            supervisor_id: row.get("supervisor_id"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn list_active(&self) -> BridgeResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "select {ACCOUNT_COLUMNS} from accounts where active order by created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_account).collect()
    }

    async fn find_supervisor(&self) -> BridgeResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "select {ACCOUNT_COLUMNS} from accounts
             where active and is_supervisor
             order by created_at
             limit 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::map_account(r)?)),
            None => Ok(None),
        }
    }

    async fn login_exists(&self, login: &str) -> BridgeResult<bool> {
        let count: i64 = sqlx::query_scalar("select count(*) from accounts where login = $1")
            .bind(login)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn create_account(&self, account: NewAccount) -> BridgeResult<Account> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "insert into accounts
             (id, login, display_name, territory, password_hash, is_supervisor, active, created_at, updated_at)
             values ($1, $2, $3, $4, $5, false, true, $6, $6)
             returning {ACCOUNT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&account.login)
        .bind(&account.display_name)
        .bind(&account.territory)
        .bind(&account.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        Self::map_account(row)
    }

    async fn find_territory(&self, name: &str) -> BridgeResult<Option<Territory>> {
        let row = sqlx::query(
            "select id, name, supervisor_id, created_at from territories where lower(name) = lower($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::map_territory(r)?)),
            None => Ok(None),
        }
    }

    async fn create_territory(
        &self,
        name: &str,
        supervisor_id: Uuid,
    ) -> BridgeResult<Territory> {
        let row = sqlx::query(
            "insert into territories (id, name, supervisor_id, created_at)
             values ($1, $2, $3, $4)
             returning id, name, supervisor_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(supervisor_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        Self::map_territory(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;

    async fn test_dir() -> Option<(PgAccountDirectory, PgPool)> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = create_pool(&url).await.expect("db should connect");

        sqlx::query(
            "create table if not exists accounts (
               id uuid primary key,
               login text not null unique,
               display_name text not null,
               territory text,
               password_hash text not null,
               is_supervisor boolean not null default false,
               active boolean not null default true,
               created_at timestamptz not null default now(),
               updated_at timestamptz not null default now()
             )",
        )
        .execute(&pool)
        .await
        .ok()?;

        sqlx::query(
            "create table if not exists territories (
               id uuid primary key,
               name text not null,
               supervisor_id uuid not null,
               created_at timestamptz not null default now()
             )",
        )
        .execute(&pool)
        .await
        .ok()?;

        Some((PgAccountDirectory::new(pool.clone()), pool))
    }

    fn unique_login(prefix: &str) -> String {
        format!("{prefix}.{}", Uuid::new_v4().simple())
    }

    #[tokio::test]
    async fn create_account_then_login_exists() {
        let (dir, _pool) = match test_dir().await {
            Some(d) => d,
            None => return,
        };
        let login = unique_login("ravi.kumar");

        assert!(!dir.login_exists(&login).await.expect("check"));

        let created = dir
            .create_account(NewAccount {
                login: login.clone(),
                display_name: "Ravi Kumar".to_string(),
                territory: "General".to_string(),
                password_hash: "*locked*".to_string(),
            })
            .await
            .expect("create");

        assert_eq!(created.login, login);
        assert!(!created.is_supervisor);
        assert!(created.active);
        assert!(dir.login_exists(&login).await.expect("check again"));
    }

    #[tokio::test]
    async fn find_territory_is_case_insensitive() {
        let (dir, _pool) = match test_dir().await {
            Some(d) => d,
            None => return,
        };
        let name = format!("Zone-{}", Uuid::new_v4().simple());
        dir.create_territory(&name, Uuid::new_v4())
            .await
            .expect("create territory");

        let found = dir
            .find_territory(&name.to_uppercase())
            .await
            .expect("find");
        assert!(found.is_some());
        assert_eq!(found.unwrap().name, name);
    }
}
