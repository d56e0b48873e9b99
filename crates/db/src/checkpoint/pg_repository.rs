use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::checkpoint::models::SyncCheckpoint;
use crate::checkpoint::repositories::CheckpointRepository;
use leadbridge_common::error::{BridgeError, BridgeResult};

const RETURNING: &str = "source_type, last_synced_at, last_synced_id, records_count, \
     last_run_at, status, error_message, created_at, updated_at";

#[derive(Clone)]
pub struct PgCheckpointRepository {
    pool: PgPool,
}

impl PgCheckpointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> BridgeResult<SyncCheckpoint> {
        Ok(SyncCheckpoint {
            source_type: row.get("source_type"),
            last_synced_at: row.get("last_synced_at"),
            last_synced_id: row.get("last_synced_id"),
            records_count: row.get("records_count"),
            last_run_at: row.get("last_run_at"),
            status: row.get("status"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl CheckpointRepository for PgCheckpointRepository {
    async fn get_or_create(
        &self,
        source_type: &str,
        lookback_days: i64,
    ) -> BridgeResult<SyncCheckpoint> {
        let default_start = Utc::now() - Duration::days(lookback_days);
        let row = sqlx::query(&format!(
            "insert into sync_checkpoints (source_type, last_synced_at, records_count, status)
             values ($1, $2, 0, 'idle')
             on conflict (source_type) do update set updated_at = sync_checkpoints.updated_at
             returning {RETURNING}"
        ))
        .bind(source_type)
        .bind(default_start)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn acquire(&self, source_type: &str) -> BridgeResult<Option<SyncCheckpoint>> {
        // A lease untouched for two hours is considered abandoned (crashed
        // holder) and may be taken over.
        let row = sqlx::query(&format!(
            "update sync_checkpoints
             set status = 'running', error_message = null, updated_at = $1
             where source_type = $2
               and (status != 'running' or updated_at < $1 - interval '2 hours')
             returning {RETURNING}"
        ))
        .bind(Utc::now())
        .bind(source_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::map_row(r)?)),
            None => Ok(None),
        }
    }

    async fn advance(
        &self,
        source_type: &str,
        last_synced_at: DateTime<Utc>,
        last_synced_id: i64,
        records: i64,
    ) -> BridgeResult<SyncCheckpoint> {
        let row = sqlx::query(&format!(
            "update sync_checkpoints
             set last_synced_id = case
                     when $2 > last_synced_at then $3
                     when $2 = last_synced_at then greatest(coalesce(last_synced_id, 0), $3)
                     else last_synced_id
                 end,
                 last_synced_at = greatest(last_synced_at, $2),
                 records_count = records_count + $4,
                 last_run_at = $5,
                 updated_at = $5
             where source_type = $1
             returning {RETURNING}"
        ))
        .bind(source_type)
        .bind(last_synced_at)
        .bind(last_synced_id)
        .bind(records)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn release(&self, source_type: &str, error: Option<&str>) -> BridgeResult<()> {
        let now = Utc::now();
        sqlx::query(
            "update sync_checkpoints
             set status = case when $2::text is null then 'idle' else 'failed' end,
                 error_message = $2,
                 last_run_at = $3,
                 updated_at = $3
             where source_type = $1",
        )
        .bind(source_type)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(())
    }
}
