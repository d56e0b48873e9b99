use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::remark::models::{Remark, RemarkKey};
use crate::remark::repositories::RemarkRepository;
use leadbridge_common::error::{BridgeError, BridgeResult};

#[derive(Clone)]
pub struct PgRemarkRepository {
    pool: PgPool,
}

impl PgRemarkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemarkRepository for PgRemarkRepository {
    async fn existing_keys(&self, refs: &[String]) -> BridgeResult<HashSet<RemarkKey>> {
        if refs.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query(
            "select external_ref, noted_at, body from lead_remarks where external_ref = any($1)",
        )
        .bind(refs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| RemarkKey {
                external_ref: row.get("external_ref"),
                noted_at: row.get("noted_at"),
                body: row.get("body"),
            })
            .collect())
    }

    async fn insert_many(&self, remarks: &[Remark]) -> BridgeResult<u64> {
        if remarks.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "insert into lead_remarks (id, external_ref, noted_at, body, noted_by, created_at) ",
        );

        qb.push_values(remarks, |mut b, remark| {
            b.push_bind(remark.id)
                .push_bind(&remark.external_ref)
                .push_bind(remark.noted_at)
                .push_bind(&remark.body)
                .push_bind(&remark.noted_by)
                .push_bind(remark.created_at);
        });
        qb.push(" on conflict (external_ref, noted_at, body) do nothing");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
