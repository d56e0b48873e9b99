use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::lead::models::{Lead, LeadSnapshot};
use crate::lead::repositories::LeadRepository;
use leadbridge_common::error::{BridgeError, BridgeResult};

const UPDATE_SQL: &str = "update leads \
     set owner_account_id = $1, territory = $2, lifecycle_status = $3, subject_name = $4, \
         contact_phone = $5, alt_phone = $6, email = $7, address = $8, city = $9, state = $10, \
         postal_code = $11, treatment = $12, sub_treatment = $13, source_channel = $14, \
         campaign = $15, budget = $16, is_hot = $17, detail = $18, follow_up_on = $19, \
         enquired_at = $20, entered_at = $21, source_updated_at = $22, updated_at = $23 \
     where external_ref = $24";

#[derive(Clone)]
pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_snapshot_row(row: PgRow) -> BridgeResult<LeadSnapshot> {
        Ok(LeadSnapshot {
            external_ref: row.get("external_ref"),
            subject_name: row.get("subject_name"),
            contact_phone: row.get("contact_phone"),
            lifecycle_status: row.get("lifecycle_status"),
            owner_account_id: row.get("owner_account_id"),
            territory: row.get("territory"),
            treatment: row.get("treatment"),
            follow_up_on: row.get("follow_up_on"),
            source_updated_at: row.get("source_updated_at"),
        })
    }

    fn bind_update(lead: &Lead) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
        sqlx::query(UPDATE_SQL)
            .bind(lead.owner_account_id)
            .bind(&lead.territory)
            .bind(&lead.lifecycle_status)
            .bind(&lead.subject_name)
            .bind(&lead.contact_phone)
            .bind(&lead.alt_phone)
            .bind(&lead.email)
            .bind(&lead.address)
            .bind(&lead.city)
            .bind(&lead.state)
            .bind(&lead.postal_code)
            .bind(&lead.treatment)
            .bind(&lead.sub_treatment)
            .bind(&lead.source_channel)
            .bind(&lead.campaign)
            .bind(&lead.budget)
            .bind(lead.is_hot)
            .bind(&lead.detail)
            .bind(lead.follow_up_on)
            .bind(lead.enquired_at)
            .bind(lead.entered_at)
            .bind(lead.source_updated_at)
            .bind(Utc::now())
            .bind(&lead.external_ref)
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn snapshots_by_refs(&self, refs: &[String]) -> BridgeResult<Vec<LeadSnapshot>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "select external_ref, subject_name, contact_phone, lifecycle_status, \
                    owner_account_id, territory, treatment, follow_up_on, source_updated_at \
             from leads where external_ref = any($1)",
        )
        .bind(refs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_snapshot_row).collect()
    }

    async fn insert_many(&self, leads: &[Lead]) -> BridgeResult<u64> {
        if leads.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "insert into leads (id, external_ref, owner_account_id, territory, lifecycle_status, \
             subject_name, contact_phone, alt_phone, email, address, city, state, postal_code, \
             treatment, sub_treatment, source_channel, campaign, budget, is_hot, detail, \
             follow_up_on, enquired_at, entered_at, source_updated_at, created_by, created_at, \
             updated_at) ",
        );

        qb.push_values(leads, |mut b, lead| {
            b.push_bind(lead.id)
                .push_bind(&lead.external_ref)
                .push_bind(lead.owner_account_id)
                .push_bind(&lead.territory)
                .push_bind(&lead.lifecycle_status)
                .push_bind(&lead.subject_name)
                .push_bind(&lead.contact_phone)
                .push_bind(&lead.alt_phone)
                .push_bind(&lead.email)
                .push_bind(&lead.address)
                .push_bind(&lead.city)
                .push_bind(&lead.state)
                .push_bind(&lead.postal_code)
                .push_bind(&lead.treatment)
                .push_bind(&lead.sub_treatment)
                .push_bind(&lead.source_channel)
                .push_bind(&lead.campaign)
                .push_bind(&lead.budget)
                .push_bind(lead.is_hot)
                .push_bind(&lead.detail)
                .push_bind(lead.follow_up_on)
                .push_bind(lead.enquired_at)
                .push_bind(lead.entered_at)
                .push_bind(lead.source_updated_at)
                .push_bind(lead.created_by)
                .push_bind(lead.created_at)
                .push_bind(lead.updated_at);
        });
        qb.push(" on conflict (external_ref) do nothing");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn update_many(&self, leads: &[Lead]) -> BridgeResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BridgeError::Database(e.to_string()))?;

        for lead in leads {
            Self::bind_update(lead)
                .execute(&mut *tx)
                .await
                .map_err(|e| BridgeError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(())
    }

    async fn update_one(&self, lead: &Lead) -> BridgeResult<()> {
        Self::bind_update(lead)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(())
    }
}
