use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::cursor::Cursor;
use leadbridge_common::error::{BridgeError, BridgeResult};

/// A raw lead row as the external system stores it: nullable everywhere,
/// enums as small ints, dates in whatever the operator typed. Downstream
/// code only sees the canonical shape the mapper produces from this.
#[derive(Debug, Clone)]
pub struct SourceLead {
    pub id: i64,
    /// `coalesce(enquiry_date, entry_date, created_on)`, computed by the
    /// source query so cursor filtering and ordering agree with it.
    pub effective_at: DateTime<Utc>,
    pub owner_name: Option<String>,
    pub customer_name: Option<String>,
    pub mobile: Option<String>,
    pub alt_mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub treatment_code: Option<i16>,
    pub sub_treatment: Option<String>,
    pub status_code: Option<i16>,
    pub source_channel: Option<String>,
    pub campaign: Option<String>,
    pub budget: Option<String>,
    pub territory: Option<String>,
    pub hot_flag: Option<String>,
    pub detail: Option<String>,
    pub follow_up_on: Option<String>,
    pub enquiry_date: Option<DateTime<Utc>>,
    pub entry_date: Option<DateTime<Utc>>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl SourceLead {
    pub fn external_ref(&self) -> String {
        self.id.to_string()
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.effective_at, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct SourceRemark {
    pub lead_id: i64,
    pub body: Option<String>,
    pub noted_at: Option<DateTime<Utc>>,
    pub noted_by: Option<String>,
}

#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Cheap connectivity probe, run before any writes happen.
    async fn ping(&self) -> BridgeResult<()>;

    /// One ordered page strictly after the compound cursor, optionally
    /// bounded above by `until` (exclusive).
    async fn fetch_leads(
        &self,
        after: Cursor,
        until: Option<DateTime<Utc>>,
        limit: i64,
    ) -> BridgeResult<Vec<SourceLead>>;

    /// All remark rows for the given external refs.
    async fn fetch_remarks(&self, refs: &[String]) -> BridgeResult<Vec<SourceRemark>>;
}

const EFFECTIVE: &str = "coalesce(enquiry_date, entry_date, created_on)";

#[derive(Clone)]
pub struct PgSourceReader {
    pool: PgPool,
}

impl PgSourceReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_lead(row: sqlx::postgres::PgRow) -> BridgeResult<SourceLead> {
        Ok(SourceLead {
            id: row.get("id"),
            effective_at: row.get("effective_at"),
            owner_name: row.get("assigned_to"),
            customer_name: row.get("customer_name"),
            mobile: row.get("mobile"),
            alt_mobile: row.get("alt_mobile"),
            email: row.get("email"),
            address: row.get("address"),
            city: row.get("city"),
            state: row.get("state"),
            pincode: row.get("pincode"),
            treatment_code: row.get("treatment_code"),
            sub_treatment: row.get("sub_treatment"),
            status_code: row.get("status_code"),
            source_channel: row.get("source_channel"),
            campaign: row.get("campaign"),
            budget: row.get("budget"),
            territory: row.get("territory"),
            hot_flag: row.get("hot_flag"),
            detail: row.get("detail"),
            follow_up_on: row.get("follow_up_on"),
            enquiry_date: row.get("enquiry_date"),
            entry_date: row.get("entry_date"),
            created_on: row.get("created_on"),
            updated_on: row.get("updated_on"),
        })
    }
}

#[async_trait]
impl SourceReader for PgSourceReader {
    async fn ping(&self) -> BridgeResult<()> {
        sqlx::query("select 1")
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::Database(e.to_string()))?;
        Ok(())
    }

    async fn fetch_leads(
        &self,
        after: Cursor,
        until: Option<DateTime<Utc>>,
        limit: i64,
    ) -> BridgeResult<Vec<SourceLead>> {
        // The compound predicate is load-bearing: a plain `ts >= cursor`
        // re-reads the boundary page every run, and a plain `id > cursor`
        // breaks when timestamps are backfilled out of id order.
        let rows = sqlx::query(&format!(
            "select id, assigned_to, customer_name, mobile, alt_mobile, email, address, city, \
                    state, pincode, treatment_code, sub_treatment, status_code, source_channel, \
                    campaign, budget, territory, hot_flag, detail, follow_up_on, enquiry_date, \
                    entry_date, created_on, updated_on, {EFFECTIVE} as effective_at
             from enquiries
             where ({EFFECTIVE} > $1 or ({EFFECTIVE} = $1 and id > $2))
               and ($3::timestamptz is null or {EFFECTIVE} < $3)
             order by effective_at asc, id asc
             limit $4"
        ))
        .bind(after.ts)
        .bind(after.id)
        .bind(until)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_lead).collect()
    }

    async fn fetch_remarks(&self, refs: &[String]) -> BridgeResult<Vec<SourceRemark>> {
        let ids: Vec<i64> = refs.iter().filter_map(|r| r.parse().ok()).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "select lead_id, remark, remark_date, remark_by
             from enquiry_remarks
             where lead_id = any($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BridgeError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| SourceRemark {
                lead_id: row.get("lead_id"),
                body: row.get("remark"),
                noted_at: row.get("remark_date"),
                noted_by: row.get("remark_by"),
            })
            .collect())
    }
}
