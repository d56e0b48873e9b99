use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::cursor::Cursor;

/// Most recent per-record failures retained for historic-mode logging.
pub const ERROR_SAMPLE_CAP: usize = 20;
/// Failures surfaced in the trigger response.
pub const ERROR_DETAIL_CAP: usize = 10;

/// Summary returned by the trigger endpoint and logged by the backfill
/// command. Zero `errors` is the expected steady state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub processed: u64,
    pub synced: u64,
    pub updated: u64,
    pub errors: u64,
    pub remarks_synced: u64,
    pub last_synced_date: Option<DateTime<Utc>>,
    pub last_synced_id: Option<i64>,
    pub execution_time_ms: u64,
    pub error_details: Vec<String>,
}

/// Mutable counters carried through one run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub processed: u64,
    pub synced: u64,
    pub updated: u64,
    pub errors: u64,
    pub remarks_synced: u64,
    failures: VecDeque<String>,
}

impl RunStats {
    /// Count a per-record failure, keeping only the most recent
    /// `ERROR_SAMPLE_CAP` descriptions rather than an unbounded list.
    pub fn record_failure(&mut self, source_id: &str, reason: &str) {
        self.errors += 1;
        if self.failures.len() == ERROR_SAMPLE_CAP {
            self.failures.pop_front();
        }
        self.failures.push_back(format!("row {source_id}: {reason}"));
    }

    pub fn failure_sample(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(String::as_str)
    }

    pub fn into_summary(
        self,
        from_date: Option<NaiveDate>,
        to_date: Option<NaiveDate>,
        last_cursor: Option<Cursor>,
        execution_time_ms: u64,
    ) -> SyncSummary {
        SyncSummary {
            from_date,
            to_date,
            processed: self.processed,
            synced: self.synced,
            updated: self.updated,
            errors: self.errors,
            remarks_synced: self.remarks_synced,
            last_synced_date: last_cursor.map(|c| c.ts),
            last_synced_id: last_cursor.map(|c| c.id),
            execution_time_ms,
            error_details: self
                .failures
                .into_iter()
                .take(ERROR_DETAIL_CAP)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn summary_serializes_camel_case() {
        let mut stats = RunStats::default();
        stats.processed = 3;
        stats.synced = 2;
        stats.record_failure("1002", "missing required field `treatment_code`");

        let cursor = Cursor::new(Utc.timestamp_opt(1_709_251_200, 0).unwrap(), 1003);
        let summary = stats.into_summary(
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 3, 2),
            Some(cursor),
            412,
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["fromDate"], "2024-03-01");
        assert_eq!(json["toDate"], "2024-03-02");
        assert_eq!(json["processed"], 3);
        assert_eq!(json["synced"], 2);
        assert_eq!(json["errors"], 1);
        assert_eq!(json["remarksSynced"], 0);
        assert_eq!(json["lastSyncedId"], 1003);
        assert_eq!(json["executionTimeMs"], 412);
        assert_eq!(json["errorDetails"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn failure_sample_is_bounded() {
        let mut stats = RunStats::default();
        for i in 0..50 {
            stats.record_failure(&i.to_string(), "boom");
        }

        assert_eq!(stats.errors, 50);
        let sample: Vec<&str> = stats.failure_sample().collect();
        assert_eq!(sample.len(), ERROR_SAMPLE_CAP);
        // Oldest entries were evicted
        assert_eq!(sample[0], "row 30: boom");
        assert_eq!(sample[ERROR_SAMPLE_CAP - 1], "row 49: boom");
    }

    #[test]
    fn error_details_are_capped_for_response() {
        let mut stats = RunStats::default();
        for i in 0..50 {
            stats.record_failure(&i.to_string(), "boom");
        }

        let summary = stats.into_summary(None, None, None, 0);
        assert_eq!(summary.errors, 50);
        assert_eq!(summary.error_details.len(), ERROR_DETAIL_CAP);
        assert!(summary.last_synced_date.is_none());
        assert!(summary.last_synced_id.is_none());
    }
}
