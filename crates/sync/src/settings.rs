use chrono::NaiveDate;

/// Engine tunables. Environment variables override the defaults; anything
/// unset or unparseable falls back silently.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Single bounded page fetched by a daily run.
    pub daily_page_size: i64,
    /// Page size per iteration of a historic backfill loop.
    pub historic_page_size: i64,
    /// Concurrency ceiling for the per-record resolve/map/detect phase.
    /// Sized to keep concurrent lookups within the target pool's capacity.
    pub concurrency: usize,
    /// Bulk-insert chunk for new leads.
    pub create_chunk: usize,
    /// Transaction chunk for updates. Small to bound how long a transaction
    /// holds row locks.
    pub update_chunk: usize,
    /// External-ref chunk for remark key lookups.
    pub ref_chunk: usize,
    /// Create an account for an owner name that matches nothing.
    pub auto_create_owners: bool,
    /// Calendar offset (minutes east of UTC) for the daily window, so the
    /// window does not drift with the server time zone.
    pub utc_offset_minutes: i32,
    /// Lookback for a checkpoint created on first run.
    pub default_lookback_days: i64,
    /// Territory assigned to auto-created accounts.
    pub default_territory: String,
    /// Backfill start when neither the CLI argument nor the env var is set.
    pub backfill_start: NaiveDate,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            daily_page_size: 2500,
            historic_page_size: 1000,
            concurrency: 15,
            create_chunk: 1000,
            update_chunk: 25,
            ref_chunk: 400,
            auto_create_owners: true,
            utc_offset_minutes: 330,
            default_lookback_days: 30,
            default_territory: "General".to_string(),
            backfill_start: NaiveDate::from_ymd_opt(2022, 1, 1)
                .unwrap_or(NaiveDate::MIN),
        }
    }
}

impl SyncSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            daily_page_size: parse_var("SYNC_DAILY_PAGE_SIZE", defaults.daily_page_size),
            historic_page_size: parse_var("SYNC_HISTORIC_PAGE_SIZE", defaults.historic_page_size),
            concurrency: parse_var("SYNC_CONCURRENCY", defaults.concurrency),
            create_chunk: parse_var("SYNC_CREATE_CHUNK", defaults.create_chunk),
            update_chunk: parse_var("SYNC_UPDATE_CHUNK", defaults.update_chunk),
            ref_chunk: defaults.ref_chunk,
            auto_create_owners: parse_var("SYNC_AUTO_CREATE_OWNERS", defaults.auto_create_owners),
            utc_offset_minutes: parse_var("SYNC_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
            default_lookback_days: parse_var("SYNC_LOOKBACK_DAYS", defaults.default_lookback_days),
            default_territory: std::env::var("SYNC_DEFAULT_TERRITORY")
                .unwrap_or(defaults.default_territory),
            backfill_start: std::env::var("BACKFILL_START_DATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.backfill_start),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_are_sane() {
        let s = SyncSettings::default();
        assert_eq!(s.daily_page_size, 2500);
        assert_eq!(s.concurrency, 15);
        assert_eq!(s.update_chunk, 25);
        assert!(s.auto_create_owners);
        assert_eq!(s.utc_offset_minutes, 330);
        assert_eq!(s.backfill_start, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
    }

    #[test]
    fn env_overrides_defaults() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("SYNC_CONCURRENCY", "4");
        std::env::set_var("SYNC_AUTO_CREATE_OWNERS", "false");
        std::env::set_var("BACKFILL_START_DATE", "2023-06-15");

        let s = SyncSettings::from_env();
        assert_eq!(s.concurrency, 4);
        assert!(!s.auto_create_owners);
        assert_eq!(
            s.backfill_start,
            NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()
        );

        std::env::remove_var("SYNC_CONCURRENCY");
        std::env::remove_var("SYNC_AUTO_CREATE_OWNERS");
        std::env::remove_var("BACKFILL_START_DATE");
    }

    #[test]
    fn unparseable_env_falls_back() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("SYNC_DAILY_PAGE_SIZE", "lots");
        let s = SyncSettings::from_env();
        assert_eq!(s.daily_page_size, 2500);
        std::env::remove_var("SYNC_DAILY_PAGE_SIZE");
    }
}
