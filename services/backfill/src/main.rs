use chrono::NaiveDate;

use leadbridge_config::{init_tracing, AppConfig};
use leadbridge_db::account::pg_repository::PgAccountDirectory;
use leadbridge_db::checkpoint::pg_repository::PgCheckpointRepository;
use leadbridge_db::lead::pg_repository::PgLeadRepository;
use leadbridge_db::remark::pg_repository::PgRemarkRepository;
use leadbridge_sync::source::PgSourceReader;
use leadbridge_sync::{SyncEngine, SyncSettings};

/// Start date precedence: CLI argument, then `BACKFILL_START_DATE`, then the
/// hard-coded default baked into the settings.
fn start_date(arg: Option<&str>, settings: &SyncSettings) -> Result<NaiveDate, String> {
    match arg {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("invalid start date `{raw}`, expected YYYY-MM-DD")),
        None => Ok(settings.backfill_start),
    }
}

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AppConfig::from_env().expect("failed to load config");
    let settings = SyncSettings::from_env();

    let arg = std::env::args().nth(1);
    let start = match start_date(arg.as_deref(), &settings) {
        Ok(date) => date,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    tracing::info!(service = "leadbridge-backfill", %start, "starting");

    let pool = leadbridge_db::create_pool(&config.database_url)
        .await
        .expect("failed to create target database pool");
    let source_pool = leadbridge_db::create_pool(&config.source_database_url)
        .await
        .expect("failed to create source database pool");

    let engine = SyncEngine::new(
        PgSourceReader::new(source_pool),
        PgLeadRepository::new(pool.clone()),
        PgRemarkRepository::new(pool.clone()),
        PgCheckpointRepository::new(pool.clone()),
        PgAccountDirectory::new(pool),
        settings,
    );

    match engine.run_historic(start).await {
        Ok(summary) => {
            tracing::info!(
                processed = summary.processed,
                synced = summary.synced,
                updated = summary.updated,
                errors = summary.errors,
                remarks = summary.remarks_synced,
                execution_time_ms = summary.execution_time_ms,
                "backfill finished"
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).expect("summary serializes")
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "backfill failed");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let settings = SyncSettings::default();
        let date = start_date(Some("2023-06-15"), &settings).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
    }

    #[test]
    fn missing_argument_falls_back_to_settings() {
        let settings = SyncSettings::default();
        let date = start_date(None, &settings).unwrap();
        assert_eq!(date, settings.backfill_start);
    }

    #[test]
    fn malformed_argument_is_rejected() {
        let settings = SyncSettings::default();
        let err = start_date(Some("last tuesday"), &settings).unwrap_err();
        assert!(err.contains("YYYY-MM-DD"));
    }
}
