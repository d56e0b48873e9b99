use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cursor::Cursor;
use crate::detect::{self, Change};
use crate::mapper;
use crate::pool;
use crate::remarks;
use crate::report::{RunStats, SyncSummary};
use crate::resolver::OwnerResolver;
use crate::settings::SyncSettings;
use crate::source::{SourceLead, SourceReader};
use crate::writer::BatchWriter;
use leadbridge_common::error::{BridgeError, BridgeResult};
use leadbridge_db::account::repositories::AccountDirectory;
use leadbridge_db::checkpoint::models::SyncCheckpoint;
use leadbridge_db::checkpoint::repositories::CheckpointRepository;
use leadbridge_db::lead::models::{Lead, LeadSnapshot};
use leadbridge_db::lead::repositories::LeadRepository;
use leadbridge_db::remark::repositories::RemarkRepository;

/// Checkpoint key for the external lead source.
pub const SOURCE_TYPE: &str = "external_leads";

enum Mode {
    Daily,
    Historic { start: NaiveDate },
}

struct PageOutcome {
    read: usize,
    max_cursor: Option<Cursor>,
}

/// Drives one sync invocation: fetch a page, fan out per-record
/// resolve/map/detect under the concurrency ceiling, write in chunks, sync
/// remarks, commit the checkpoint, then loop (historic) or stop (daily).
///
/// The checkpoint commit strictly follows the page's writes, so a crash
/// between pages resumes by re-reading an overlapping page; writes are
/// idempotent via duplicate-tolerant creates and natural-keyed remarks.
pub struct SyncEngine<Src, L, R, C, A> {
    source: Src,
    leads: L,
    remarks: R,
    checkpoints: C,
    accounts: A,
    settings: SyncSettings,
}

impl<Src, L, R, C, A> SyncEngine<Src, L, R, C, A>
where
    Src: SourceReader,
    L: LeadRepository,
    R: RemarkRepository,
    C: CheckpointRepository,
    A: AccountDirectory,
{
    pub fn new(
        source: Src,
        leads: L,
        remarks: R,
        checkpoints: C,
        accounts: A,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            leads,
            remarks,
            checkpoints,
            accounts,
            settings,
        }
    }

    /// Bounded incremental run over yesterday's window in the configured
    /// calendar. Zero rows is still a success with zero counts.
    pub async fn run_daily(&self) -> BridgeResult<SyncSummary> {
        self.run(Mode::Daily).await
    }

    /// Unbounded backfill loop from `start`, terminating when a fetched
    /// page comes back smaller than the requested limit.
    pub async fn run_historic(&self, start: NaiveDate) -> BridgeResult<SyncSummary> {
        self.run(Mode::Historic { start }).await
    }

    async fn run(&self, mode: Mode) -> BridgeResult<SyncSummary> {
        let started = Instant::now();

        // Fatal pre-flight, before any writes
        self.source.ping().await.map_err(|e| match e {
            BridgeError::Database(msg) => {
                BridgeError::Database(format!("source unreachable: {msg}"))
            }
            other => other,
        })?;

        let system_actor = self.accounts.find_supervisor().await?.ok_or_else(|| {
            BridgeError::Validation(
                "no usable system actor: an active supervisory account is required".to_string(),
            )
        })?;

        let checkpoint = self
            .checkpoints
            .get_or_create(SOURCE_TYPE, self.settings.default_lookback_days)
            .await?;
        let fallback_cursor = checkpoint_cursor(&checkpoint);

        let (from_date, to_date) = self.report_window(&mode);

        if self.checkpoints.acquire(SOURCE_TYPE).await?.is_none() {
            tracing::info!(source = SOURCE_TYPE, "sync already running, skipping this invocation");
            return Ok(RunStats::default().into_summary(
                from_date,
                to_date,
                Some(fallback_cursor),
                elapsed_ms(started),
            ));
        }

        match self.run_locked(&mode, system_actor.id).await {
            Ok((stats, committed)) => {
                self.checkpoints.release(SOURCE_TYPE, None).await?;
                let summary = stats.into_summary(
                    from_date,
                    to_date,
                    Some(committed.unwrap_or(fallback_cursor)),
                    elapsed_ms(started),
                );
                tracing::info!(
                    processed = summary.processed,
                    synced = summary.synced,
                    updated = summary.updated,
                    errors = summary.errors,
                    remarks = summary.remarks_synced,
                    "sync completed"
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(release_err) = self
                    .checkpoints
                    .release(SOURCE_TYPE, Some(&e.to_string()))
                    .await
                {
                    tracing::error!(error = %release_err, "failed to release checkpoint lease");
                }
                Err(e)
            }
        }
    }

    async fn run_locked(
        &self,
        mode: &Mode,
        system_actor: Uuid,
    ) -> BridgeResult<(RunStats, Option<Cursor>)> {
        let snapshot = self.accounts.list_active().await?;
        let resolver = Mutex::new(OwnerResolver::new(
            snapshot,
            self.settings.auto_create_owners,
            &self.settings.default_territory,
        ));

        let mut stats = RunStats::default();
        let mut committed: Option<Cursor> = None;

        match mode {
            Mode::Daily => {
                let (from, to) = self.daily_window_utc();
                tracing::info!(%from, %to, "daily sync window");

                // Lower bound is exclusive in the compound predicate
                let cursor = Cursor::new(from - Duration::milliseconds(1), 0);
                let rows = self
                    .source
                    .fetch_leads(cursor, Some(to), self.settings.daily_page_size)
                    .await?;
                let outcome = self
                    .process_page(rows, &resolver, system_actor, &mut stats)
                    .await?;
                committed = self.commit_page(&outcome, committed).await?;
            }
            Mode::Historic { start } => {
                let mut cursor =
                    Cursor::new(self.local_midnight_utc(*start) - Duration::milliseconds(1), 0);
                let limit = self.settings.historic_page_size;
                tracing::info!(start = %start, limit, "historic backfill starting");

                loop {
                    let page_started = Instant::now();
                    let rows = self.source.fetch_leads(cursor, None, limit).await?;
                    let read = rows.len();

                    let outcome = self
                        .process_page(rows, &resolver, system_actor, &mut stats)
                        .await?;
                    if let Some(max) = outcome.max_cursor {
                        cursor = max;
                    }
                    committed = self.commit_page(&outcome, committed).await?;

                    let secs = page_started.elapsed().as_secs_f64();
                    let rate = if secs > 0.0 { read as f64 / secs } else { 0.0 };
                    tracing::info!(
                        rows = read,
                        rows_per_sec = format!("{rate:.1}"),
                        total = stats.processed,
                        errors = stats.errors,
                        "historic page complete"
                    );

                    // A short page signals the source is exhausted
                    if (read as i64) < limit {
                        break;
                    }
                }

                if stats.errors > 0 {
                    let sample: Vec<&str> = stats.failure_sample().collect();
                    tracing::warn!(
                        errors = stats.errors,
                        ?sample,
                        "backfill finished with record failures"
                    );
                }
            }
        }

        Ok((stats, committed))
    }

    /// Advance the checkpoint over everything the page read. Unchanged and
    /// failed rows advance the cursor too; only writing rows would re-read
    /// the same page forever on an all-unchanged backfill.
    async fn commit_page(
        &self,
        outcome: &PageOutcome,
        previous: Option<Cursor>,
    ) -> BridgeResult<Option<Cursor>> {
        let Some(max) = outcome.max_cursor else {
            return Ok(previous);
        };
        let checkpoint = self
            .checkpoints
            .advance(SOURCE_TYPE, max.ts, max.id, outcome.read as i64)
            .await?;
        Ok(Some(checkpoint_cursor(&checkpoint)))
    }

    async fn process_page(
        &self,
        rows: Vec<SourceLead>,
        resolver: &Mutex<OwnerResolver>,
        system_actor: Uuid,
        stats: &mut RunStats,
    ) -> BridgeResult<PageOutcome> {
        let read = rows.len();
        if read == 0 {
            return Ok(PageOutcome {
                read: 0,
                max_cursor: None,
            });
        }

        // Commit candidate is folded over all rows read, not only writes
        let max_cursor = Cursor::max_of(rows.iter().map(|r| r.cursor()));
        let refs: Vec<String> = rows.iter().map(|r| r.external_ref()).collect();

        let snapshots: HashMap<String, LeadSnapshot> = self
            .leads
            .snapshots_by_refs(&refs)
            .await?
            .into_iter()
            .map(|s| (s.external_ref.clone(), s))
            .collect();

        stats.processed += read as u64;

        let snapshots_ref = &snapshots;
        let accounts = &self.accounts;
        let settings = &self.settings;
        let settled = pool::settle_all(rows, settings.concurrency, move |row| async move {
            let source_id = row.external_ref();
            let result: Result<(Lead, Change), String> = async {
                let owner = mapper::owner_name(&row).map_err(|e| e.to_string())?;
                let resolution = {
                    let mut resolver = resolver.lock().await;
                    resolver
                        .resolve(owner, accounts)
                        .await
                        .map_err(|e| e.to_string())?
                };
                let lead = mapper::map_lead(&row, &resolution, system_actor, settings)
                    .map_err(|e| e.to_string())?;
                let change = detect::classify(snapshots_ref.get(&lead.external_ref), &lead);
                Ok((lead, change))
            }
            .await;
            result.map_err(|reason| (source_id, reason))
        })
        .await;

        for (source_id, reason) in &settled.failed {
            tracing::warn!(row = %source_id, reason = %reason, "record failed, excluded from writes");
            stats.record_failure(source_id, reason);
        }

        let mut writer = BatchWriter::new(settings.create_chunk, settings.update_chunk);
        for (lead, change) in settled.succeeded {
            writer.stage(lead, change);
        }
        let (creates, updates) = writer.pending();
        tracing::debug!(creates, updates, "writing page");

        let write_stats = writer.apply(&self.leads).await?;
        stats.synced += write_stats.created;
        stats.updated += write_stats.updated;
        for (external_ref, reason) in &write_stats.failed {
            stats.record_failure(external_ref, reason);
        }

        // Remarks run for every ref read, decoupled from the lead write
        // outcome, and are never fatal to the parent sync.
        match remarks::sync_remarks(
            &self.source,
            &self.remarks,
            &refs,
            settings.ref_chunk,
            settings.create_chunk,
        )
        .await
        {
            Ok(n) => stats.remarks_synced += n,
            Err(e) => tracing::warn!(error = %e, "remark sync failed, continuing"),
        }

        Ok(PageOutcome { read, max_cursor })
    }

    fn offset_seconds(&self) -> i64 {
        i64::from(self.settings.utc_offset_minutes) * 60
    }

    fn local_midnight_utc(&self, date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
            - Duration::seconds(self.offset_seconds())
    }

    fn local_today(&self) -> NaiveDate {
        (Utc::now() + Duration::seconds(self.offset_seconds())).date_naive()
    }

    /// Yesterday 00:00 through today 00:00 in the configured calendar,
    /// expressed in UTC. Independent of the server time zone.
    fn daily_window_utc(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = self.local_today();
        let yesterday = today.pred_opt().unwrap_or(today);
        (
            self.local_midnight_utc(yesterday),
            self.local_midnight_utc(today),
        )
    }

    fn report_window(&self, mode: &Mode) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match mode {
            Mode::Daily => {
                let today = self.local_today();
                (today.pred_opt(), Some(today))
            }
            Mode::Historic { start } => (Some(*start), None),
        }
    }
}

fn checkpoint_cursor(checkpoint: &SyncCheckpoint) -> Cursor {
    Cursor::new(
        checkpoint.last_synced_at,
        checkpoint.last_synced_id.unwrap_or(0),
    )
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
