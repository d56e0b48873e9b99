use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::source::{SourceReader, SourceRemark};
use leadbridge_common::error::BridgeResult;
use leadbridge_db::remark::models::{Remark, RemarkKey};
use leadbridge_db::remark::repositories::RemarkRepository;

/// Append-only propagation of remark rows for every external ref read this
/// page, regardless of whether the lead itself changed. Existing natural
/// keys are looked up in chunks and only unseen rows are inserted; the
/// insert itself is duplicate-tolerant as well, so overlapping runs cannot
/// double-write.
///
/// Errors propagate to the caller, which logs and continues; remarks are
/// enrichment, never fatal to the parent sync.
pub async fn sync_remarks<S, R>(
    source: &S,
    repo: &R,
    refs: &[String],
    lookup_chunk: usize,
    insert_chunk: usize,
) -> BridgeResult<u64>
where
    S: SourceReader + ?Sized,
    R: RemarkRepository + ?Sized,
{
    if refs.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    for ref_chunk in refs.chunks(lookup_chunk.max(1)) {
        let candidates = source.fetch_remarks(ref_chunk).await?;
        if candidates.is_empty() {
            continue;
        }

        let existing = repo.existing_keys(ref_chunk).await?;
        let mut staged: HashSet<RemarkKey> = HashSet::new();
        let mut fresh: Vec<Remark> = Vec::new();

        for candidate in candidates {
            let Some(remark) = to_remark(candidate) else {
                continue;
            };
            let key = remark.key();
            // Skip keys already stored and keys staged twice within this page
            if existing.contains(&key) || !staged.insert(key) {
                continue;
            }
            fresh.push(remark);
        }

        for chunk in fresh.chunks(insert_chunk.max(1)) {
            inserted += repo.insert_many(chunk).await?;
        }
    }

    Ok(inserted)
}

/// A remark without a body or timestamp has no natural key; drop it.
fn to_remark(candidate: SourceRemark) -> Option<Remark> {
    let body = candidate.body?.trim().to_string();
    if body.is_empty() {
        return None;
    }
    let noted_at = candidate.noted_at?;

    Some(Remark {
        id: Uuid::new_v4(),
        external_ref: candidate.lead_id.to_string(),
        noted_at,
        body,
        noted_by: candidate.noted_by,
        created_at: Utc::now(),
    })
}
