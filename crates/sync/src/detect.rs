use chrono::{DateTime, Utc};

use leadbridge_db::lead::models::{Lead, LeadSnapshot};

/// The significant field set, v1. Only these fields participate in change
/// detection; passthrough attributes ride along with an update when a
/// significant field (usually `source_updated_at`) moves. Extend this list
/// deliberately: every addition widens write amplification on backfills.
pub const SIGNIFICANT_FIELDS_V1: &[&str] = &[
    "subject_name",
    "contact_phone",
    "lifecycle_status",
    "owner_account_id",
    "territory",
    "treatment",
    "follow_up_on",
    "source_updated_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Create,
    Update,
    Unchanged,
}

/// Classify a freshly mapped record against the target snapshot.
pub fn classify(existing: Option<&LeadSnapshot>, mapped: &Lead) -> Change {
    let Some(existing) = existing else {
        return Change::Create;
    };

    let differs = existing.subject_name != mapped.subject_name
        || existing.contact_phone != mapped.contact_phone
        || existing.lifecycle_status != mapped.lifecycle_status
        || existing.owner_account_id != mapped.owner_account_id
        || existing.territory != mapped.territory
        || existing.treatment != mapped.treatment
        || existing.follow_up_on != mapped.follow_up_on
        || timestamp_differs(existing.source_updated_at, mapped.source_updated_at);

    if differs {
        Change::Update
    } else {
        Change::Unchanged
    }
}

/// A new non-null timestamp where the target holds null is a change; a null
/// arriving over an existing value is not (never clobber with null); equal
/// values to the second are unchanged.
fn timestamp_differs(existing: Option<DateTime<Utc>>, new: Option<DateTime<Utc>>) -> bool {
    match (existing, new) {
        (None, None) => false,
        (None, Some(_)) => true,
        (Some(_), None) => false,
        (Some(a), Some(b)) => a.timestamp() != b.timestamp(),
    }
}
