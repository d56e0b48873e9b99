use chrono::{DateTime, Utc};

/// Compound sync cursor: rows are ordered by effective timestamp first, id
/// second. The id breaks ties among rows sharing a timestamp, so paging
/// neither skips nor re-reads boundary rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pub ts: DateTime<Utc>,
    pub id: i64,
}

impl Cursor {
    pub fn new(ts: DateTime<Utc>, id: i64) -> Self {
        Self { ts, id }
    }

    /// Max cursor over a set of candidates. The commit candidate for a page
    /// is folded over all rows read, not only the rows written.
    pub fn max_of(candidates: impl IntoIterator<Item = Cursor>) -> Option<Cursor> {
        candidates.into_iter().max()
    }
}
