//! Cemetery filtering and ordering of resolved records.
//!
//! Both steps run after location resolution because the cemetery of a record
//! is only known once its plot chain has been walked.

use std::cmp::Reverse;

use camposanto_store::CemeteryId;
use tracing::debug;

use crate::{query::SortKey, resolve::ResolvedRecord, similarity::matches_cemetery_name};

/// Keep records located in the selected cemetery.
///
/// A known cemetery identity takes precedence and is matched exactly.
/// Otherwise a non-blank name is matched fuzzily against the resolved cemetery
/// name. With neither, the input is returned unchanged. Records whose cemetery
/// could not be resolved never survive an active filter.
pub fn apply_cemetery_filtering(
    records: Vec<ResolvedRecord>,
    cemetery_id: Option<CemeteryId>,
    cemetery_name: Option<&str>,
) -> Vec<ResolvedRecord> {
    let before = records.len();
    let kept = if let Some(id) = cemetery_id {
        records
            .into_iter()
            .filter(|r| r.cemetery_id() == Some(id))
            .collect::<Vec<_>>()
    } else if let Some(name) = cemetery_name.filter(|n| !n.trim().is_empty()) {
        records
            .into_iter()
            .filter(|r| matches_cemetery_name(r.cemetery_name(), name))
            .collect()
    } else {
        return records;
    };
    debug!(before, after = kept.len(), "Applied cemetery filter");
    kept
}

fn cemetery_sort_key(record: &ResolvedRecord) -> String {
    record.cemetery_name().unwrap_or_default().to_lowercase()
}

/// Order records by resolved cemetery name for the cemetery sort keys.
///
/// The sort is stable, so records in the same cemetery keep the order the
/// store returned them in. Unresolved cemeteries sort as the empty string.
/// Any other key leaves the store ordering untouched.
pub fn apply_cemetery_sorting(mut records: Vec<ResolvedRecord>, sort: SortKey) -> Vec<ResolvedRecord> {
    match sort {
        SortKey::CemeteryAsc => records.sort_by_cached_key(cemetery_sort_key),
        SortKey::CemeteryDesc => records.sort_by_cached_key(|r| Reverse(cemetery_sort_key(r))),
        _ => {}
    }
    records
}
