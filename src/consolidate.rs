//! The consolidation engine: merging event records that describe the same
//! real-world protest.
//!
//! News sites report one event with inconsistent specificity, so identity is
//! fuzzy and multi-field: exact date equality partitions the candidates
//! cheaply, and a token-order-insensitive similarity score over place,
//! organizer, or reason decides the match, so any single field may be garbled
//! or absent without losing it. Merging is strictly additive: a concrete
//! field is never overwritten, sources only grow.
//!
//! `consolidate` is deterministic given input order, performs no I/O, and is
//! idempotent: a second pass over its own output finds nothing left to merge.

use crate::models::EventRecord;
use strsim::normalized_levenshtein;

/// Minimum place similarity to consider two same-day records one event.
pub const PLACE_SIMILARITY_MIN: f64 = 80.0;
/// Minimum organizer similarity to consider two same-day records one event.
pub const ORGANIZER_SIMILARITY_MIN: f64 = 80.0;
/// Minimum reason similarity to consider two same-day records one event.
/// Stricter than the others: reasons are longer prose and collide more easily.
pub const REASON_SIMILARITY_MIN: f64 = 85.0;

fn token_sort_normalize(s: &str) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    let folded: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    tokens.extend(folded.split_whitespace());
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-order-insensitive similarity in `[0, 100]`.
///
/// Both inputs are case-folded, stripped to alphanumeric tokens, and sorted
/// before a normalized Levenshtein comparison, so "Obelisco, Buenos Aires"
/// and "buenos aires obelisco" score 100.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&token_sort_normalize(a), &token_sort_normalize(b)) * 100.0
}

/// Identity check: same (specified) date, plus high similarity in at least
/// one of place, organizer, or reason.
///
/// Fields are compared in their external text form, so two unspecified
/// fields count as identical for matching purposes.
fn same_event(incoming: &EventRecord, existing: &EventRecord) -> bool {
    let dates_match = match (incoming.date.as_specified(), existing.date.as_specified()) {
        (Some(a), Some(b)) => a == b,
        // A record without a date matches nothing, not even another dateless one.
        _ => false,
    };
    if !dates_match {
        return false;
    }

    token_sort_ratio(incoming.place.as_text(), existing.place.as_text()) >= PLACE_SIMILARITY_MIN
        || token_sort_ratio(incoming.organizer.as_text(), existing.organizer.as_text())
            >= ORGANIZER_SIMILARITY_MIN
        || token_sort_ratio(incoming.reason.as_text(), existing.reason.as_text())
            >= REASON_SIMILARITY_MIN
}

/// Fold `incoming` into `existing`: backfill unspecified fields, union
/// sources. `measure_type` is left alone; the first sighting names the
/// action.
fn merge_into(existing: &mut EventRecord, incoming: &EventRecord) {
    existing.time.fill_from(&incoming.time);
    existing.place.fill_from(&incoming.place);
    existing.organizer.fill_from(&incoming.organizer);
    existing.reason.fill_from(&incoming.reason);
    existing.sources.union(&incoming.sources);
}

/// Merge a combined list of event records into a deduplicated set.
///
/// Records are taken in order; each either folds into the **first** already-
/// accepted record it matches (first-match wins, preserving encounter order
/// as the tie-break) or is appended as a new entry.
pub fn consolidate(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut consolidated: Vec<EventRecord> = Vec::new();

    for incoming in records {
        match consolidated.iter_mut().find(|ex| same_event(&incoming, ex)) {
            Some(existing) => merge_into(existing, &incoming),
            None => consolidated.push(incoming),
        }
    }

    consolidated
}

/// Order events ascending by `(date, time)`; undated/untimed events last.
pub fn sort_schedule(events: &mut [EventRecord]) {
    events.sort_by_key(|e| e.sort_key());
}
