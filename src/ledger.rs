//! Ledger persistence and processed-URL bookkeeping.
//!
//! The ledger file is the system's only durable state. It is read once at
//! startup and rewritten whole at the end of a run; a failed write leaves the
//! previous file untouched, and a missing or corrupt file on load simply
//! means starting with an empty history.

use crate::models::{EventRecord, Ledger};
use chrono::Local;
use std::collections::HashSet;
use std::error::Error;
use std::io::ErrorKind;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Load the ledger, degrading every failure to an empty history.
#[instrument(level = "info", fields(path = %path))]
pub async fn load_ledger(path: &str) -> Ledger {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No ledger file yet; starting with an empty history");
            return Ledger::default();
        }
        Err(e) => {
            warn!(error = %e, "Ledger file unreadable; starting with an empty history");
            return Ledger::default();
        }
    };

    match serde_json::from_str::<Ledger>(&raw) {
        Ok(ledger) => {
            info!(events = ledger.events.len(), "Loaded historical events");
            ledger
        }
        Err(e) => {
            warn!(error = %e, "Ledger file corrupt; starting with an empty history");
            Ledger::default()
        }
    }
}

/// Persist the full event set as an indented JSON document, stamped with the
/// current local time.
///
/// One whole-document write: the previous file survives intact if this
/// errors before or during the write.
#[instrument(level = "info", skip(events), fields(path = %path, count = events.len()))]
pub async fn save_ledger(path: &str, events: &[EventRecord]) -> Result<(), Box<dyn Error>> {
    let ledger = Ledger {
        last_updated: Local::now().to_rfc3339(),
        events: events.to_vec(),
    };
    let json = serde_json::to_string_pretty(&ledger)?;
    fs::write(path, json).await?;
    info!("Event ledger saved");
    Ok(())
}

/// Every source URL appearing in `events`, as a flat set.
///
/// This seeds the run's processed-URL set before any site is monitored, so
/// an article captured by a past run is never fetched or analyzed again.
pub fn processed_urls(events: &[EventRecord]) -> HashSet<String> {
    events
        .iter()
        .flat_map(|event| event.sources.iter())
        .map(String::from)
        .collect()
}
