//! # Protest Monitor
//!
//! A monitoring pipeline that watches Argentine news sites for announcements
//! of upcoming protests and labor actions, extracts structured event records
//! from article text through an LLM, and maintains a deduplicated,
//! continuously-growing event ledger persisted as a single JSON document.
//!
//! ## Usage
//!
//! ```sh
//! ZHIPU_API_KEY=... protest_monitor -l protests.json
//! ```
//!
//! ## Architecture
//!
//! One run is a single pass:
//! 1. **Load**: read the ledger and derive the processed-URL set from it
//! 2. **Monitor**: per site, discover keyword-matching article links, skip
//!    everything already analyzed, extract events from a bounded sample
//! 3. **Consolidate**: merge new and historical records under fuzzy,
//!    date-partitioned identity
//! 4. **Backfill**: hunt missing start times for upcoming, freshly-touched
//!    events via web search
//! 5. **Sort / Persist / Report**: order by `(date, time)`, rewrite the
//!    ledger whole, print the schedule
//!
//! External collaborators (article fetching, the extraction model, web
//! search) degrade to empty results on failure; only a defect in the
//! pipeline itself aborts a run.

use chrono::{Local, NaiveDate};
use clap::Parser;
use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod backfill;
mod cli;
mod config;
mod consolidate;
mod extract;
mod ledger;
mod models;
mod monitor;
mod report;
mod scrape;
mod search;
mod utils;

use api::{ChatClient, RetryAsk};
use backfill::{backfill_time, eligible_for_backfill};
use cli::Cli;
use config::MonitorConfig;
use consolidate::{consolidate, sort_schedule};
use models::EventRecord;
use monitor::monitor_site;
use scrape::HttpFetcher;
use search::DdgSearch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("protest_monitor starting up");

    let args = Cli::parse();

    let reference_date: NaiveDate = match &args.reference_date {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")?,
        None => Local::now().date_naive(),
    };
    info!(%reference_date, ledger = %args.ledger_path, "Run parameters");

    // --- Collaborators ---
    let api_key = args.api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        warn!("No API key configured; extraction calls will fail and articles will be skipped");
    }
    let chat = ChatClient::new(&args.api_base_url, api_key, &args.model)?;
    let llm = RetryAsk::new(chat, 5, Duration::from_secs(1));
    let fetcher = HttpFetcher::new()?;
    let searcher = DdgSearch::new()?;
    let monitor_config = MonitorConfig::argentina();

    // --- Load history and seed the processed-URL set ---
    let history = ledger::load_ledger(&args.ledger_path).await;
    let mut processed_urls = ledger::processed_urls(&history.events);
    info!(
        events = history.events.len(),
        processed_urls = processed_urls.len(),
        "Historical state loaded"
    );

    // --- Monitor all sources, sequentially ---
    let mut fresh: Vec<EventRecord> = Vec::new();
    for site in &monitor_config.sites {
        let found = monitor_site(
            site,
            &monitor_config.keywords,
            reference_date,
            &mut processed_urls,
            &fetcher,
            &llm,
        )
        .await;
        fresh.extend(found);
    }

    if fresh.is_empty() {
        info!("No new events found this run");
    } else {
        info!(
            new = fresh.len(),
            historical = history.events.len(),
            "Consolidating new events with history"
        );
    }

    // Which URLs this run discovered, for the backfill eligibility check.
    let fresh_urls: HashSet<String> = fresh
        .iter()
        .flat_map(|e| e.sources.iter())
        .map(String::from)
        .collect();

    // --- Consolidate: new records first, so their field values win ties ---
    let mut combined = fresh;
    combined.extend(history.events);
    let consolidated = consolidate(combined);
    info!(count = consolidated.len(), "Consolidation complete");

    // --- Backfill missing times for upcoming, freshly-touched events ---
    let mut events: Vec<EventRecord> = Vec::with_capacity(consolidated.len());
    for event in consolidated {
        if eligible_for_backfill(&event, reference_date, &fresh_urls) {
            events.push(backfill_time(event, &searcher, &fetcher, &llm).await);
        } else {
            events.push(event);
        }
    }

    // --- Sort, persist, report ---
    sort_schedule(&mut events);

    if let Err(e) = ledger::save_ledger(&args.ledger_path, &events).await {
        // The previous ledger on disk is untouched; the run still reports.
        error!(path = %args.ledger_path, error = %e, "Failed to save event ledger");
    }

    report::print_report(&events);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        events = events.len(),
        "Monitoring run complete"
    );

    Ok(())
}
