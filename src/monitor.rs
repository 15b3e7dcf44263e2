//! Per-site monitoring: discover candidate article links, skip everything
//! already analyzed, and run the remainder through event extraction.
//!
//! A failing site degrades to zero results; a run is never aborted because
//! one outlet is down or serving broken markup.

use crate::api::Ask;
use crate::config::Site;
use crate::extract;
use crate::models::{EventRecord, Field};
use crate::scrape::{FetchText, discover_links};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use url::Url;

/// Cost/quota guard: at most this many new articles are analyzed per site
/// per run. Candidates come out of a set, so which ones land inside the cap
/// is not deterministic.
pub const MAX_NEW_ARTICLES_PER_SITE: usize = 5;

/// Monitor one site for new protest-event articles.
///
/// Links whose text matches a keyword are resolved, filtered against
/// `processed_urls`, and the first [`MAX_NEW_ARTICLES_PER_SITE`] survivors
/// are fetched and run through the extraction model. Every analyzed URL is
/// added to `processed_urls` immediately, relevant or not, so it is never
/// re-analyzed, neither later this run nor in any future run.
#[instrument(level = "info", skip_all, fields(site = %site.name))]
pub async fn monitor_site<F, L>(
    site: &Site,
    keywords: &[&str],
    reference_date: NaiveDate,
    processed_urls: &mut HashSet<String>,
    fetcher: &F,
    llm: &L,
) -> Vec<EventRecord>
where
    F: FetchText,
    L: Ask,
{
    info!("Monitoring site");
    let mut found = Vec::new();

    let base = match Url::parse(site.base_url) {
        Ok(base) => base,
        Err(e) => {
            warn!(url = %site.base_url, error = %e, "Invalid base URL; skipping site");
            return found;
        }
    };

    let html = match fetcher.page_html(site.base_url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %site.base_url, error = %e, "Could not access site; skipping");
            return found;
        }
    };

    let candidates: Vec<String> = discover_links(&html, &base, keywords)
        .into_iter()
        .filter(|url| !processed_urls.contains(url))
        .collect();
    info!(count = candidates.len(), "New potentially relevant articles found");

    for url in candidates.into_iter().take(MAX_NEW_ARTICLES_PER_SITE) {
        info!(%url, "Analyzing article");
        if let Some(text) = fetcher.article_text(&url).await {
            if let Some(mut record) = extract::extract_event(llm, &text, reference_date).await {
                record.sources.insert(&url);
                // Attribute organizer-less events to the outlet itself.
                record.organizer.fill_from(&Field::from(site.name));
                info!("Relevant event detected");
                found.push(record);
            }
        }
        // Processed means analyzed, not "yielded an event".
        processed_urls.insert(url);
    }

    info!(count = found.len(), "Site monitoring finished");
    found
}
