//! Gap-filling: recover a consolidated event's missing start time through a
//! targeted web search and a narrow re-extraction.
//!
//! This is best-effort API spend: the first search result that yields a time
//! wins, nothing is cross-checked, and every failure along the way simply
//! means the time stays unspecified.

use crate::api::Ask;
use crate::extract;
use crate::models::{EventRecord, Field};
use crate::scrape::FetchText;
use crate::search::SearchLookup;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Bounded search width for one missing-time lookup.
const MAX_SEARCH_RESULTS: usize = 3;

/// How much of the reason feeds the query; full reasons are prose and drown
/// the search terms.
const REASON_QUERY_WORDS: usize = 5;

/// Build the natural-language query used to hunt for an event's start time.
pub fn time_query(record: &EventRecord) -> String {
    let short_reason = record
        .reason
        .as_specified()
        .unwrap_or_default()
        .split_whitespace()
        .take(REASON_QUERY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "a qué hora es la protesta de {} en {} el {} por {}",
        record.organizer.as_specified().unwrap_or_default(),
        record.place.as_specified().unwrap_or_default(),
        record.date.as_specified().unwrap_or_default(),
        short_reason,
    )
}

/// Backfill eligibility, enforced by the orchestrator: only events on or
/// after the reference date, AND touched by this run's fresh discoveries,
/// get searched. Purely historical records are left as-is to avoid repeated
/// API spend on already-settled data.
///
/// Membership is exact on normalized source URLs, so one URL being a prefix
/// of another can never produce a false positive.
pub fn eligible_for_backfill(
    record: &EventRecord,
    reference_date: NaiveDate,
    fresh_urls: &HashSet<String>,
) -> bool {
    let reference = reference_date.format("%Y-%m-%d").to_string();
    let upcoming = record
        .date
        .as_specified()
        .is_some_and(|d| d >= reference.as_str());

    upcoming && record.sources.iter().any(|url| fresh_urls.contains(url))
}

/// Try to recover a missing start time for `record`.
///
/// No-op if the time is already known. Otherwise runs a bounded search and
/// asks the model, per result in order, for just the time; the first
/// non-sentinel answer is adopted and the contributing URL joins the
/// record's sources. Exhausting all results leaves the record unchanged.
#[instrument(level = "info", skip_all, fields(place = %record.place, date = %record.date))]
pub async fn backfill_time<S, F, L>(
    mut record: EventRecord,
    searcher: &S,
    fetcher: &F,
    llm: &L,
) -> EventRecord
where
    S: SearchLookup,
    F: FetchText,
    L: Ask,
{
    if !record.time.is_unspecified() {
        return record;
    }

    info!("Searching for missing start time");
    let query = time_query(&record);

    let results = match searcher.search(&query, MAX_SEARCH_RESULTS).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = %e, "Time search failed; leaving time unspecified");
            return record;
        }
    };
    if results.is_empty() {
        info!("Search returned no results");
        return record;
    }

    for hit in results {
        info!(url = %hit.url, "Analyzing search result");
        let text = match fetcher.article_text(&hit.url).await {
            Some(text) => text,
            None => continue,
        };

        let time = extract::extract_time(llm, &text).await;
        if let Field::Specified(_) = time {
            info!(time = %time, "Start time found");
            record.time = time;
            record.sources.insert(&hit.url);
            return record;
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceSet;
    use crate::search::SearchHit;
    use std::error::Error;
    use std::sync::Mutex;

    fn record_without_time() -> EventRecord {
        EventRecord {
            date: Field::from("2025-03-10"),
            time: Field::Unspecified,
            place: Field::from("Congreso Nacional"),
            organizer: Field::from("Camioneros"),
            measure_type: Field::from("Marcha"),
            reason: Field::from("Reclamo por paritarias y condiciones de trabajo"),
            sources: SourceSet::single("https://a.test/1"),
        }
    }

    /// Search that must never be reached.
    struct PanicSearch;

    impl SearchLookup for PanicSearch {
        async fn search(
            &self,
            _query: &str,
            _max: usize,
        ) -> Result<Vec<SearchHit>, Box<dyn Error>> {
            panic!("search invoked for a record that needed no backfill");
        }
    }

    struct CannedSearch(Vec<SearchHit>);

    impl SearchLookup for CannedSearch {
        async fn search(
            &self,
            _query: &str,
            max: usize,
        ) -> Result<Vec<SearchHit>, Box<dyn Error>> {
            Ok(self.0.iter().take(max).cloned().collect())
        }
    }

    struct FailingSearch;

    impl SearchLookup for FailingSearch {
        async fn search(
            &self,
            _query: &str,
            _max: usize,
        ) -> Result<Vec<SearchHit>, Box<dyn Error>> {
            Err("rate limited".into())
        }
    }

    /// Serves article text and records which URLs were fetched.
    struct TrackingFetcher {
        fetched: Mutex<Vec<String>>,
    }

    impl TrackingFetcher {
        fn new() -> Self {
            Self {
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    impl FetchText for TrackingFetcher {
        async fn page_html(&self, _url: &str) -> Result<String, Box<dyn Error>> {
            unreachable!("gap-filler never fetches listing pages")
        }

        async fn article_text(&self, url: &str) -> Option<String> {
            self.fetched.lock().unwrap().push(url.to_string());
            Some(format!("texto de {url}"))
        }
    }

    /// Returns a time only for article text mentioning `con-horario`.
    struct TimeLlm;

    impl Ask for TimeLlm {
        async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
            if prompt.contains("con-horario") {
                Ok("17:30".to_string())
            } else {
                Ok("No especificado".to_string())
            }
        }
    }

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            url: url.to_string(),
            title: "resultado".to_string(),
        }
    }

    #[tokio::test]
    async fn test_backfill_noop_when_time_known() {
        let mut record = record_without_time();
        record.time = Field::from("18:00");

        let fetcher = TrackingFetcher::new();
        let result = backfill_time(record.clone(), &PanicSearch, &fetcher, &TimeLlm).await;
        assert_eq!(result, record);
        assert!(fetcher.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backfill_first_success_wins() {
        let searcher = CannedSearch(vec![
            hit("https://b.test/sin-horario"),
            hit("https://b.test/con-horario"),
            hit("https://b.test/tampoco"),
        ]);
        let fetcher = TrackingFetcher::new();

        let result =
            backfill_time(record_without_time(), &searcher, &fetcher, &TimeLlm).await;

        assert_eq!(result.time.as_text(), "17:30");
        assert!(result.sources.contains("https://b.test/con-horario"));
        // The third result is never touched once a time is found.
        let fetched = fetcher.fetched.lock().unwrap();
        assert_eq!(
            *fetched,
            vec![
                "https://b.test/sin-horario".to_string(),
                "https://b.test/con-horario".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_backfill_exhausted_results_leave_time_unspecified() {
        let searcher = CannedSearch(vec![hit("https://b.test/1"), hit("https://b.test/2")]);
        let fetcher = TrackingFetcher::new();

        let result =
            backfill_time(record_without_time(), &searcher, &fetcher, &TimeLlm).await;

        assert!(result.time.is_unspecified());
        assert_eq!(result.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_backfill_search_failure_is_not_fatal() {
        let fetcher = TrackingFetcher::new();
        let result =
            backfill_time(record_without_time(), &FailingSearch, &fetcher, &TimeLlm).await;
        assert!(result.time.is_unspecified());
    }

    #[test]
    fn test_time_query_contains_event_facts() {
        let query = time_query(&record_without_time());
        assert!(query.contains("Camioneros"));
        assert!(query.contains("Congreso Nacional"));
        assert!(query.contains("2025-03-10"));
        // Only the first five words of the reason.
        assert!(query.contains("Reclamo por paritarias y condiciones"));
        assert!(!query.contains("trabajo"));
    }

    #[test]
    fn test_eligibility_requires_upcoming_date_and_fresh_source() {
        let reference = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let fresh: HashSet<String> = HashSet::from(["https://a.test/1".to_string()]);

        // Upcoming and freshly sourced.
        assert!(eligible_for_backfill(&record_without_time(), reference, &fresh));

        // Past event: never re-queried, even though its source is fresh.
        let mut past = record_without_time();
        past.date = Field::from("2025-01-05");
        assert!(!eligible_for_backfill(&past, reference, &fresh));

        // Purely historical source set.
        assert!(!eligible_for_backfill(
            &record_without_time(),
            reference,
            &HashSet::from(["https://old.test/9".to_string()]),
        ));

        // Undated records are ineligible.
        let mut undated = record_without_time();
        undated.date = Field::Unspecified;
        assert!(!eligible_for_backfill(&undated, reference, &fresh));
    }

    #[test]
    fn test_eligibility_membership_is_exact_not_substring() {
        let reference = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        // A fresh URL that is a *prefix* of the record's source must not count.
        let fresh: HashSet<String> = HashSet::from(["https://a.test/".to_string()]);
        assert!(!eligible_for_backfill(&record_without_time(), reference, &fresh));
    }

    #[tokio::test]
    async fn test_backfill_same_day_event_is_searched() {
        // "On or after" includes the reference day itself.
        let reference = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let fresh: HashSet<String> = HashSet::from(["https://a.test/1".to_string()]);
        assert!(eligible_for_backfill(&record_without_time(), reference, &fresh));
    }
}
