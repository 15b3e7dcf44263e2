//! Web search lookup, used only by the gap-filler.
//!
//! Queries the DuckDuckGo HTML endpoint (no API key, stable markup) and
//! unwraps its redirect links back to the target URLs.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument};

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

static RESULT_ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a.result__a").unwrap());

/// One search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

/// Bounded text search over the open web.
pub trait SearchLookup {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, Box<dyn Error>>;
}

/// DuckDuckGo HTML search.
pub struct DdgSearch {
    http: reqwest::Client,
}

impl DdgSearch {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let http = reqwest::Client::builder().timeout(SEARCH_TIMEOUT).build()?;
        Ok(Self { http })
    }
}

impl SearchLookup for DdgSearch {
    #[instrument(level = "info", skip(self))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, Box<dyn Error>> {
        let url = format!("{}?q={}", SEARCH_ENDPOINT, urlencoding::encode(query));
        let html = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let hits = parse_results(&html, max_results);
        debug!(count = hits.len(), "Search results parsed");
        Ok(hits)
    }
}

/// Unwrap a result link to its target URL.
///
/// DuckDuckGo wraps targets in `//duckduckgo.com/l/?uddg=<encoded>&rut=...`
/// redirects; direct `http(s)` links pass through unchanged.
pub fn decode_result_href(href: &str) -> Option<String> {
    if let Some(pos) = href.find("uddg=") {
        let encoded = &href[pos + "uddg=".len()..];
        let encoded = encoded.split('&').next().unwrap_or(encoded);
        return urlencoding::decode(encoded).ok().map(|u| u.into_owned());
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    None
}

/// Extract up to `max_results` hits from a results page.
pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let mut hits = Vec::new();

    for anchor in document.select(&RESULT_ANCHOR) {
        if hits.len() >= max_results {
            break;
        }
        let href = match anchor.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        if let Some(url) = decode_result_href(href) {
            let title = anchor.text().collect::<Vec<_>>().join(" ").trim().to_string();
            hits.push(SearchHit { url, title });
        }
    }

    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_redirect_href() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fprensaobrera.com%2Fnota&rut=abc123";
        assert_eq!(
            decode_result_href(href).unwrap(),
            "https://prensaobrera.com/nota"
        );
    }

    #[test]
    fn test_decode_direct_href() {
        assert_eq!(
            decode_result_href("https://anred.org/nota").unwrap(),
            "https://anred.org/nota"
        );
    }

    #[test]
    fn test_decode_scheme_relative_href() {
        assert_eq!(
            decode_result_href("//anred.org/nota").unwrap(),
            "https://anred.org/nota"
        );
    }

    #[test]
    fn test_decode_garbage_href() {
        assert!(decode_result_href("javascript:void(0)").is_none());
    }

    #[test]
    fn test_parse_results_bounded() {
        let html = r#"
            <div class="result"><a class="result__a"
              href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.test%2F1">Uno</a></div>
            <div class="result"><a class="result__a"
              href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.test%2F2">Dos</a></div>
            <div class="result"><a class="result__a"
              href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.test%2F3">Tres</a></div>"#;

        let hits = parse_results(html, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a.test/1");
        assert_eq!(hits[0].title, "Uno");
        assert_eq!(hits[1].url, "https://a.test/2");
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html><body>Sin resultados</body></html>", 3).is_empty());
    }
}
