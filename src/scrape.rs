//! Page fetching and article-text extraction.
//!
//! News-site markup varies wildly, so article text is recovered with layered
//! heuristics: prefer an `<article>` element, then a `div` whose class names
//! mention `content` or `post`, and as a last resort every `<p>` in the
//! document. The [`FetchText`] trait seam keeps the monitor and gap-filler
//! testable with canned pages.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Browser User-Agent; several of the monitored outlets reject the default
/// reqwest one.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

const LISTING_TIMEOUT: Duration = Duration::from_secs(15);
const ARTICLE_TIMEOUT: Duration = Duration::from_secs(10);

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div[class]").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Access to remote page content.
///
/// `page_html` is for listing pages, where a fetch failure is an error the
/// caller logs; `article_text` already folds fetch and parse failures into
/// "unavailable" since a single bad article never matters to a run.
pub trait FetchText {
    async fn page_html(&self, url: &str) -> Result<String, Box<dyn Error>>;
    async fn article_text(&self, url: &str) -> Option<String>;
}

/// The real, reqwest-backed fetcher.
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }
}

impl FetchText for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn page_html(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let response = self
            .http
            .get(url)
            .timeout(LISTING_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn article_text(&self, url: &str) -> Option<String> {
        let response = match self.http.get(url).timeout(ARTICLE_TIMEOUT).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(%url, error = %e, "Article fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "Article fetch returned non-success status");
            return None;
        }
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(%url, error = %e, "Article body read failed");
                return None;
            }
        };

        let text = extract_article_text(&body);
        if text.is_none() {
            debug!(%url, "No article text found in page");
        }
        text
    }
}

fn element_text(el: scraper::ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Pull plain article text out of an HTML document, or `None` if the page
/// holds no paragraph content.
pub fn extract_article_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let body = document.select(&ARTICLE).next().or_else(|| {
        document.select(&DIV).find(|el| {
            el.value()
                .attr("class")
                .is_some_and(|c| c.contains("content") || c.contains("post"))
        })
    });

    let paragraphs: Vec<String> = match body {
        Some(el) => el.select(&PARAGRAPH).map(element_text).collect(),
        None => document.select(&PARAGRAPH).map(element_text).collect(),
    };

    let text = paragraphs
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.trim().is_empty() { None } else { Some(text) }
}

/// Collect outbound links whose visible text mentions any of `keywords`
/// (case-insensitive substring match), resolved against `base`.
///
/// Returned as a set: listing pages routinely link the same article from a
/// headline, a teaser, and an image caption.
pub fn discover_links(html: &str, base: &Url, keywords: &[&str]) -> HashSet<String> {
    let document = Html::parse_document(html);
    let mut links = HashSet::new();

    for anchor in document.select(&ANCHOR) {
        let title = element_text(anchor).to_lowercase();
        if !keywords.iter().any(|kw| title.contains(kw)) {
            continue;
        }
        let href = match anchor.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        match base.join(href) {
            Ok(resolved) => {
                links.insert(resolved.to_string());
            }
            Err(e) => {
                debug!(%href, error = %e, "Skipping unresolvable link");
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_article_text_prefers_article_element() {
        let html = r#"
            <html><body>
              <p>navegación</p>
              <article><p>Primer párrafo.</p><p>Segundo párrafo.</p></article>
            </body></html>"#;
        assert_eq!(
            extract_article_text(html).unwrap(),
            "Primer párrafo. Segundo párrafo."
        );
    }

    #[test]
    fn test_extract_article_text_content_div_fallback() {
        let html = r#"
            <html><body>
              <div class="sidebar"><p>menú</p></div>
              <div class="main-content"><p>El gremio anunció un paro.</p></div>
            </body></html>"#;
        // The sidebar div is skipped; the content div wins over the
        // whole-page fallback, so the menu paragraph is excluded.
        assert_eq!(
            extract_article_text(html).unwrap(),
            "El gremio anunció un paro."
        );
    }

    #[test]
    fn test_extract_article_text_all_paragraphs_fallback() {
        let html = "<html><body><p>Uno.</p><span><p>Dos.</p></span></body></html>";
        assert_eq!(extract_article_text(html).unwrap(), "Uno. Dos.");
    }

    #[test]
    fn test_extract_article_text_empty_page() {
        assert!(extract_article_text("<html><body><div>sin párrafos</div></body></html>").is_none());
    }

    #[test]
    fn test_discover_links_keyword_match_is_case_insensitive() {
        let base = Url::parse("https://diario.test/").unwrap();
        let html = r#"
            <a href="/nota1">Gran MARCHA al Congreso</a>
            <a href="/nota2">Resultados del fútbol</a>
            <a href="https://otro.test/nota3">Paro de colectivos</a>"#;
        let links = discover_links(html, &base, &["marcha", "paro"]);
        assert_eq!(links.len(), 2);
        assert!(links.contains("https://diario.test/nota1"));
        assert!(links.contains("https://otro.test/nota3"));
    }

    #[test]
    fn test_discover_links_resolves_relative_urls() {
        let base = Url::parse("https://diario.test/secciones/pais").unwrap();
        let html = r#"<a href="/politica/corte-en-el-puente">Corte en el puente</a>"#;
        let links = discover_links(html, &base, &["corte"]);
        assert!(links.contains("https://diario.test/politica/corte-en-el-puente"));
    }

    #[test]
    fn test_discover_links_dedupes_repeated_articles() {
        let base = Url::parse("https://diario.test/").unwrap();
        let html = r#"
            <a href="/nota1">Piquete en la 9 de Julio</a>
            <a href="/nota1">Piquete en la 9 de Julio (foto)</a>"#;
        let links = discover_links(html, &base, &["piquete"]);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_discover_links_no_keywords_no_links() {
        let base = Url::parse("https://diario.test/").unwrap();
        let html = r#"<a href="/nota1">Noticias de espectáculos</a>"#;
        assert!(discover_links(html, &base, &["huelga"]).is_empty());
    }
}
