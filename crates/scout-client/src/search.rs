use std::time::Duration;

use reqwest::Client;
use scout_core::error::AppError;
use scout_core::models::SearchHit;
use scout_core::traits::SearchEngine;
use scraper::{Html, Selector};
use url::Url;

use crate::fetcher::BROWSER_USER_AGENT;

const DUCKDUCKGO_HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Keyless web search against DuckDuckGo's HTML endpoint.
#[derive(Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new() -> Result<Self, AppError> {
        Self::with_endpoint(DUCKDUCKGO_HTML_ENDPOINT)
    }

    /// Point at a different HTML endpoint (a local stub in tests).
    pub fn with_endpoint(endpoint: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(DEFAULT_SEARCH_TIMEOUT)
            .build()
            .map_err(|e| AppError::SearchError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl SearchEngine for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| AppError::SearchError(format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::SearchError(format!(
                "Search returned HTTP {} for '{query}'",
                status.as_u16()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::SearchError(format!("Failed to read search results: {e}")))?;

        parse_results(&html, max_results)
    }
}

/// Parse a DuckDuckGo HTML results page into at most `max_results` hits.
///
/// Result links are usually wrapped in a `/l/?uddg=<target>` redirect; the
/// target is unwrapped. Ads (`y.js` links) are skipped.
pub fn parse_results(html: &str, max_results: usize) -> Result<Vec<SearchHit>, AppError> {
    let result_sel = selector(".result")?;
    let link_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let document = Html::parse_document(html);
    let mut hits = Vec::new();

    for result in document.select(&result_sel) {
        if hits.len() >= max_results {
            break;
        }

        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(resolve_href) else {
            continue;
        };

        let title = collapse_whitespace(&link.text().collect::<String>());
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .unwrap_or_default();

        hits.push(SearchHit {
            title,
            url,
            snippet,
        });
    }

    Ok(hits)
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::SearchError(format!("Invalid selector {css}: {e}")))
}

fn resolve_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    let host = parsed.host_str()?;

    if host.ends_with("duckduckgo.com") {
        if parsed.path() == "/y.js" {
            return None;
        }
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }

    matches!(parsed.scheme(), "http" | "https").then_some(absolute)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
