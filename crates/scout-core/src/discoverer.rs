use std::collections::HashSet;
use std::time::Duration;

use crate::models::CandidateUrl;
use crate::traits::SearchEngine;
use crate::url_filter::is_career_url;

/// Results requested from the search provider per query.
pub const RESULTS_PER_QUERY: usize = 10;

/// Pause between consecutive queries to stay under provider throttling.
pub const DEFAULT_QUERY_DELAY: Duration = Duration::from_millis(500);

/// Runs search queries and collects candidate career-page URLs.
#[derive(Clone)]
pub struct PageDiscoverer<S: SearchEngine> {
    search: S,
    query_delay: Duration,
    results_per_query: usize,
}

impl<S: SearchEngine> PageDiscoverer<S> {
    pub fn new(search: S) -> Self {
        Self {
            search,
            query_delay: DEFAULT_QUERY_DELAY,
            results_per_query: RESULTS_PER_QUERY,
        }
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    pub fn with_results_per_query(mut self, n: usize) -> Self {
        self.results_per_query = n;
        self
    }

    /// Search each query in turn until `max_results` distinct career URLs are found.
    ///
    /// A failing query is logged and skipped. URLs come back in the order they
    /// were first seen.
    pub async fn discover(&self, queries: &[String], max_results: usize) -> Vec<CandidateUrl> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut found: Vec<CandidateUrl> = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            if found.len() >= max_results {
                break;
            }
            if i > 0 && !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }

            tracing::info!(%query, "Searching");
            let hits = match self.search.search(query, self.results_per_query).await {
                Ok(hits) => hits,
                Err(e) => {
                    tracing::warn!(
                        %query,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Search failed, skipping query"
                    );
                    continue;
                }
            };

            for hit in hits {
                if hit.url.is_empty() || !is_career_url(&hit.url) {
                    tracing::debug!(url = %hit.url, "Rejected search hit");
                    continue;
                }
                if seen.insert(hit.url.clone()) {
                    found.push(CandidateUrl::new(hit.url));
                    if found.len() >= max_results {
                        break;
                    }
                }
            }
        }

        found
    }
}
