use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::discoverer::{DEFAULT_QUERY_DELAY, PageDiscoverer, RESULTS_PER_QUERY};
use crate::error::AppError;
use crate::extractor::JobExtractor;
use crate::models::{DiscoveredJob, DiscoveryRequest, DiscoveryResult};
use crate::page::PageFetcher;
use crate::queries::QuerySynthesizer;
use crate::traits::{ChatModel, Cleaner, CredentialProvider, Fetcher, SearchEngine};

/// Error entry reported when search turns up nothing worth crawling.
pub const NO_PAGES_FOUND: &str = "No career pages found for given criteria";

/// Tunables for one discovery pipeline.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum number of fetch+extract pipelines in flight at once.
    pub concurrency: usize,
    /// Pause between consecutive search queries.
    pub query_delay: Duration,
    /// Results requested from the search provider per query.
    pub results_per_query: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            query_delay: DEFAULT_QUERY_DELAY,
            results_per_query: RESULTS_PER_QUERY,
        }
    }
}

/// Pipeline state. A run with no candidate URLs jumps from
/// `UrlsDiscovered` straight to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStage {
    Idle,
    QueriesGenerated,
    UrlsDiscovered,
    Crawling,
    Aggregated,
    Done,
}

impl std::fmt::Display for DiscoveryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiscoveryStage::Idle => "idle",
            DiscoveryStage::QueriesGenerated => "queries_generated",
            DiscoveryStage::UrlsDiscovered => "urls_discovered",
            DiscoveryStage::Crawling => "crawling",
            DiscoveryStage::Aggregated => "aggregated",
            DiscoveryStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Events emitted while a discovery request moves through its stages.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent<'a> {
    Started {
        role: &'a str,
        location: &'a str,
    },
    QueriesGenerated {
        queries: &'a [String],
    },
    UrlsDiscovered {
        count: usize,
    },
    PageCrawled {
        url: &'a str,
        jobs: usize,
    },
    PageFailed {
        url: &'a str,
        error: &'a str,
    },
    Aggregated {
        jobs: usize,
        sources_crawled: usize,
    },
    Finished {
        jobs: usize,
        errors: usize,
    },
}

impl DiscoveryEvent<'_> {
    /// The stage the pipeline is in once this event has been reported.
    pub fn stage(&self) -> DiscoveryStage {
        match self {
            DiscoveryEvent::Started { .. } => DiscoveryStage::Idle,
            DiscoveryEvent::QueriesGenerated { .. } => DiscoveryStage::QueriesGenerated,
            DiscoveryEvent::UrlsDiscovered { .. } => DiscoveryStage::UrlsDiscovered,
            DiscoveryEvent::PageCrawled { .. } | DiscoveryEvent::PageFailed { .. } => {
                DiscoveryStage::Crawling
            }
            DiscoveryEvent::Aggregated { .. } => DiscoveryStage::Aggregated,
            DiscoveryEvent::Finished { .. } => DiscoveryStage::Done,
        }
    }
}

/// Receives discovery events (decoupled logging).
pub trait DiscoveryReporter: Send + Sync {
    fn report(&self, event: DiscoveryEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiscoveryReporter;

impl DiscoveryReporter for TracingDiscoveryReporter {
    fn report(&self, event: DiscoveryEvent<'_>) {
        let stage = event.stage();
        match event {
            DiscoveryEvent::Started { role, location } => {
                tracing::info!(%stage, %role, %location, "Discovery started");
            }
            DiscoveryEvent::QueriesGenerated { queries } => {
                tracing::info!(%stage, count = queries.len(), "Generated search queries");
            }
            DiscoveryEvent::UrlsDiscovered { count } => {
                tracing::info!(%stage, %count, "Found career page URLs");
            }
            DiscoveryEvent::PageCrawled { url, jobs } => {
                tracing::info!(%stage, %url, %jobs, "Extracted jobs");
            }
            DiscoveryEvent::PageFailed { url, error } => {
                tracing::warn!(%stage, %url, %error, "Page pipeline failed");
            }
            DiscoveryEvent::Aggregated {
                jobs,
                sources_crawled,
            } => {
                tracing::info!(%stage, %jobs, %sources_crawled, "Aggregated results");
            }
            DiscoveryEvent::Finished { jobs, errors } => {
                tracing::info!(%stage, %jobs, %errors, "Discovery complete");
            }
        }
    }
}

/// Result of one per-URL fetch+extract pipeline.
#[derive(Debug)]
pub enum PageOutcome {
    /// Page fetched; `jobs` may be empty.
    Crawled {
        url: String,
        jobs: Vec<DiscoveredJob>,
    },
    /// Page could not be fetched or the task died.
    Failed { url: String, error: String },
}

/// Orchestrates the full discovery pipeline:
/// queries → search → (fetch → extract) per URL → rank → truncate.
///
/// Generic over all external dependencies via traits, so the whole pipeline
/// runs in tests without real HTTP or LLM calls.
pub struct DiscoveryService<F, C, M, S>
where
    F: Fetcher,
    C: Cleaner,
    M: ChatModel,
    S: SearchEngine,
{
    synthesizer: QuerySynthesizer<M>,
    discoverer: PageDiscoverer<S>,
    pages: PageFetcher<F, C>,
    extractor: JobExtractor<M>,
    concurrency: usize,
}

impl<F, C, M, S> DiscoveryService<F, C, M, S>
where
    F: Fetcher,
    C: Cleaner,
    M: ChatModel,
    S: SearchEngine,
{
    pub fn new(fetcher: F, cleaner: C, model: M, search: S) -> Self {
        Self::with_config(fetcher, cleaner, model, search, DiscoveryConfig::default())
    }

    pub fn with_config(
        fetcher: F,
        cleaner: C,
        model: M,
        search: S,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            synthesizer: QuerySynthesizer::new(model.clone()),
            discoverer: PageDiscoverer::new(search)
                .with_query_delay(config.query_delay)
                .with_results_per_query(config.results_per_query),
            pages: PageFetcher::new(fetcher, cleaner),
            extractor: JobExtractor::new(model),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Validate the request, take a credential from `keys`, and run discovery.
    ///
    /// Fails only when the request is out of bounds or no credential exists.
    pub async fn run<K: CredentialProvider>(
        &self,
        request: &DiscoveryRequest,
        keys: &K,
    ) -> Result<DiscoveryResult, AppError> {
        request.validate()?;
        let credential = keys.acquire().ok_or(AppError::NoCredential)?;
        Ok(self.discover(request, &credential).await)
    }

    /// Run discovery under `credential`, logging progress through `tracing`.
    pub async fn discover(&self, request: &DiscoveryRequest, credential: &str) -> DiscoveryResult {
        self.discover_with_reporter(request, credential, &TracingDiscoveryReporter)
            .await
    }

    /// Run the full pipeline. Stage failures end up in `errors`, never as `Err`.
    ///
    /// 1. Synthesize search queries
    /// 2. Discover candidate career pages
    /// 3. Fetch + extract each page under the concurrency gate
    /// 4. Rank by confidence and truncate to `max_results`
    pub async fn discover_with_reporter<R: DiscoveryReporter>(
        &self,
        request: &DiscoveryRequest,
        credential: &str,
        reporter: &R,
    ) -> DiscoveryResult {
        reporter.report(DiscoveryEvent::Started {
            role: &request.role,
            location: &request.location,
        });

        // 1. Queries
        let queries = self.synthesizer.synthesize(request, credential).await;
        reporter.report(DiscoveryEvent::QueriesGenerated { queries: &queries });

        // 2. Search
        let urls = self.discoverer.discover(&queries, request.max_results).await;
        reporter.report(DiscoveryEvent::UrlsDiscovered { count: urls.len() });

        if urls.is_empty() {
            let result = DiscoveryResult {
                jobs: Vec::new(),
                search_queries_used: queries,
                sources_crawled: 0,
                errors: vec![NO_PAGES_FOUND.to_string()],
            };
            report_finished(reporter, &result);
            return result;
        }

        // 3. Crawl
        let gate = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(urls.len());
        for candidate in urls {
            let url = candidate.url;
            let task = self.spawn_page_pipeline(
                url.clone(),
                request.role.clone(),
                credential.to_string(),
                Arc::clone(&gate),
            );
            handles.push((url, task));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (url, handle) in handles {
            let outcome = handle.await.unwrap_or_else(|e| PageOutcome::Failed {
                error: format!("Task for {url} failed: {e}"),
                url,
            });
            outcomes.push(outcome);
        }

        // 4. Aggregate
        let result = aggregate(queries, outcomes, request.max_results, reporter);
        reporter.report(DiscoveryEvent::Aggregated {
            jobs: result.jobs.len(),
            sources_crawled: result.sources_crawled,
        });
        report_finished(reporter, &result);
        result
    }

    fn spawn_page_pipeline(
        &self,
        url: String,
        role: String,
        credential: String,
        gate: Arc<Semaphore>,
    ) -> tokio::task::JoinHandle<PageOutcome> {
        let pages = self.pages.clone();
        let extractor = self.extractor.clone();

        tokio::spawn(async move {
            let _permit = match gate.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return PageOutcome::Failed {
                        error: format!("Failed to crawl: {url} ({e})"),
                        url,
                    };
                }
            };

            tracing::info!(%url, "Crawling");
            match pages.fetch_page(&url).await {
                Ok(page) => {
                    let jobs = extractor
                        .extract(Some(&page.text), &url, &role, &credential)
                        .await;
                    PageOutcome::Crawled { url, jobs }
                }
                Err(e) => {
                    tracing::warn!(
                        %url,
                        error = %e,
                        kind = e.kind(),
                        retryable = e.is_retryable(),
                        "Failed to crawl"
                    );
                    PageOutcome::Failed {
                        error: format!("Failed to crawl: {url} ({e})"),
                        url,
                    }
                }
            }
        })
    }
}

fn report_finished<R: DiscoveryReporter>(reporter: &R, result: &DiscoveryResult) {
    reporter.report(DiscoveryEvent::Finished {
        jobs: result.jobs.len(),
        errors: result.errors.len(),
    });
}

/// Fold per-page outcomes into the final ranked result.
///
/// Jobs keep extraction order among equal scores (stable sort), and no
/// confidence threshold is applied.
fn aggregate<R: DiscoveryReporter>(
    queries: Vec<String>,
    outcomes: Vec<PageOutcome>,
    max_results: usize,
    reporter: &R,
) -> DiscoveryResult {
    let mut jobs = Vec::new();
    let mut errors = Vec::new();
    let mut sources_crawled = 0;

    for outcome in outcomes {
        match outcome {
            PageOutcome::Crawled { url, jobs: found } => {
                sources_crawled += 1;
                reporter.report(DiscoveryEvent::PageCrawled {
                    url: &url,
                    jobs: found.len(),
                });
                jobs.extend(found);
            }
            PageOutcome::Failed { url, error } => {
                reporter.report(DiscoveryEvent::PageFailed {
                    url: &url,
                    error: &error,
                });
                errors.push(error);
            }
        }
    }

    jobs.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
    jobs.truncate(max_results);

    DiscoveryResult {
        jobs,
        search_queries_used: queries,
        sources_crawled,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    fn fast_config() -> DiscoveryConfig {
        DiscoveryConfig {
            query_delay: Duration::ZERO,
            ..DiscoveryConfig::default()
        }
    }

    fn career_urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://company{i}.com/careers")).collect()
    }

    #[tokio::test]
    async fn happy_path_ranks_and_truncates() {
        let urls = career_urls(3);
        let search = MockSearchEngine::new(vec![Ok(hits_from(&urls))]);
        let model = ScriptedChatModel::new()
            .with_queries(&["backend careers remote"])
            .with_page_jobs(&urls[0], &[("A", 0.2), ("B", 0.9)])
            .with_page_jobs(&urls[1], &[("C", 0.5)])
            .with_page_jobs(&urls[2], &[("D", 0.7), ("E", 0.9)]);

        let svc = DiscoveryService::with_config(
            MockFetcher::echo_url(),
            MockCleaner::passthrough(),
            model,
            search,
            fast_config(),
        );
        let request = DiscoveryRequest::new("Backend Engineer").with_max_results(4);

        let result = svc.discover(&request, "key").await;

        let titles: Vec<_> = result.jobs.iter().map(|j| j.title.as_str()).collect();
        // Stable: B (page 0) before E (page 2) at equal score.
        assert_eq!(titles, vec!["B", "E", "D", "C"]);
        assert_eq!(result.sources_crawled, 3);
        assert!(result.errors.is_empty());
        assert_eq!(result.search_queries_used, vec!["backend careers remote"]);
        assert!(
            result
                .jobs
                .windows(2)
                .all(|w| w[0].confidence_score >= w[1].confidence_score)
        );
    }

    #[tokio::test]
    async fn no_urls_is_a_terminal_result_with_error() {
        let search = MockSearchEngine::new(vec![Ok(hits(&["https://www.indeed.com/jobs"]))]);
        let fetcher = MockFetcher::echo_url();
        let svc = DiscoveryService::with_config(
            fetcher.clone(),
            MockCleaner::passthrough(),
            ScriptedChatModel::new().with_queries(&["q"]),
            search,
            fast_config(),
        );

        let result = svc.discover(&DiscoveryRequest::new("SRE"), "key").await;

        assert!(result.jobs.is_empty());
        assert_eq!(result.sources_crawled, 0);
        assert_eq!(result.errors, vec![NO_PAGES_FOUND.to_string()]);
        assert_eq!(result.search_queries_used, vec!["q"]);
        assert!(fetcher.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_url_does_not_block_others() {
        let urls = career_urls(3);
        let search = MockSearchEngine::new(vec![Ok(hits_from(&urls))]);
        let model = ScriptedChatModel::new()
            .with_queries(&["q"])
            .with_page_jobs(&urls[0], &[("A", 0.6)])
            .with_page_jobs(&urls[2], &[("C", 0.8)]);
        let fetcher = MockFetcher::echo_url().failing_on(&urls[1]);

        let svc = DiscoveryService::with_config(
            fetcher,
            MockCleaner::passthrough(),
            model,
            search,
            fast_config(),
        );
        let result = svc.discover(&DiscoveryRequest::new("SRE"), "key").await;

        let titles: Vec<_> = result.jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A"]);
        assert_eq!(result.sources_crawled, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains(&urls[1]));
    }

    #[tokio::test]
    async fn panicking_task_is_recorded_not_propagated() {
        let urls = career_urls(2);
        let search = MockSearchEngine::new(vec![Ok(hits_from(&urls))]);
        let model = ScriptedChatModel::new()
            .with_queries(&["q"])
            .with_page_jobs(&urls[0], &[("A", 0.6)]);
        let fetcher = MockFetcher::echo_url().panicking_on(&urls[1]);

        let svc = DiscoveryService::with_config(
            fetcher,
            MockCleaner::passthrough(),
            model,
            search,
            fast_config(),
        );
        let result = svc.discover(&DiscoveryRequest::new("SRE"), "key").await;

        assert_eq!(result.jobs.len(), 1);
        assert_eq!(result.sources_crawled, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains(&urls[1]));
    }

    #[tokio::test]
    async fn page_without_jobs_still_counts_as_crawled() {
        let urls = career_urls(1);
        let search = MockSearchEngine::new(vec![Ok(hits_from(&urls))]);
        let svc = DiscoveryService::with_config(
            MockFetcher::echo_url(),
            MockCleaner::passthrough(),
            ScriptedChatModel::new().with_queries(&["q"]),
            search,
            fast_config(),
        );

        let result = svc.discover(&DiscoveryRequest::new("SRE"), "key").await;

        assert!(result.jobs.is_empty());
        assert_eq!(result.sources_crawled, 1);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_gate() {
        let urls = career_urls(20);
        let search = MockSearchEngine::new(vec![Ok(hits_from(&urls))]);
        let fetcher = ConcurrencyTrackingFetcher::new(Duration::from_millis(20));

        let svc = DiscoveryService::with_config(
            fetcher.clone(),
            MockCleaner::passthrough(),
            ScriptedChatModel::new().with_queries(&["q"]),
            search,
            fast_config(),
        );
        let result = svc
            .discover(&DiscoveryRequest::new("SRE").with_max_results(20), "key")
            .await;

        assert_eq!(result.sources_crawled, 20);
        assert_eq!(fetcher.total(), 20);
        assert!(fetcher.max_in_flight() <= 5, "saw {}", fetcher.max_in_flight());
        assert!(fetcher.max_in_flight() >= 2, "pipelines should overlap");
    }

    #[tokio::test]
    async fn result_never_exceeds_max_results() {
        let urls = career_urls(2);
        let search = MockSearchEngine::new(vec![Ok(hits_from(&urls))]);
        let model = ScriptedChatModel::new()
            .with_queries(&["q"])
            .with_page_jobs(&urls[0], &[("A", 0.1), ("B", 0.2), ("C", 0.3)])
            .with_page_jobs(&urls[1], &[("D", 0.4), ("E", 0.5)]);

        let svc = DiscoveryService::with_config(
            MockFetcher::echo_url(),
            MockCleaner::passthrough(),
            model,
            search,
            fast_config(),
        );
        let result = svc
            .discover(&DiscoveryRequest::new("SRE").with_max_results(2), "key")
            .await;

        assert_eq!(result.jobs.len(), 2);
        assert_eq!(result.jobs[0].title, "E");
        assert!(
            result
                .jobs
                .iter()
                .all(|j| (0.0..=1.0).contains(&j.confidence_score))
        );
    }

    #[tokio::test]
    async fn run_without_credential_is_precondition_failure() {
        let svc = DiscoveryService::with_config(
            MockFetcher::echo_url(),
            MockCleaner::passthrough(),
            ScriptedChatModel::new(),
            MockSearchEngine::new(vec![]),
            fast_config(),
        );
        let keys = crate::traits::StaticCredential(String::new());

        let err = svc
            .run(&DiscoveryRequest::new("SRE"), &keys)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoCredential));
    }

    #[tokio::test]
    async fn run_rejects_out_of_bounds_request() {
        let svc = DiscoveryService::with_config(
            MockFetcher::echo_url(),
            MockCleaner::passthrough(),
            ScriptedChatModel::new(),
            MockSearchEngine::new(vec![]),
            fast_config(),
        );
        let keys = crate::traits::StaticCredential("k".into());

        let err = svc
            .run(&DiscoveryRequest::new("SRE").with_max_results(50), &keys)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn reporter_sees_every_stage() {
        let urls = career_urls(2);
        let search = MockSearchEngine::new(vec![Ok(hits_from(&urls))]);
        let svc = DiscoveryService::with_config(
            MockFetcher::echo_url().failing_on(&urls[0]),
            MockCleaner::passthrough(),
            ScriptedChatModel::new().with_queries(&["q"]),
            search,
            fast_config(),
        );
        let reporter = MockReporter::new();

        svc.discover_with_reporter(&DiscoveryRequest::new("SRE"), "key", &reporter)
            .await;

        let events = reporter.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "Started",
                "QueriesGenerated",
                "UrlsDiscovered",
                "PageFailed",
                "PageCrawled",
                "Aggregated",
                "Finished"
            ]
        );
    }

    #[tokio::test]
    async fn empty_discovery_goes_straight_to_done() {
        let svc = DiscoveryService::with_config(
            MockFetcher::echo_url(),
            MockCleaner::passthrough(),
            ScriptedChatModel::new().with_queries(&["q"]),
            MockSearchEngine::new(vec![]),
            fast_config(),
        );
        let reporter = MockReporter::new();

        svc.discover_with_reporter(&DiscoveryRequest::new("SRE"), "key", &reporter)
            .await;

        let events = reporter.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["Started", "QueriesGenerated", "UrlsDiscovered", "Finished"]
        );
    }

    #[test]
    fn events_map_to_stages() {
        assert_eq!(
            DiscoveryEvent::UrlsDiscovered { count: 0 }.stage(),
            DiscoveryStage::UrlsDiscovered
        );
        assert_eq!(
            DiscoveryEvent::PageFailed { url: "u", error: "e" }.stage(),
            DiscoveryStage::Crawling
        );
        assert_eq!(
            DiscoveryEvent::Finished { jobs: 0, errors: 1 }.stage(),
            DiscoveryStage::Done
        );
        assert_eq!(DiscoveryStage::UrlsDiscovered.to_string(), "urls_discovered");
    }
}
