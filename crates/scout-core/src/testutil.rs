//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::discovery::{DiscoveryEvent, DiscoveryReporter};
use crate::error::AppError;
use crate::models::SearchHit;
use crate::traits::{ChatModel, ChatRequest, Cleaner, Fetcher, SearchEngine};

/// HTML long enough to clear the extractor's minimum-length check.
pub fn page_html(url: &str) -> String {
    format!(
        "<html><body><h1>Careers</h1><p>Open roles listed at {url}.</p><p>{}</p></body></html>",
        "We are hiring engineers across every team. ".repeat(4)
    )
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    /// Answer every URL with [`page_html`] instead of the queue.
    echo: bool,
    failing: Vec<String>,
    panicking: Vec<String>,
    pub fetched: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    fn build(responses: Vec<Result<String, AppError>>, echo: bool) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            echo,
            failing: Vec::new(),
            panicking: Vec::new(),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn new(html: &str) -> Self {
        Self::build(vec![Ok(html.to_string())], false)
    }

    pub fn with_error(error: AppError) -> Self {
        Self::build(vec![Err(error)], false)
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self::build(responses, false)
    }

    /// Fetcher that serves a realistic page for any URL.
    pub fn echo_url() -> Self {
        Self::build(Vec::new(), true)
    }

    /// Return an HTTP error for `url`.
    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    /// Panic when asked for `url`, simulating a crashed task.
    pub fn panicking_on(mut self, url: &str) -> Self {
        self.panicking.push(url.to_string());
        self
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.fetched.lock().unwrap().push(url.to_string());

        if self.panicking.iter().any(|u| u == url) {
            panic!("mock fetcher panicked on {url}");
        }
        if self.failing.iter().any(|u| u == url) {
            return Err(AppError::HttpError(format!("HTTP 503 for {url}")));
        }
        if self.echo {
            return Ok(page_html(url));
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// ConcurrencyTrackingFetcher
// ---------------------------------------------------------------------------

/// Fetcher that records how many fetches are in flight at once.
#[derive(Clone)]
pub struct ConcurrencyTrackingFetcher {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl ConcurrencyTrackingFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Fetcher for ConcurrencyTrackingFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(page_html(url))
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

/// Mock cleaner that applies a simple transformation.
#[derive(Clone)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCleaner {
    /// Creates a cleaner that returns the input unchanged.
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a cleaner that returns an error.
    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let mut err = self.error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockChatModel
// ---------------------------------------------------------------------------

/// Recorded chat call: (request, credential).
pub type ChatCall = (ChatRequest, String);

/// Mock chat model that returns queued replies and records every call.
#[derive(Clone)]
pub struct MockChatModel {
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub calls: Arc<Mutex<Vec<ChatCall>>>,
}

impl MockChatModel {
    pub fn new(reply: &str) -> Self {
        Self::with_responses(vec![Ok(reply.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ChatModel for MockChatModel {
    async fn complete(&self, request: &ChatRequest, credential: &str) -> Result<String, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.clone(), credential.to_string()));

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("[]".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedChatModel
// ---------------------------------------------------------------------------

/// Chat model that answers by prompt content: query-synthesis prompts get
/// the scripted queries, extraction prompts get the jobs scripted for the
/// page's source URL.
#[derive(Clone, Default)]
pub struct ScriptedChatModel {
    queries: Option<Vec<String>>,
    pages: Vec<(String, Vec<(String, f64)>)>,
}

impl ScriptedChatModel {
    /// Without queries, query synthesis fails and falls back.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queries(mut self, queries: &[&str]) -> Self {
        self.queries = Some(queries.iter().map(|q| q.to_string()).collect());
        self
    }

    /// Jobs returned for the page at `url`, as (title, confidence) pairs.
    pub fn with_page_jobs(mut self, url: &str, jobs: &[(&str, f64)]) -> Self {
        self.pages.push((
            url.to_string(),
            jobs.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
        ));
        self
    }
}

impl ChatModel for ScriptedChatModel {
    async fn complete(&self, request: &ChatRequest, _credential: &str) -> Result<String, AppError> {
        if request.user.starts_with("Generate search queries") {
            return match &self.queries {
                Some(queries) => Ok(serde_json::to_string(queries)?),
                None => Err(AppError::LlmError {
                    message: "scripted failure".into(),
                    status_code: 500,
                    retryable: true,
                }),
            };
        }

        let jobs = self
            .pages
            .iter()
            .find(|(url, _)| request.user.contains(&format!("Source URL: {url}\n")))
            .map(|(_, jobs)| {
                jobs.iter()
                    .map(|(title, score)| {
                        serde_json::json!({
                            "title": title,
                            "company": "Acme",
                            "description": format!("{title} role"),
                            "confidence_score": score,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(serde_json::Value::Array(jobs).to_string())
    }
}

// ---------------------------------------------------------------------------
// MockSearchEngine
// ---------------------------------------------------------------------------

/// Recorded search: (query, max_results).
pub type SearchCall = (String, usize);

/// Mock search engine returning one queued result per query.
#[derive(Clone)]
pub struct MockSearchEngine {
    responses: Arc<Mutex<Vec<Result<Vec<SearchHit>, AppError>>>>,
    pub queries: Arc<Mutex<Vec<SearchCall>>>,
}

impl MockSearchEngine {
    pub fn new(responses: Vec<Result<Vec<SearchHit>, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SearchEngine for MockSearchEngine {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, AppError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Vec::new())
        } else {
            responses.remove(0)
        }
    }
}

/// Build search hits for the given URLs.
pub fn hits(urls: &[&str]) -> Vec<SearchHit> {
    urls.iter()
        .map(|url| SearchHit {
            title: format!("Careers - {url}"),
            url: url.to_string(),
            snippet: String::new(),
        })
        .collect()
}

pub fn hits_from(urls: &[String]) -> Vec<SearchHit> {
    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    hits(&refs)
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock discovery reporter that records event names.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiscoveryReporter for MockReporter {
    fn report(&self, event: DiscoveryEvent<'_>) {
        let label = match &event {
            DiscoveryEvent::Started { .. } => "Started",
            DiscoveryEvent::QueriesGenerated { .. } => "QueriesGenerated",
            DiscoveryEvent::UrlsDiscovered { .. } => "UrlsDiscovered",
            DiscoveryEvent::PageCrawled { .. } => "PageCrawled",
            DiscoveryEvent::PageFailed { .. } => "PageFailed",
            DiscoveryEvent::Aggregated { .. } => "Aggregated",
            DiscoveryEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
