use std::future::Future;

use crate::error::AppError;
use crate::models::SearchHit;

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Converts raw HTML into visible, line-joined text.
pub trait Cleaner: Send + Sync + Clone + 'static {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}

/// A single chat-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Language-model chat completion.
///
/// The credential is passed per call so one client can serve requests
/// running under different API keys.
pub trait ChatModel: Send + Sync + Clone + 'static {
    /// Returns the generated text, or an [`AppError::LlmError`] carrying the
    /// upstream status code on a non-success response.
    fn complete(
        &self,
        request: &ChatRequest,
        credential: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Web search provider.
pub trait SearchEngine: Send + Sync + Clone + 'static {
    /// Returns at most `max_results` hits for `query`.
    fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<SearchHit>, AppError>> + Send;
}

/// Source of API credentials, owned outside the discovery pipeline.
pub trait CredentialProvider: Send + Sync {
    fn acquire(&self) -> Option<String>;

    /// Put a credential into cooldown after it failed upstream.
    fn report_failure(&self, credential: &str);
}

/// A provider holding exactly one fixed credential. Useful for the CLI.
#[derive(Debug, Clone)]
pub struct StaticCredential(pub String);

impl CredentialProvider for StaticCredential {
    fn acquire(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }

    fn report_failure(&self, _credential: &str) {}
}
