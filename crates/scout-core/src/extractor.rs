//! Job extraction from crawled page text.

use crate::error::AppError;
use crate::models::{DiscoveredJob, truncate_chars};
use crate::traits::{ChatModel, ChatRequest};
use crate::util::strip_code_fences;

/// Pages shorter than this are not worth a model call.
pub const MIN_PAGE_CHARS: usize = 100;

/// Characters of page text included in the extraction prompt.
const PROMPT_TEXT_CHARS: usize = 12_000;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;

const SYSTEM_PROMPT: &str = r#"You are a job data extractor. Extract job listings from webpage content.
Return ONLY valid JSON array. Each job object must have these fields:
- title: job title (string)
- company: company name (string)
- location: job location or "Remote" (string or null)
- description: brief job description (string, max 500 chars)
- apply_url: application URL if found, otherwise use source_url (string)
- salary_range: salary if mentioned (string or null)
- job_type: full-time/part-time/contract (string or null)
- posted_date: posting date if shown (string or null)
- requirements: list of key requirements (array of strings, max 5)
- confidence_score: how confident you are this is a real job 0.0-1.0 (number)

Return empty array [] if no relevant jobs found. No explanations."#;

/// Extracts structured job postings from page text with a language model.
#[derive(Clone)]
pub struct JobExtractor<M: ChatModel> {
    model: M,
}

impl<M: ChatModel> JobExtractor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Extract jobs relevant to `role` from `page_text`.
    ///
    /// Model failures and unparseable replies yield an empty list; individual
    /// malformed records are dropped.
    pub async fn extract(
        &self,
        page_text: Option<&str>,
        source_url: &str,
        role: &str,
        credential: &str,
    ) -> Vec<DiscoveredJob> {
        let Some(text) = page_text.filter(|t| t.chars().count() >= MIN_PAGE_CHARS) else {
            tracing::debug!(%source_url, "Page text too short, skipping extraction");
            return Vec::new();
        };

        let chat = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Extract job listings relevant to \"{role}\" from this career page content.\n\
                 Source URL: {source_url}\n\n\
                 Page Content:\n{}\n\n\
                 Return JSON array of jobs:",
                truncate_chars(text, PROMPT_TEXT_CHARS)
            ),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let reply = match self.model.complete(&chat, credential).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    %source_url,
                    error = %e,
                    retryable = e.is_retryable(),
                    "LLM extraction failed"
                );
                return Vec::new();
            }
        };

        match parse_jobs(&reply, source_url) {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(%source_url, error = %e, "Could not parse extraction reply");
                Vec::new()
            }
        }
    }
}

/// Parse a model reply into validated jobs, dropping records that fail validation.
pub fn parse_jobs(reply: &str, source_url: &str) -> Result<Vec<DiscoveredJob>, AppError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(reply))?;
    let serde_json::Value::Array(items) = value else {
        return Err(AppError::InvalidResponse(
            "expected a JSON array of jobs".into(),
        ));
    };

    let jobs = items
        .into_iter()
        .filter_map(|item| match DiscoveredJob::from_model_value(item, source_url) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::warn!(%source_url, error = %e, "Dropping malformed job record");
                None
            }
        })
        .collect();

    Ok(jobs)
}
