use std::time::Duration;

use reqwest::Client;
use scout_core::error::AppError;
use scout_core::traits::{ChatModel, ChatRequest};
use serde::{Deserialize, Serialize};

use crate::fetcher::transport_error;

const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI-compatible chat-completions client.
///
/// Works against any OpenAI-compatible base URL. The API key is not stored
/// on the client; each call receives the credential currently handed out by
/// the key pool.
#[derive(Clone)]
pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiChatModel {
    pub fn with_base_url(model: &str, base_url: &str) -> Result<Self, AppError> {
        Self::build(model, base_url, DEFAULT_LLM_TIMEOUT)
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        Self::build(&self.model, &self.base_url, timeout)
    }

    fn build(model: &str, base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: &ChatRequest, credential: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            if status_code == 429 {
                return Err(AppError::RateLimitExceeded);
            }

            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status_code, &body));
        }

        let raw = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read LLM response: {e}")))?;

        first_choice_content(&raw)
    }
}

fn api_error(status_code: u16, body: &str) -> AppError {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));

    AppError::LlmError {
        message,
        status_code,
        retryable: status_code >= 500,
    }
}

/// Pull the assistant text out of a chat-completions response body.
fn first_choice_content(raw: &str) -> Result<String, AppError> {
    let parsed: CompletionResponse = serde_json::from_str(raw)
        .map_err(|e| AppError::InvalidResponse(format!("Failed to parse LLM response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::LlmError {
            message: "Empty response from LLM".into(),
            status_code: 200,
            retryable: false,
        })
}
