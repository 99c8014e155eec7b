use thiserror::Error;

/// Application-wide error types for Scout.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError {
        message: String,
        status_code: u16,
        retryable: bool,
    },

    /// Web search provider failed or returned an unusable page.
    #[error("Search error: {0}")]
    SearchError(String),

    /// HTML-to-text conversion failed.
    #[error("Cleaner error: {0}")]
    CleanerError(String),

    /// Upstream returned a payload of the wrong shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A single extracted job record failed field validation.
    #[error("Invalid job record: {0}")]
    JobValidation(String),

    /// Request parameters are outside the accepted range.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// No API credential is available to run the pipeline.
    #[error("No API keys available. Please try again later.")]
    NoCredential,

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded => true,
            AppError::LlmError { retryable, .. } => *retryable,
            AppError::HttpError(msg) | AppError::SearchError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }

    /// Stable, low-cardinality label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::LlmError { .. }
            | AppError::SearchError(_)
            | AppError::RateLimitExceeded => "upstream_unavailable",
            AppError::InvalidResponse(_)
            | AppError::JobValidation(_)
            | AppError::SerializationError(_) => "malformed_response",
            AppError::HttpError(_)
            | AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::CleanerError(_) => "unreachable_page",
            AppError::NoCredential => "no_credential",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::ConfigError(_) => "config",
            AppError::Generic(_) => "generic",
        }
    }
}
