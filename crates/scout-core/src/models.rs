use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Hard upper bound on `max_results` for a single discovery request.
pub const MAX_RESULTS_CAP: usize = 20;

/// Maximum number of characters of cleaned page text kept per page.
pub const PAGE_TEXT_BUDGET: usize = 15_000;

/// Maximum number of requirement bullets retained per job.
pub const MAX_REQUIREMENTS: usize = 5;

fn default_experience_years() -> u32 {
    2
}

fn default_location() -> String {
    "Remote".to_string()
}

fn default_max_results() -> usize {
    MAX_RESULTS_CAP
}

fn default_true() -> bool {
    true
}

/// A candidate profile describing which jobs to look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// Target role, e.g. "Full Stack Developer".
    pub role: String,
    #[serde(default = "default_experience_years")]
    pub experience_years: u32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_true")]
    pub include_startups: bool,
    #[serde(default = "default_true")]
    pub include_enterprise: bool,
    #[serde(default)]
    pub custom_search_terms: Vec<String>,
}

impl DiscoveryRequest {
    /// Create a request for `role` with all other fields at their defaults.
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            experience_years: default_experience_years(),
            skills: Vec::new(),
            location: default_location(),
            max_results: default_max_results(),
            include_startups: true,
            include_enterprise: true,
            custom_search_terms: Vec::new(),
        }
    }

    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_custom_search_terms(mut self, terms: Vec<String>) -> Self {
        self.custom_search_terms = terms;
        self
    }

    /// Boundary check: non-empty role and `1 <= max_results <= 20`.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.role.trim().is_empty() {
            return Err(AppError::InvalidRequest("role must not be empty".into()));
        }
        if self.max_results == 0 || self.max_results > MAX_RESULTS_CAP {
            return Err(AppError::InvalidRequest(format!(
                "max_results must be between 1 and {MAX_RESULTS_CAP}, got {}",
                self.max_results
            )));
        }
        Ok(())
    }
}

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A URL accepted by the career-page filter, with its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub url: String,
    pub domain: Option<String>,
}

impl CandidateUrl {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let domain = crate::url_filter::domain_of(&url);
        Self { url, domain }
    }
}

/// Cleaned, budget-truncated text of one crawled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub text: String,
}

impl PageContent {
    /// Build page content, truncating `text` to [`PAGE_TEXT_BUDGET`] characters.
    pub fn new(url: impl Into<String>, text: &str) -> Self {
        Self {
            url: url.into(),
            text: truncate_chars(text, PAGE_TEXT_BUDGET).to_string(),
        }
    }
}

/// Return the prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// A structured job posting extracted from a career page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredJob {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub description: String,
    pub apply_url: String,
    pub source_url: String,
    pub salary_range: Option<String>,
    pub job_type: Option<String>,
    pub posted_date: Option<String>,
    pub requirements: Vec<String>,
    pub confidence_score: f64,
}

/// Job record as emitted by the model, before validation.
#[derive(Debug, Deserialize)]
struct RawJob {
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    description: Option<String>,
    apply_url: Option<String>,
    salary_range: Option<String>,
    job_type: Option<String>,
    posted_date: Option<String>,
    requirements: Option<Vec<String>>,
    confidence_score: Option<f64>,
}

impl DiscoveredJob {
    /// Validate one model-produced JSON object into a job.
    ///
    /// `source_url` always overrides whatever the model claimed, and a missing
    /// or blank `apply_url` falls back to it. Scores outside `[0, 1]` are
    /// rejected rather than clamped.
    pub fn from_model_value(value: serde_json::Value, source_url: &str) -> Result<Self, AppError> {
        let raw: RawJob = serde_json::from_value(value)
            .map_err(|e| AppError::JobValidation(e.to_string()))?;

        let title = required(raw.title, "title")?;
        let company = required(raw.company, "company")?;
        let description = raw
            .description
            .ok_or_else(|| AppError::JobValidation("missing field `description`".into()))?;

        let confidence_score = raw.confidence_score.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&confidence_score) {
            return Err(AppError::JobValidation(format!(
                "confidence_score {confidence_score} is outside [0, 1]"
            )));
        }

        let apply_url = raw
            .apply_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| source_url.to_string());

        let mut requirements = raw.requirements.unwrap_or_default();
        requirements.truncate(MAX_REQUIREMENTS);

        Ok(Self {
            title,
            company,
            location: raw.location,
            description,
            apply_url,
            source_url: source_url.to_string(),
            salary_range: raw.salary_range,
            job_type: raw.job_type,
            posted_date: raw.posted_date,
            requirements,
            confidence_score,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(AppError::JobValidation(format!("field `{field}` is blank"))),
        None => Err(AppError::JobValidation(format!("missing field `{field}`"))),
    }
}

/// Final output of one discovery run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryResult {
    pub jobs: Vec<DiscoveredJob>,
    pub search_queries_used: Vec<String>,
    pub sources_crawled: usize,
    pub errors: Vec<String>,
}

impl DiscoveryResult {
    pub fn count(&self) -> usize {
        self.jobs.len()
    }
}
