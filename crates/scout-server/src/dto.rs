use serde::{Deserialize, Serialize};

use scout_core::models::{DiscoveredJob, DiscoveryRequest, DiscoveryResult};
use scout_core::KeyPoolStatus;

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn default_experience_years() -> u32 {
    2
}

fn default_location() -> String {
    "Remote".to_string()
}

fn default_max_results() -> usize {
    20
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DiscoverJobsRequest {
    /// Target role, e.g. "Full Stack Developer".
    pub role: String,
    #[serde(default = "default_experience_years")]
    #[schema(default = 2)]
    pub experience_years: u32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_location")]
    #[schema(default = "Remote")]
    pub location: String,
    /// Between 1 and 20.
    #[serde(default = "default_max_results")]
    #[schema(default = 20, minimum = 1, maximum = 20)]
    pub max_results: usize,
    #[serde(default = "default_true")]
    pub include_startups: bool,
    #[serde(default = "default_true")]
    pub include_enterprise: bool,
    /// Extra queries appended verbatim to the generated ones.
    #[serde(default)]
    pub custom_search_terms: Vec<String>,
}

impl From<DiscoverJobsRequest> for DiscoveryRequest {
    fn from(body: DiscoverJobsRequest) -> Self {
        let mut request = DiscoveryRequest::new(body.role)
            .with_skills(body.skills)
            .with_location(body.location)
            .with_max_results(body.max_results)
            .with_custom_search_terms(body.custom_search_terms);
        request.experience_years = body.experience_years;
        request.include_startups = body.include_startups;
        request.include_enterprise = body.include_enterprise;
        request
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DiscoveredJobResponse {
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
    /// Model confidence in [0, 1].
    pub confidence_score: f64,
}

impl From<DiscoveredJob> for DiscoveredJobResponse {
    fn from(job: DiscoveredJob) -> Self {
        Self {
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            apply_url: job.apply_url,
            source_url: job.source_url,
            salary_range: job.salary_range,
            job_type: job.job_type,
            posted_date: job.posted_date,
            requirements: job.requirements,
            confidence_score: job.confidence_score,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DiscoverJobsResponse {
    /// Ranked by confidence, highest first.
    pub jobs: Vec<DiscoveredJobResponse>,
    pub count: usize,
    pub search_queries_used: Vec<String>,
    pub sources_crawled: usize,
    pub errors: Vec<String>,
}

impl From<DiscoveryResult> for DiscoverJobsResponse {
    fn from(result: DiscoveryResult) -> Self {
        Self {
            count: result.count(),
            jobs: result.jobs.into_iter().map(DiscoveredJobResponse::from).collect(),
            search_queries_used: result.search_queries_used,
            sources_crawled: result.sources_crawled,
            errors: result.errors,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct KeyPoolStatusResponse {
    pub total_keys: usize,
    pub current_key_index: usize,
    pub failed_keys_count: usize,
    pub cooldown_minutes: u64,
    pub has_available_keys: bool,
}

impl From<KeyPoolStatus> for KeyPoolStatusResponse {
    fn from(status: KeyPoolStatus) -> Self {
        Self {
            total_keys: status.total_keys,
            current_key_index: status.current_key_index,
            failed_keys_count: status.failed_keys_count,
            cooldown_minutes: status.cooldown_minutes,
            has_available_keys: status.has_available_keys,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub key_pool: KeyPoolStatusResponse,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
