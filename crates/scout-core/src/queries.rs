//! Search query synthesis.
//!
//! Asks the model for a handful of career-page-oriented queries and falls
//! back to a fixed template whenever that fails, so discovery always has
//! something to search for.

use crate::error::AppError;
use crate::models::DiscoveryRequest;
use crate::traits::{ChatModel, ChatRequest};
use crate::util::strip_code_fences;

/// Upper bound on the number of queries handed to the discoverer.
pub const MAX_QUERIES: usize = 10;

const SYSTEM_PROMPT: &str = "You are a search query optimizer. Generate effective search queries to find company career pages for job seekers.\nReturn ONLY a JSON array of 5-8 search query strings. No explanation.";

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 500;

/// Turns a candidate profile into search-engine queries.
#[derive(Clone)]
pub struct QuerySynthesizer<M: ChatModel> {
    model: M,
}

impl<M: ChatModel> QuerySynthesizer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Produce at most [`MAX_QUERIES`] queries. Never empty for a non-empty role.
    pub async fn synthesize(&self, request: &DiscoveryRequest, credential: &str) -> Vec<String> {
        match self.generate(request, credential).await {
            Ok(mut queries) => {
                queries.extend(request.custom_search_terms.iter().cloned());
                queries.truncate(MAX_QUERIES);
                queries
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Query generation failed, using fallback queries");
                fallback_queries(request)
            }
        }
    }

    async fn generate(
        &self,
        request: &DiscoveryRequest,
        credential: &str,
    ) -> Result<Vec<String>, AppError> {
        let chat = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: user_prompt(request),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let text = self.model.complete(&chat, credential).await?;
        parse_query_list(&text)
    }
}

fn user_prompt(request: &DiscoveryRequest) -> String {
    let skills = request
        .skills
        .iter()
        .take(5)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Generate search queries to find career pages for:\n\
         - Role: {role}\n\
         - Skills: {skills}\n\
         - Location: {location}\n\
         - Experience: {years} years\n\
         - Include startups: {startups}\n\
         - Include enterprise: {enterprise}\n\n\
         Focus on finding direct company career pages, not job aggregators.\n\
         Include queries like:\n\
         - \"[role] careers [location]\"\n\
         - \"[skill] company hiring\"\n\
         - \"startup hiring [role]\"\n\
         - Site-specific: \"site:greenhouse.io [role]\"\n\n\
         Return JSON array of strings only.",
        role = request.role,
        location = request.location,
        years = request.experience_years,
        startups = request.include_startups,
        enterprise = request.include_enterprise,
    )
}

/// Parse the model's reply into a list of non-blank query strings.
fn parse_query_list(text: &str) -> Result<Vec<String>, AppError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(text))?;
    let items = value
        .as_array()
        .ok_or_else(|| AppError::InvalidResponse("expected a JSON array of queries".into()))?;

    let queries: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect();

    if queries.is_empty() {
        return Err(AppError::InvalidResponse("model returned no queries".into()));
    }
    Ok(queries)
}

/// Deterministic queries used when the model is unavailable.
pub fn fallback_queries(request: &DiscoveryRequest) -> Vec<String> {
    let role = &request.role;
    let location = &request.location;

    let mut queries = vec![
        format!("{role} careers {location}"),
        format!("{role} jobs company hiring"),
        format!("site:greenhouse.io {role}"),
        format!("site:lever.co {role}"),
    ];
    if let Some(skill) = request.skills.first() {
        queries.push(format!("{skill} developer jobs {location}"));
    }
    queries.extend(request.custom_search_terms.iter().cloned());
    queries.truncate(MAX_QUERIES);
    queries
}
