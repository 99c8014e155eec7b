use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scout API",
        version = "0.1.0",
        description = "LLM-driven discovery of job postings on company career pages."
    ),
    paths(crate::routes::discover_jobs, crate::routes::health),
    components(schemas(
        crate::dto::DiscoverJobsRequest,
        crate::dto::DiscoverJobsResponse,
        crate::dto::DiscoveredJobResponse,
        crate::dto::HealthResponse,
        crate::dto::KeyPoolStatusResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "discovery", description = "Job discovery"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
