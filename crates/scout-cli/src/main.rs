use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scout_client::{DuckDuckGoSearch, OpenAiChatModel, ReqwestFetcher, TextCleaner};
use scout_core::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use scout_core::url_filter::is_career_url;
use scout_core::{DiscoveryConfig, DiscoveryRequest, DiscoveryService, KeyPool};

#[derive(Parser)]
#[command(name = "scout", version, about = "LLM-driven job discovery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the web for career pages and extract matching job postings
    Discover {
        /// Target role (e.g. "Backend Engineer")
        #[arg(short, long)]
        role: String,

        /// Comma-separated skills
        #[arg(short, long, value_delimiter = ',')]
        skills: Vec<String>,

        /// Preferred location
        #[arg(short, long, default_value = "Remote")]
        location: String,

        /// Years of experience
        #[arg(long, default_value_t = 2)]
        experience_years: u32,

        /// Maximum number of jobs to return (1-20)
        #[arg(short = 'n', long, default_value_t = 20)]
        max_results: usize,

        /// Extra search query, appended verbatim (repeatable)
        #[arg(short = 't', long = "term")]
        custom_search_terms: Vec<String>,

        /// Exclude startups from the candidate profile
        #[arg(long, default_value_t = false)]
        no_startups: bool,

        /// Exclude large enterprises from the candidate profile
        #[arg(long, default_value_t = false)]
        no_enterprise: bool,

        /// LLM model to use
        #[arg(short, long, env = "SCOUT_MODEL", default_value = DEFAULT_MODEL)]
        model: String,

        /// OpenAI-compatible API base URL
        #[arg(short, long, env = "SCOUT_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Comma-separated API keys (reads from GROQ_API_KEYS if not provided)
        #[arg(short, long, env = "GROQ_API_KEYS", hide_env_values = true)]
        api_keys: String,

        /// LLM request timeout in seconds
        #[arg(long, env = "SCOUT_LLM_TIMEOUT_SECS", default_value_t = 60)]
        llm_timeout_secs: u64,

        /// Maximum number of pages crawled concurrently
        #[arg(long, default_value_t = 5)]
        concurrency: usize,

        /// Allow fetching pages on private/reserved IPs
        #[arg(long, default_value_t = false)]
        allow_private_urls: bool,
    },

    /// Report whether URLs look like company career pages
    Classify {
        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Discover {
            role,
            skills,
            location,
            experience_years,
            max_results,
            custom_search_terms,
            no_startups,
            no_enterprise,
            model,
            base_url,
            api_keys,
            llm_timeout_secs,
            concurrency,
            allow_private_urls,
        } => {
            let mut request = DiscoveryRequest::new(role)
                .with_skills(trim_all(skills))
                .with_location(location)
                .with_max_results(max_results)
                .with_custom_search_terms(trim_all(custom_search_terms));
            request.experience_years = experience_years;
            request.include_startups = !no_startups;
            request.include_enterprise = !no_enterprise;

            let options = RunOptions {
                model,
                base_url,
                api_keys,
                llm_timeout: Duration::from_secs(llm_timeout_secs),
                concurrency,
                allow_private_urls,
            };
            cmd_discover(&request, &options).await?;
        }
        Commands::Classify { urls } => cmd_classify(&urls),
    }

    Ok(())
}

struct RunOptions {
    model: String,
    base_url: String,
    api_keys: String,
    llm_timeout: Duration,
    concurrency: usize,
    allow_private_urls: bool,
}

fn trim_all(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

async fn cmd_discover(request: &DiscoveryRequest, options: &RunOptions) -> Result<()> {
    request.validate().map_err(|e| anyhow::anyhow!(e))?;

    // The CLI runs once, so cooldowns never expire mid-run.
    let keys = KeyPool::from_csv(&options.api_keys, Duration::from_secs(300));
    if keys.is_empty() {
        anyhow::bail!("GROQ_API_KEYS must contain at least one key");
    }

    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let fetcher = if options.allow_private_urls {
        fetcher
            .allow_private_urls()
            .context("Failed to create HTTP client")?
    } else {
        fetcher
    };

    let model = OpenAiChatModel::with_base_url(&options.model, &options.base_url)
        .and_then(|m| m.with_timeout(options.llm_timeout))
        .map_err(|e| anyhow::anyhow!(e))?;
    let search = DuckDuckGoSearch::new().map_err(|e| anyhow::anyhow!(e))?;

    let config = DiscoveryConfig {
        concurrency: options.concurrency,
        ..DiscoveryConfig::default()
    };
    let service = DiscoveryService::with_config(fetcher, TextCleaner::new(), model, search, config);

    tracing::info!(
        role = %request.role,
        location = %request.location,
        model = %options.model,
        "Discovering jobs"
    );

    let result = service
        .run(request, &keys)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if !result.errors.is_empty() {
        tracing::warn!(count = result.errors.len(), "Discovery finished with errors");
    }
    tracing::info!(
        jobs = result.count(),
        sources_crawled = result.sources_crawled,
        "Discovery complete"
    );

    // Output JSON to stdout
    let output = serde_json::json!({
        "jobs": result.jobs,
        "count": result.count(),
        "search_queries_used": result.search_queries_used,
        "sources_crawled": result.sources_crawled,
        "errors": result.errors,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_classify(urls: &[String]) {
    for url in urls {
        let verdict = if is_career_url(url) { "career" } else { "skip" };
        println!("{verdict}\t{url}");
    }
}
