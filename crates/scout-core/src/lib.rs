pub mod config;
pub mod discoverer;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod keys;
pub mod models;
pub mod page;
pub mod queries;
pub mod traits;
pub mod url_filter;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::ScoutConfig;
pub use discovery::{DiscoveryConfig, DiscoveryService, DiscoveryStage};
pub use error::AppError;
pub use keys::{KeyPool, KeyPoolStatus};
pub use models::{DiscoveredJob, DiscoveryRequest, DiscoveryResult};
pub use traits::{ChatModel, Cleaner, CredentialProvider, Fetcher, SearchEngine};
pub use url_filter::is_career_url;
