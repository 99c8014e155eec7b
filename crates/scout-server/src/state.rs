use scout_client::{DuckDuckGoSearch, OpenAiChatModel, ReqwestFetcher, TextCleaner};
use scout_core::traits::{ChatModel, Cleaner, Fetcher, SearchEngine};
use scout_core::{DiscoveryService, KeyPool};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
///
/// Generic over the pipeline collaborators so tests can inject mocks.
pub struct AppState<F, C, M, S>
where
    F: Fetcher,
    C: Cleaner,
    M: ChatModel,
    S: SearchEngine,
{
    pub service: DiscoveryService<F, C, M, S>,
    pub keys: KeyPool,
}

/// State wired to the real HTTP, search and LLM clients.
pub type LiveState = AppState<ReqwestFetcher, TextCleaner, OpenAiChatModel, DuckDuckGoSearch>;
