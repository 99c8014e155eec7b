pub mod cleaner;
pub mod fetcher;
pub mod llm;
pub mod search;

#[cfg(test)]
mod testserver;

pub use cleaner::TextCleaner;
pub use fetcher::ReqwestFetcher;
pub use llm::OpenAiChatModel;
pub use search::DuckDuckGoSearch;
