use crate::error::AppError;
use crate::models::PageContent;
use crate::traits::{Cleaner, Fetcher};

/// Fetches one page and reduces it to budget-truncated visible text.
#[derive(Clone)]
pub struct PageFetcher<F: Fetcher, C: Cleaner> {
    fetcher: F,
    cleaner: C,
}

impl<F: Fetcher, C: Cleaner> PageFetcher<F, C> {
    pub fn new(fetcher: F, cleaner: C) -> Self {
        Self { fetcher, cleaner }
    }

    /// Fetch and clean `url`. Any failure comes back as `Err`, never as empty text.
    pub async fn fetch_page(&self, url: &str) -> Result<PageContent, AppError> {
        let html = self.fetcher.fetch(url).await?;
        let text = self.cleaner.clean(&html)?;
        tracing::debug!(
            %url,
            html_bytes = html.len(),
            text_bytes = text.len(),
            "Page cleaned"
        );
        // Truncate only after cleaning so the budget never cuts through markup.
        Ok(PageContent::new(url, &text))
    }
}
