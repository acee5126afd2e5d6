//! Essay site scrapers.
//!
//! Scraping runs in two phases, each a separate CLI command:
//!
//! 1. **Indexing**: read the essay list page and date every linked essay
//! 2. **Extraction**: download each essay and split its body into paragraphs
//!
//! | Concern | Module | Notes |
//! |---------|--------|-------|
//! | Essay list | [`listing`] | Relative `.html` links on `articles.html` |
//! | Publication dates | [`dates`] | Free-text dates near the top of the page |
//! | Body text | [`content`] | Sentence-packed paragraphs of ~200 chars |
//!
//! Fetches are sequential with a fixed delay between requests; a failed fetch
//! is logged and recorded, never fatal to the batch.

pub mod content;
pub mod dates;
pub mod listing;

use crate::config::SiteSettings;
use crate::error::ScrapeError;
use reqwest::Client;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by every scraper request.
pub fn http_client(site: &SiteSettings) -> Result<Client, ScrapeError> {
    Ok(Client::builder()
        .timeout(site.fetch_timeout())
        .user_agent(USER_AGENT)
        .build()?)
}
