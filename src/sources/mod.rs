//! News sources for collecting headlines.
//!
//! Collection follows a consistent two-step pattern:
//!
//! 1. **Category selection**: pick a weighted-random category or take the one
//!    the caller asked for, and build a search query from its keywords
//! 2. **Fetching**: run one feed search per locale, merge and dedupe
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Google News | [`google_news`] | RSS search | One request per locale, first 10 items |
//!
//! # Common Patterns
//!
//! Feeds implement [`NewsFeed`]; [`collector::NewsCollector`] is generic over
//! it so tests can substitute canned results. Feed failures propagate to the
//! caller; an empty result is not an error and triggers a single retry with
//! the fallback category.

use thiserror::Error;

use crate::config::Locale;
use crate::models::FeedEntry;

pub mod collector;
pub mod google_news;

/// Errors that can occur while collecting news.
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(u16),

    #[error("failed to parse feed: {0}")]
    Parse(#[from] quick_xml::DeError),

    #[error("invalid feed url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid category configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}

/// A source of headline search results.
pub trait NewsFeed {
    /// Run one search for `query` in `locale`.
    async fn search(&self, query: &str, locale: &Locale) -> Result<Vec<FeedEntry>, NewsError>;
}
