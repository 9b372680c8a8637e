//! University website crawler
//!
//! This module walks the allowed domains breadth-first from a fixed seed list,
//! saving page text and binary documents into the dataset layout that the
//! ingestion step reads back.

mod classify;
mod config;
mod content_extraction;
mod error;
mod fetch;
mod frontier;
mod report;
pub mod storage;
mod url_filter;

pub use classify::{ContentKind, DocumentCategory, classify};
pub use config::{CrawlerConfig, CrawlerConfigBuilder, DEFAULT_IGNORED_EXTENSIONS, DEFAULT_SEEDS};
pub use content_extraction::{HtmlAnalysis, UNTITLED_PAGE, analyze_html, clean_text};
pub use error::CrawlError;
pub use fetch::{FetchedResource, Fetcher, HttpFetcher};
pub use frontier::{CrawlSummary, Crawler, CrawlerState, StepOutcome};
pub use report::{DatasetReport, analyze_dataset};
pub use storage::{DatasetStore, StorageConfig, StorageError};
pub use url_filter::{UrlFilter, normalize};

use serde::{Deserialize, Serialize};

/// Text extracted from one HTML page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Normalized URL of the page
    pub url: String,

    /// First level-1 heading, or the placeholder title
    pub title: String,

    /// Cleaned body text
    pub body: String,
}

/// Crawl with the default HTTP fetcher
pub async fn crawl(config: CrawlerConfig, store: DatasetStore) -> Result<CrawlSummary, CrawlError> {
    let fetcher = HttpFetcher::new(config.clone())?;
    let mut crawler = Crawler::new(config, fetcher, store);
    Ok(crawler.run().await)
}
