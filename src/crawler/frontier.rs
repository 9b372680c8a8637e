//! Breadth-first crawl frontier and the traversal loop.
//!
//! All crawl state lives in a [`CrawlerState`] owned by one [`Crawler`], so
//! independent runs never share a queue or visited set.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info, instrument, warn};

use crate::crawler::classify::{ContentKind, classify};
use crate::crawler::config::CrawlerConfig;
use crate::crawler::content_extraction::analyze_html;
use crate::crawler::fetch::{FetchedResource, Fetcher};
use crate::crawler::storage::DatasetStore;
use crate::crawler::url_filter::{UrlFilter, normalize};

/// Queue and dedup sets of one crawl run
#[derive(Debug, Default, Clone)]
pub struct CrawlerState {
    queue: VecDeque<String>,
    enqueued: HashSet<String>,
    visited: HashSet<String>,
    processed: usize,
}

impl CrawlerState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a URL unless it was already queued or visited during this run.
    /// Returns whether it was added.
    pub fn enqueue(&mut self, url: String) -> bool {
        if self.visited.contains(&url) || self.enqueued.contains(&url) {
            return false;
        }
        self.enqueued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Pop the oldest pending URL
    pub fn dequeue(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    /// Record a URL as fetched. Returns false if it already was.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Whether a URL was already fetched this run
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Whether a URL is waiting in the queue
    pub fn is_queued(&self, url: &str) -> bool {
        self.queue.iter().any(|queued| queued == url)
    }

    /// Pending URLs in dequeue order
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    /// Number of pending URLs
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of fetched URLs
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Number of saved items counted against the cap
    pub fn processed(&self) -> usize {
        self.processed
    }

    fn record_processed(&mut self) {
        self.processed += 1;
    }
}

/// What happened to one dequeued URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Page text written; `links_added` new URLs queued
    PageSaved { links_added: usize },
    /// HTML page below the minimum length; links still followed
    PageTooShort { links_added: usize },
    /// Binary document written
    DocumentSaved,
    /// Document fetched but could not be written
    DocumentFailed,
    /// Fetched resource is neither HTML nor a known document
    Discarded,
    /// URL already fetched this run
    AlreadyVisited,
    /// Dequeued entry is not a URL
    Invalid,
    /// Fetch failed after retries
    FetchFailed,
}

/// Totals of a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Items counted against the cap
    pub processed: usize,
    /// Page text files written
    pub pages_saved: usize,
    /// Documents written
    pub documents_saved: usize,
    /// Fetch or save failures
    pub failures: usize,
    /// Dequeued entries that were skipped without fetching
    pub skipped: usize,
    /// URLs still queued when the loop stopped
    pub remaining: usize,
}

/// Sequential breadth-first crawler
pub struct Crawler<F: Fetcher> {
    config: CrawlerConfig,
    filter: UrlFilter,
    fetcher: F,
    store: DatasetStore,
    state: CrawlerState,
}

impl<F: Fetcher> Crawler<F> {
    /// Create a crawler with its queue seeded from the configuration
    pub fn new(config: CrawlerConfig, fetcher: F, store: DatasetStore) -> Self {
        let filter = UrlFilter::from_config(&config);
        let mut state = CrawlerState::new();
        for seed in &config.seeds {
            match normalize(seed) {
                Ok(url) => {
                    state.enqueue(url);
                }
                Err(e) => warn!("Ignoring malformed seed {}: {}", seed, e),
            }
        }

        Self {
            config,
            filter,
            fetcher,
            store,
            state,
        }
    }

    /// Current crawl state
    pub fn state(&self) -> &CrawlerState {
        &self.state
    }

    /// Whether the loop should stop
    pub fn is_done(&self) -> bool {
        self.state.queue_len() == 0 || self.state.processed() >= self.config.max_items
    }

    /// Run until the queue drains or the processed cap is reached
    #[instrument(skip(self), fields(max_items = self.config.max_items))]
    pub async fn run(&mut self) -> CrawlSummary {
        info!(
            "Starting crawl of {:?} with {} seeds",
            self.config.allowed_domains,
            self.state.queue_len()
        );
        if let Err(e) = self.store.ensure_layout().await {
            warn!("Could not prepare dataset directories: {}", e);
        }

        let mut summary = CrawlSummary::default();
        while !self.is_done() {
            match self.step().await {
                Some(StepOutcome::PageSaved { .. }) => summary.pages_saved += 1,
                Some(StepOutcome::DocumentSaved) => summary.documents_saved += 1,
                Some(StepOutcome::DocumentFailed | StepOutcome::FetchFailed) => {
                    summary.failures += 1
                }
                Some(StepOutcome::AlreadyVisited | StepOutcome::Invalid) => summary.skipped += 1,
                Some(StepOutcome::PageTooShort { .. } | StepOutcome::Discarded) | None => {}
            }
        }

        summary.processed = self.state.processed();
        summary.remaining = self.state.queue_len();
        info!(
            "Crawl finished: {} items processed ({} pages, {} documents), {} failures",
            summary.processed, summary.pages_saved, summary.documents_saved, summary.failures
        );
        summary
    }

    /// Process the head of the queue. Returns `None` when the queue is empty.
    pub async fn step(&mut self) -> Option<StepOutcome> {
        let raw = self.state.dequeue()?;
        let url = match normalize(&raw) {
            Ok(url) => url,
            Err(e) => {
                debug!("Dropping malformed queue entry {}: {}", raw, e);
                return Some(StepOutcome::Invalid);
            }
        };

        if self.state.is_visited(&url) {
            return Some(StepOutcome::AlreadyVisited);
        }

        info!(
            "[{}/{}] Visiting {}",
            self.state.processed() + 1,
            self.config.max_items,
            url
        );

        let resource = match self.fetcher.fetch(&url).await {
            Ok(resource) => resource,
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                return Some(StepOutcome::FetchFailed);
            }
        };

        let outcome = match classify(&url, &resource.content_type) {
            ContentKind::Document {
                category,
                extension,
            } => {
                match self
                    .store
                    .save_document(&url, category, &extension, &resource.body)
                    .await
                {
                    Ok(path) => {
                        info!("Saved {} document to {}", category, path.display());
                        self.state.mark_visited(&url);
                        self.state.record_processed();
                        StepOutcome::DocumentSaved
                    }
                    Err(e) => {
                        warn!("Could not save document {}: {}", url, e);
                        StepOutcome::DocumentFailed
                    }
                }
            }
            ContentKind::Html => {
                let outcome = self.handle_html(&url, &resource).await;
                tokio::time::sleep(self.config.rate_limit()).await;
                outcome
            }
            ContentKind::Other => {
                debug!(
                    "Discarding {} with content type '{}'",
                    url, resource.content_type
                );
                self.state.mark_visited(&url);
                StepOutcome::Discarded
            }
        };

        Some(outcome)
    }

    async fn handle_html(&mut self, url: &str, resource: &FetchedResource) -> StepOutcome {
        let analysis = analyze_html(
            url,
            &resource.text(),
            &self.config.exclude_selectors,
            self.config.min_text_chars,
        );

        let saved = match &analysis.page {
            Some(page) => match self.store.write_page(page).await {
                Ok(path) => {
                    debug!("Saved page text to {}", path.display());
                    self.state.record_processed();
                    true
                }
                Err(e) => {
                    warn!("Could not save page text for {}: {}", url, e);
                    false
                }
            },
            None => {
                debug!("Page {} is below {} characters", url, self.config.min_text_chars);
                false
            }
        };
        self.state.mark_visited(url);

        let mut links_added = 0;
        for link in analysis.links {
            if self.filter.is_valid(&link) && self.state.enqueue(link) {
                links_added += 1;
            }
        }

        if saved {
            StepOutcome::PageSaved { links_added }
        } else {
            StepOutcome::PageTooShort { links_added }
        }
    }
}
