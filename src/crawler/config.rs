//! # Crawler Configuration Module
//!
//! Configuration for the university crawler: the seed list, the domain
//! allow-list, the extension block-list, the processed-item cap and the
//! politeness/retry timings. Uses a builder for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with crawler parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation for easier configuration

use std::time::Duration;

/// Seed URLs of the university faculties
pub const DEFAULT_SEEDS: &[&str] = &[
    "https://gsu.edu.tr/tr/",
    "https://muhendislik.gsu.edu.tr/tr/",
    "https://fbe.gsu.edu.tr/tr/",
    "https://sbe.gsu.edu.tr/tr/",
    "https://hukuk.gsu.edu.tr/tr/",
    "https://iletisim.gsu.edu.tr/tr/",
    "https://iibf.gsu.edu.tr/tr/",
    "https://kutuphane.gsu.edu.tr/tr/",
];

/// Extensions never enqueued
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".mp4", ".avi", ".zip", ".rar", ".css", ".js", ".json",
    ".xml",
];

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Starting URLs, queued in order
    pub seeds: Vec<String>,

    /// Host suffixes a link must end with to be followed
    pub allowed_domains: Vec<String>,

    /// Lower-case path extensions that are never followed
    pub ignored_extensions: Vec<String>,

    /// Hard cap on processed items (saved pages + saved documents)
    pub max_items: usize,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Delay in milliseconds after each HTML page
    pub rate_limit_ms: u64,

    /// Extra attempts for transient fetch failures
    pub max_retries: u32,

    /// Initial backoff in milliseconds, doubled on every retry
    pub retry_backoff_ms: u64,

    /// Minimum extracted text length (in characters) for a page to be kept
    pub min_text_chars: usize,

    /// User agent to use for requests
    pub user_agent: String,

    /// Elements stripped before text extraction
    pub exclude_selectors: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            allowed_domains: vec!["gsu.edu.tr".to_string()],
            ignored_extensions: DEFAULT_IGNORED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_items: 5000,
            timeout_ms: 10_000,
            rate_limit_ms: 300,
            max_retries: 2,
            retry_backoff_ms: 500,
            min_text_chars: 200,
            user_agent: "GSU_Student_Project_Bot/1.0".to_string(),
            exclude_selectors: ["script", "style", "nav", "footer", "header", "aside"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Replace the seed URLs
    pub fn seeds(mut self, seeds: Vec<String>) -> Self {
        self.config.seeds = seeds;
        self
    }

    /// Replace the allowed domain suffixes
    pub fn allowed_domains(mut self, allowed_domains: Vec<String>) -> Self {
        self.config.allowed_domains = allowed_domains;
        self
    }

    /// Replace the ignored extensions
    pub fn ignored_extensions(mut self, ignored_extensions: Vec<String>) -> Self {
        self.config.ignored_extensions = ignored_extensions;
        self
    }

    /// Set the processed-item cap
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.config.max_items = max_items;
        self
    }

    /// Set the request timeout in milliseconds
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Set the delay in milliseconds between page requests
    pub fn rate_limit_ms(mut self, rate_limit_ms: u64) -> Self {
        self.config.rate_limit_ms = rate_limit_ms;
        self
    }

    /// Set the number of retries for transient failures
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the initial retry backoff in milliseconds
    pub fn retry_backoff_ms(mut self, retry_backoff_ms: u64) -> Self {
        self.config.retry_backoff_ms = retry_backoff_ms;
        self
    }

    /// Set the minimum page text length
    pub fn min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.config.min_text_chars = min_text_chars;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the elements stripped before text extraction
    pub fn exclude_selectors(mut self, exclude_selectors: Vec<String>) -> Self {
        self.config.exclude_selectors = exclude_selectors;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the politeness delay as a Duration
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Get the request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff before the given retry attempt (1-based)
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlerConfig::default();

        assert_eq!(config.seeds.len(), 8);
        assert_eq!(config.seeds[0], "https://gsu.edu.tr/tr/");
        assert_eq!(config.allowed_domains, vec!["gsu.edu.tr".to_string()]);
        assert_eq!(config.max_items, 5000);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.rate_limit(), Duration::from_millis(300));
        assert_eq!(config.min_text_chars, 200);
        assert!(config.ignored_extensions.contains(&".css".to_string()));
    }

    #[test]
    fn test_builder() {
        let config = CrawlerConfig::builder()
            .seeds(vec!["https://example.edu/".to_string()])
            .allowed_domains(vec!["example.edu".to_string()])
            .max_items(10)
            .rate_limit_ms(0)
            .user_agent("test-agent")
            .build();

        assert_eq!(config.seeds, vec!["https://example.edu/".to_string()]);
        assert_eq!(config.max_items, 10);
        assert_eq!(config.rate_limit(), Duration::ZERO);
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let config = CrawlerConfig::builder().retry_backoff_ms(100).build();

        assert_eq!(config.retry_backoff(1), Duration::from_millis(100));
        assert_eq!(config.retry_backoff(2), Duration::from_millis(200));
        assert_eq!(config.retry_backoff(3), Duration::from_millis(400));
    }
}
