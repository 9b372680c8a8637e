//! On-disk dataset layout shared by the crawler and the ingestion step.
//!
//! ```text
//! dataset/
//!   texts/<sanitized-url>.txt          one file per crawled page
//!   documents/<category>/<basename>    raw binary documents
//! ```
//!
//! Page files carry their provenance in a small header:
//!
//! ```text
//! URL: <url>
//! TITLE: <title>
//! ==================================================
//! <body text>
//! ```
//!
//! The header is the only channel that carries URL and title into the index.

use std::sync::OnceLock;
use std::{io, path::Path, path::PathBuf};

use regex::Regex;
use tokio::fs;
use tracing::debug;
use url::Url;

use super::PageText;
use super::classify::DocumentCategory;

/// Directory holding page text files
pub const TEXTS_DIR: &str = "texts";

/// Directory holding category subdirectories of documents
pub const DOCUMENTS_DIR: &str = "documents";

/// Maximum length of a sanitized page filename stem
pub const MAX_FILENAME_LEN: usize = 100;

/// Width of the separator line below the header
const SEPARATOR_WIDTH: usize = 50;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Dataset root
    pub base_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("dataset"),
        }
    }
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl From<StorageError> for crate::error::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => crate::error::Error::Io(e),
            _ => crate::error::Error::Storage(err.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, StorageError>;

/// Provenance recovered from a page file header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageHeader {
    /// Source URL, empty when the header has no URL line
    pub url: String,

    /// Page title, `None` when the header has no title line
    pub title: Option<String>,
}

/// Render a page into the text file format
pub fn render_page(page: &PageText) -> String {
    format!(
        "URL: {}\nTITLE: {}\n{}\n{}",
        page.url,
        page.title,
        "=".repeat(SEPARATOR_WIDTH),
        page.body
    )
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^URL: (https?://\S+)").expect("valid regex"))
}

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^TITLE: (.*)$").expect("valid regex"))
}

/// Recover URL and title from a page file's header lines
pub fn parse_page_header(content: &str) -> PageHeader {
    let url = url_pattern()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let title = title_pattern()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    PageHeader { url, title }
}

/// Filesystem-safe, deterministic filename for a page URL
pub fn page_filename(url: &str) -> String {
    let stem: String = url
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_FILENAME_LEN)
        .collect();
    format!("{}.txt", stem)
}

/// Filename for a document: the URL basename, or `doc_<unix-ts><ext>` when the
/// path has no basename. The extension is appended when the basename lacks it.
pub fn document_filename(url: &str, extension: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let basename = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default()
        .to_string();

    if basename.is_empty() {
        return Ok(format!(
            "doc_{}{}",
            chrono::Utc::now().timestamp(),
            extension
        ));
    }

    if basename.to_lowercase().ends_with(extension) {
        Ok(basename)
    } else {
        Ok(format!("{}{}", basename, extension))
    }
}

/// Storage manager for the crawl dataset
#[derive(Debug, Clone)]
pub struct DatasetStore {
    config: StorageConfig,
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore {
    /// Create a new store rooted at `dataset/`
    pub fn new() -> Self {
        Self {
            config: StorageConfig::default(),
        }
    }

    /// Create a new store with custom configuration
    pub fn with_config(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Dataset root
    pub fn root(&self) -> &Path {
        &self.config.base_path
    }

    /// Directory of page text files
    pub fn texts_dir(&self) -> PathBuf {
        self.config.base_path.join(TEXTS_DIR)
    }

    /// Directory of a document category
    pub fn category_dir(&self, category: DocumentCategory) -> PathBuf {
        self.config
            .base_path
            .join(DOCUMENTS_DIR)
            .join(category.dir_name())
    }

    /// Create the texts directory and every category directory. Idempotent.
    pub async fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(self.texts_dir()).await?;
        for category in DocumentCategory::ALL {
            fs::create_dir_all(self.category_dir(category)).await?;
        }
        Ok(())
    }

    /// Write a page text file, returning its path
    pub async fn write_page(&self, page: &PageText) -> Result<PathBuf> {
        let dir = self.texts_dir();
        fs::create_dir_all(&dir).await?;

        let path = dir.join(page_filename(&page.url));
        fs::write(&path, render_page(page)).await?;
        debug!("Wrote page text to {}", path.display());
        Ok(path)
    }

    /// Write raw document bytes under the category directory, returning the path
    pub async fn save_document(
        &self,
        url: &str,
        category: DocumentCategory,
        extension: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let dir = self.category_dir(category);
        fs::create_dir_all(&dir).await?;

        let path = dir.join(document_filename(url, extension)?);
        fs::write(&path, bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// All page text files under the dataset root, sorted
    pub async fn list_texts(&self) -> Result<Vec<PathBuf>> {
        self.list_files(|path| has_extension(path, "txt")).await
    }

    /// All files with one of the given extensions (without dot), sorted
    pub async fn list_with_extensions(&self, extensions: &[&str]) -> Result<Vec<PathBuf>> {
        self.list_files(|path| extensions.iter().any(|ext| has_extension(path, ext)))
            .await
    }

    /// Walk the dataset root recursively and keep matching files
    async fn list_files<F>(&self, keep: F) -> Result<Vec<PathBuf>>
    where
        F: Fn(&Path) -> bool,
    {
        let mut found = Vec::new();
        if !fs::try_exists(&self.config.base_path).await? {
            return Ok(found);
        }

        let mut pending = vec![self.config.base_path.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && keep(&path) {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
