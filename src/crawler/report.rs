//! Dataset inventory and cleanup after a crawl

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::crawler::classify::DocumentCategory;
use crate::crawler::storage::{DatasetStore, StorageError};

/// Text files smaller than this are considered empty or broken
pub const MIN_TEXT_FILE_BYTES: u64 = 100;

/// More valid text files than this is enough to build an index
pub const SUFFICIENT_TEXT_FILES: usize = 500;

/// Embedding price in USD per million tokens
pub const EMBEDDING_COST_PER_MILLION: f64 = 0.02;

/// Inventory of a dataset directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetReport {
    /// Page text files found
    pub text_files: usize,
    /// PDF documents found
    pub pdf_files: usize,
    /// Word documents found
    pub word_files: usize,
    /// Undersized text files (deleted when pruning)
    pub undersized: usize,
    /// Whether undersized files were deleted
    pub pruned: bool,
    /// Total bytes of the remaining valid text files
    pub text_bytes: u64,
}

impl DatasetReport {
    /// Text files above the size floor
    pub fn valid_text_files(&self) -> usize {
        self.text_files - self.undersized
    }

    /// Rough token count, four bytes per token
    pub fn estimated_tokens(&self) -> u64 {
        self.text_bytes / 4
    }

    /// Estimated cost in USD of embedding the valid text
    pub fn estimated_cost_usd(&self) -> f64 {
        self.estimated_tokens() as f64 / 1_000_000.0 * EMBEDDING_COST_PER_MILLION
    }

    /// Whether enough pages were collected
    pub fn is_sufficient(&self) -> bool {
        self.valid_text_files() > SUFFICIENT_TEXT_FILES
    }
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(48);
        writeln!(f, "Dataset report")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Text pages:        {}", self.text_files)?;
        writeln!(f, "PDF documents:     {}", self.pdf_files)?;
        writeln!(f, "Word documents:    {}", self.word_files)?;
        writeln!(f, "{rule}")?;
        let action = if self.pruned { "deleted" } else { "found" };
        writeln!(f, "Undersized files {}: {}", action, self.undersized)?;
        writeln!(f, "Valid text files:  {}", self.valid_text_files())?;
        writeln!(f, "Estimated tokens:  {}", self.estimated_tokens())?;
        writeln!(f, "Estimated cost:    ~${:.4}", self.estimated_cost_usd())?;
        writeln!(f, "{rule}")?;
        if self.is_sufficient() {
            write!(f, "Dataset is large enough to build the index.")
        } else {
            write!(f, "Fewer pages than expected; check the crawler settings.")
        }
    }
}

/// Count dataset files, optionally deleting undersized text files
pub async fn analyze_dataset(
    store: &DatasetStore,
    prune: bool,
) -> Result<DatasetReport, StorageError> {
    let texts = files_with_extension(&store.texts_dir(), "txt").await?;
    let pdfs = files_with_extension(&store.category_dir(DocumentCategory::Pdf), "pdf").await?;
    let words = files_with_extension(&store.category_dir(DocumentCategory::Word), "docx").await?;

    let mut report = DatasetReport {
        text_files: texts.len(),
        pdf_files: pdfs.len(),
        word_files: words.len(),
        pruned: prune,
        ..Default::default()
    };

    for path in &texts {
        let size = fs::metadata(path).await?.len();
        if size >= MIN_TEXT_FILE_BYTES {
            report.text_bytes += size;
            continue;
        }

        report.undersized += 1;
        if prune {
            match fs::remove_file(path).await {
                Ok(()) => debug!("Removed undersized file {}", path.display()),
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }

    info!(
        "Dataset has {} valid text files, {} PDFs, {} Word documents",
        report.valid_text_files(),
        report.pdf_files,
        report.word_files
    );
    Ok(report)
}

/// Files directly inside `dir` with the given extension; empty if `dir` is missing
async fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, StorageError> {
    let mut found = Vec::new();
    if !fs::try_exists(dir).await? {
        return Ok(found);
    }

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if matches && entry.file_type().await?.is_file() {
            found.push(path);
        }
    }

    found.sort();
    Ok(found)
}
