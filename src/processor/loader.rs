//! Loading dataset files into source documents
//!
//! Page text files carry their URL and title in the header written by the
//! crawler. PDF and Word documents carry no provenance, so their title is the
//! filename and their URL is left empty.

use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::crawler::storage::{DatasetStore, parse_page_header};
use crate::processor::error::ProcessError;

/// Extensions of documents that are ingested
pub const INGESTED_DOCUMENT_EXTENSIONS: [&str; 2] = ["pdf", "docx"];

/// Metadata attached to every chunk of a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path of the dataset file
    pub source: String,

    /// Originating URL, empty for binary documents
    pub url: String,

    /// Page title or filename
    pub title: String,
}

/// Text of one dataset file with its metadata
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Full text
    pub content: String,

    /// Provenance
    pub metadata: DocumentMetadata,
}

/// Documents loaded from a dataset, plus the files that failed
#[derive(Debug, Default)]
pub struct LoadedDataset {
    /// Successfully loaded documents, pages first
    pub documents: Vec<SourceDocument>,

    /// Files that could not be loaded
    pub skipped: Vec<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Load a page text file, recovering URL and title from its header
pub async fn load_page(path: &Path) -> Result<SourceDocument, ProcessError> {
    let content = tokio::fs::read_to_string(path).await?;
    let header = parse_page_header(&content);

    Ok(SourceDocument {
        metadata: DocumentMetadata {
            source: path.display().to_string(),
            url: header.url,
            title: header.title.unwrap_or_else(|| file_name(path)),
        },
        content,
    })
}

/// Extract the text of a PDF document
pub async fn load_pdf(path: &Path) -> Result<SourceDocument, ProcessError> {
    let owned = path.to_path_buf();
    // pdf-extract panics on some malformed files; the join error turns that into a parse error
    let content = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
        .await
        .map_err(|e| ProcessError::parse(path, e))?
        .map_err(|e| ProcessError::parse(path, e))?;

    Ok(binary_document(path, content))
}

/// Extract the text of a Word (.docx) document
pub async fn load_docx(path: &Path) -> Result<SourceDocument, ProcessError> {
    let owned = path.to_path_buf();
    let content = tokio::task::spawn_blocking(move || read_docx_text(&owned)).await??;

    Ok(binary_document(path, content))
}

fn binary_document(path: &Path, content: String) -> SourceDocument {
    SourceDocument {
        content,
        metadata: DocumentMetadata {
            source: path.display().to_string(),
            url: String::new(),
            title: file_name(path),
        },
    }
}

/// Read `word/document.xml` out of the archive and collect its text runs
fn read_docx_text(path: &Path) -> Result<String, ProcessError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ProcessError::parse(path, e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ProcessError::parse(path, e))?
        .read_to_string(&mut xml)?;

    docx_xml_to_text(&xml).map_err(|e| ProcessError::parse(path, e))
}

/// Text of a WordprocessingML body: `w:t` runs, one line per paragraph
pub fn docx_xml_to_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

/// Load every page text file and every PDF/DOCX under the dataset root.
/// Files that fail to load are logged and listed in `skipped`.
#[instrument(skip(store), fields(root = %store.root().display()))]
pub async fn load_dataset(store: &DatasetStore) -> Result<LoadedDataset, ProcessError> {
    let mut loaded = LoadedDataset::default();

    let pages = store.list_texts().await.map_err(|e| ProcessError::Other(e.to_string()))?;
    debug!("Found {} page text files", pages.len());
    for path in pages {
        match load_page(&path).await {
            Ok(doc) => loaded.documents.push(doc),
            Err(e) => {
                warn!("Skipping page {}: {}", path.display(), e);
                loaded.skipped.push(path);
            }
        }
    }

    let documents = store
        .list_with_extensions(&INGESTED_DOCUMENT_EXTENSIONS)
        .await
        .map_err(|e| ProcessError::Other(e.to_string()))?;
    debug!("Found {} PDF/Word documents", documents.len());
    for path in documents {
        let result = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("pdf")) {
            load_pdf(&path).await
        } else {
            load_docx(&path).await
        };
        match result {
            Ok(doc) if doc.content.trim().is_empty() => {
                warn!("Skipping document without text {}", path.display());
                loaded.skipped.push(path);
            }
            Ok(doc) => loaded.documents.push(doc),
            Err(e) => {
                warn!("Skipping document {}: {}", path.display(), e);
                loaded.skipped.push(path);
            }
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::storage::{StorageConfig, render_page};
    use crate::crawler::{DocumentCategory, PageText};
    use std::io::Write;
    use tempfile::tempdir;

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Akademik</w:t></w:r><w:r><w:t xml:space="preserve"> Takvim</w:t></w:r></w:p>
    <w:p><w:r><w:t>Güz &amp; Bahar</w:t><w:tab/><w:t>2024</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    fn write_docx(path: &Path, xml: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_docx_xml_to_text() {
        let text = docx_xml_to_text(DOCUMENT_XML).unwrap();
        assert_eq!(text, "Akademik Takvim\nGüz & Bahar\t2024\n");
    }

    #[tokio::test]
    async fn test_load_page_recovers_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.txt");
        let page = PageText {
            url: "https://gsu.edu.tr/tr/about".to_string(),
            title: "Hakkımızda".to_string(),
            body: "Tarihçe".to_string(),
        };
        tokio::fs::write(&path, render_page(&page)).await.unwrap();

        let doc = load_page(&path).await.unwrap();

        assert_eq!(doc.metadata.url, "https://gsu.edu.tr/tr/about");
        assert_eq!(doc.metadata.title, "Hakkımızda");
        assert_eq!(doc.metadata.source, path.display().to_string());
        assert!(doc.content.ends_with("Tarihçe"));
    }

    #[tokio::test]
    async fn test_load_page_without_header_uses_filename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "plain text").await.unwrap();

        let doc = load_page(&path).await.unwrap();

        assert_eq!(doc.metadata.url, "");
        assert_eq!(doc.metadata.title, "notes.txt");
    }

    #[tokio::test]
    async fn test_load_dataset_skips_broken_documents() {
        let dir = tempdir().unwrap();
        let store = DatasetStore::with_config(StorageConfig {
            base_path: dir.path().to_path_buf(),
        });
        store.ensure_layout().await.unwrap();
        store
            .write_page(&PageText {
                url: "https://gsu.edu.tr/tr/".to_string(),
                title: "Ana Sayfa".to_string(),
                body: "Hoş geldiniz".to_string(),
            })
            .await
            .unwrap();
        write_docx(
            &store.category_dir(DocumentCategory::Word).join("takvim.docx"),
            DOCUMENT_XML,
        );
        tokio::fs::write(
            store.category_dir(DocumentCategory::Pdf).join("broken.pdf"),
            b"not a pdf",
        )
        .await
        .unwrap();
        tokio::fs::write(
            store.category_dir(DocumentCategory::Excel).join("liste.xlsx"),
            b"PK",
        )
        .await
        .unwrap();

        let loaded = load_dataset(&store).await.unwrap();

        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.documents[0].metadata.title, "Ana Sayfa");
        let word = &loaded.documents[1];
        assert_eq!(word.metadata.title, "takvim.docx");
        assert_eq!(word.metadata.url, "");
        assert!(word.content.contains("Akademik Takvim"));
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].ends_with("broken.pdf"));
    }
}
