//! Routing of fetched resources to document save or HTML extraction

use std::fmt;

use url::Url;

use crate::crawler::url_filter::path_extension;

/// Category directory a binary document is grouped under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentCategory {
    Pdf,
    Word,
    PowerPoint,
    Excel,
}

impl DocumentCategory {
    /// Every category, in directory creation order
    pub const ALL: [DocumentCategory; 4] = [
        DocumentCategory::Pdf,
        DocumentCategory::Word,
        DocumentCategory::PowerPoint,
        DocumentCategory::Excel,
    ];

    /// Name of the category subdirectory
    pub fn dir_name(&self) -> &'static str {
        match self {
            DocumentCategory::Pdf => "pdf",
            DocumentCategory::Word => "word",
            DocumentCategory::PowerPoint => "powerpoint",
            DocumentCategory::Excel => "excel",
        }
    }

    /// Category of a known document extension (with leading dot, lower-case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".pdf" => Some(DocumentCategory::Pdf),
            ".doc" | ".docx" => Some(DocumentCategory::Word),
            ".ppt" | ".pptx" => Some(DocumentCategory::PowerPoint),
            ".xls" | ".xlsx" => Some(DocumentCategory::Excel),
            _ => None,
        }
    }

    /// Category and canonical extension for a document content type
    pub fn from_content_type(content_type: &str) -> Option<(Self, &'static str)> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match mime.as_str() {
            "application/pdf" => Some((DocumentCategory::Pdf, ".pdf")),
            "application/msword" => Some((DocumentCategory::Word, ".doc")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some((DocumentCategory::Word, ".docx"))
            }
            "application/vnd.ms-powerpoint" => Some((DocumentCategory::PowerPoint, ".ppt")),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Some((DocumentCategory::PowerPoint, ".pptx"))
            }
            "application/vnd.ms-excel" => Some((DocumentCategory::Excel, ".xls")),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some((DocumentCategory::Excel, ".xlsx"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What to do with a fetched resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// Save the raw bytes under the category directory
    Document {
        category: DocumentCategory,
        extension: String,
    },
    /// Extract page text and follow links
    Html,
    /// Neither; drop it
    Other,
}

/// Classify a resource by URL extension first, then by declared content type.
///
/// A document extension in the URL wins over an HTML content type, so a PDF
/// served as `text/html` by a misconfigured server is still saved as a PDF.
pub fn classify(url: &str, content_type: &str) -> ContentKind {
    let url_extension = Url::parse(url)
        .ok()
        .and_then(|parsed| path_extension(parsed.path()));

    if let Some(ext) = url_extension {
        if let Some(category) = DocumentCategory::from_extension(&ext) {
            return ContentKind::Document {
                category,
                extension: ext,
            };
        }
    }

    if let Some((category, ext)) = DocumentCategory::from_content_type(content_type) {
        return ContentKind::Document {
            category,
            extension: ext.to_string(),
        };
    }

    if content_type.to_lowercase().contains("text/html") {
        ContentKind::Html
    } else {
        ContentKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_routed_to_document() {
        let kind = classify(
            "https://gsu.edu.tr/files/yonetmelik.pdf",
            "application/pdf",
        );
        assert_eq!(
            kind,
            ContentKind::Document {
                category: DocumentCategory::Pdf,
                extension: ".pdf".to_string(),
            }
        );
    }

    #[test]
    fn test_extension_wins_over_html_content_type() {
        let kind = classify("https://gsu.edu.tr/files/Takvim.DOCX", "text/html");
        assert_eq!(
            kind,
            ContentKind::Document {
                category: DocumentCategory::Word,
                extension: ".docx".to_string(),
            }
        );
    }

    #[test]
    fn test_content_type_without_extension() {
        let kind = classify(
            "https://gsu.edu.tr/download/123",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        );
        assert_eq!(
            kind,
            ContentKind::Document {
                category: DocumentCategory::Excel,
                extension: ".xlsx".to_string(),
            }
        );

        let kind = classify("https://gsu.edu.tr/download/9", "application/msword");
        assert!(matches!(
            kind,
            ContentKind::Document {
                category: DocumentCategory::Word,
                ..
            }
        ));
    }

    #[test]
    fn test_html_and_other() {
        assert_eq!(
            classify("https://gsu.edu.tr/tr/", "text/html; charset=UTF-8"),
            ContentKind::Html
        );
        assert_eq!(
            classify("https://gsu.edu.tr/feed", "application/rss+xml"),
            ContentKind::Other
        );
        assert_eq!(classify("https://gsu.edu.tr/tr/", ""), ContentKind::Other);
    }

    #[test]
    fn test_docs_path_is_not_a_word_document() {
        assert_eq!(
            classify("https://gsu.edu.tr/docs/index", "text/html"),
            ContentKind::Html
        );
    }

    #[test]
    fn test_category_dir_names() {
        let names: Vec<_> = DocumentCategory::ALL.iter().map(|c| c.dir_name()).collect();
        assert_eq!(names, vec!["pdf", "word", "powerpoint", "excel"]);
    }
}
