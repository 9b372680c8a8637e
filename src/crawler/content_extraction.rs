//! Content extraction functionality for the crawler module

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::crawler::PageText;
use crate::crawler::url_filter::normalize;

/// Title used when a page has no level-1 heading
pub const UNTITLED_PAGE: &str = "Basliksiz_Sayfa";

/// Everything the crawler needs from one HTML document
#[derive(Debug, Clone, Default)]
pub struct HtmlAnalysis {
    /// Extracted page, `None` when the text is below the minimum length
    pub page: Option<PageText>,

    /// Normalized absolute targets of content anchors, in document order
    pub links: Vec<String>,
}

/// Parse an HTML document once and extract both the page text and its links.
/// Anchors inside excluded elements are not followed.
///
/// The parsed document never leaves this function, so callers can hold the
/// result across `.await` points.
pub fn analyze_html(
    url: &str,
    html: &str,
    exclude_selectors: &[String],
    min_text_chars: usize,
) -> HtmlAnalysis {
    let document = Html::parse_document(html);
    let excluded = excluded_nodes(&document, exclude_selectors);
    let page = extract_page(url, &document, &excluded, min_text_chars);
    let links = match Url::parse(url) {
        Ok(base) => extract_links(&base, &document, &excluded),
        Err(e) => {
            warn!("Cannot resolve links against {}: {}", url, e);
            Vec::new()
        }
    };

    HtmlAnalysis { page, links }
}

/// Ids of the elements matched by the boilerplate selectors
pub fn excluded_nodes(document: &Html, exclude_selectors: &[String]) -> HashSet<NodeId> {
    let mut excluded = HashSet::new();
    for selector_str in exclude_selectors {
        match Selector::parse(selector_str) {
            Ok(selector) => {
                excluded.extend(document.select(&selector).map(|element| element.id()));
            }
            Err(e) => {
                warn!("Failed to parse selector '{}': {:?}", selector_str, e);
            }
        }
    }
    excluded
}

fn is_excluded(element: &ElementRef<'_>, excluded: &HashSet<NodeId>) -> bool {
    excluded.contains(&element.id()) || element.ancestors().any(|a| excluded.contains(&a.id()))
}

/// Extract title and body text, or `None` for near-empty pages
///
/// # Arguments
///
/// * `url` - The URL of the page
/// * `document` - The parsed HTML
/// * `excluded` - Boilerplate elements to drop, from `excluded_nodes`
/// * `min_text_chars` - Minimum body length in characters
pub fn extract_page(
    url: &str,
    document: &Html,
    excluded: &HashSet<NodeId>,
    min_text_chars: usize,
) -> Option<PageText> {
    let heading = Selector::parse("h1").ok().and_then(|selector| {
        document
            .select(&selector)
            .find(|h1| !is_excluded(h1, excluded))
            .map(|h1| h1.text().collect::<Vec<_>>().join(" "))
    });
    // The title lives on a single header line
    let title = heading
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_PAGE.to_string());

    let mut raw = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if node.ancestors().any(|a| excluded.contains(&a.id())) {
            continue;
        }
        let content: &str = text;
        raw.push(content);
    }

    let body = clean_text(&raw.join("\n"));
    if body.chars().count() < min_text_chars {
        return None;
    }

    Some(PageText {
        url: url.to_string(),
        title,
        body,
    })
}

/// Break text into trimmed lines, splitting runs of two or more spaces into
/// separate lines and dropping empty ones
pub fn clean_text(text: &str) -> String {
    text.lines()
        .flat_map(|line| line.trim().split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve every anchor `href` outside the excluded elements against the page
/// URL and normalize it. Hrefs that do not resolve to a URL are dropped.
pub fn extract_links(base: &Url, document: &Html, excluded: &HashSet<NodeId>) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|anchor| !is_excluded(anchor, excluded))
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter_map(|resolved| normalize(resolved.as_str()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawlerConfig;

    fn excludes() -> Vec<String> {
        CrawlerConfig::default().exclude_selectors
    }

    fn long_paragraph() -> String {
        "Galatasaray Üniversitesi Mühendislik Fakültesi öğrencilerine yönelik duyuru. "
            .repeat(5)
    }

    #[test]
    fn test_extract_strips_boilerplate() {
        let html = format!(
            r#"<html><head><title>GSU</title><script>var x = "script text";</script>
            <style>.a {{ color: red }}</style></head>
            <body>
              <header><h1>Header Title</h1></header>
              <nav><a href="/tr/menu">Menü</a></nav>
              <h1>  Duyurular
                 ve Haberler </h1>
              <p>{}</p>
              <aside>Yan panel</aside>
              <footer>Telif hakkı</footer>
            </body></html>"#,
            long_paragraph()
        );
        let document = Html::parse_document(&html);
        let excluded = excluded_nodes(&document, &excludes());

        let page = extract_page("https://gsu.edu.tr/tr/", &document, &excluded, 200).unwrap();

        assert_eq!(page.title, "Duyurular ve Haberler");
        assert!(page.body.contains("Mühendislik Fakültesi"));
        assert!(!page.body.contains("script text"));
        assert!(!page.body.contains("color: red"));
        assert!(!page.body.contains("Menü"));
        assert!(!page.body.contains("Yan panel"));
        assert!(!page.body.contains("Telif"));
        assert!(!page.body.contains("Header Title"));
    }

    #[test]
    fn test_short_page_is_discarded() {
        let document = Html::parse_document("<html><body><h1>Boş</h1><p>Kısa.</p></body></html>");
        let excluded = excluded_nodes(&document, &excludes());
        assert!(extract_page("https://gsu.edu.tr/tr/", &document, &excluded, 200).is_none());
    }

    #[test]
    fn test_missing_heading_uses_placeholder() {
        let html = format!("<html><body><p>{}</p></body></html>", long_paragraph());
        let document = Html::parse_document(&html);
        let excluded = excluded_nodes(&document, &excludes());

        let page = extract_page("https://gsu.edu.tr/tr/", &document, &excluded, 200).unwrap();
        assert_eq!(page.title, UNTITLED_PAGE);
    }

    #[test]
    fn test_clean_text_splits_double_spaces() {
        let text = "  Birinci satır  \n\n\tİkinci    Üçüncü \n   \nSon";
        assert_eq!(clean_text(text), "Birinci satır\nİkinci\nÜçüncü\nSon");
    }

    #[test]
    fn test_extract_links_resolves_and_normalizes() {
        let html = r##"<html><body>
            <a href="about">Hakkında</a>
            <a href="/tr/duyurular?page=2#liste">Duyurular</a>
            <a href="https://external.com">Dış</a>
            <a href="#top">Yukarı</a>
            <a>No href</a>
        </body></html>"##;
        let document = Html::parse_document(html);
        let base = Url::parse("https://gsu.edu.tr/tr/").unwrap();

        let links = extract_links(&base, &document, &HashSet::new());

        assert_eq!(
            links,
            vec![
                "https://gsu.edu.tr/tr/about".to_string(),
                "https://gsu.edu.tr/tr/duyurular".to_string(),
                "https://external.com/".to_string(),
                "https://gsu.edu.tr/tr/".to_string(),
            ]
        );
    }

    #[test]
    fn test_analyze_html_skips_boilerplate_links() {
        let html = r#"<html><body>
            <header><a href="/tr/h">Başlık</a></header>
            <nav><ul><li><a href="/tr/n">Menü</a></li></ul></nav>
            <p>İçerik <a href="/tr/body">Duyuru</a></p>
            <aside><a href="/tr/a">Yan</a></aside>
            <footer><a href="/tr/f">İletişim</a></footer>
        </body></html>"#;

        let analysis = analyze_html("https://gsu.edu.tr/tr/", html, &excludes(), 200);

        assert!(analysis.page.is_none());
        assert_eq!(analysis.links, vec!["https://gsu.edu.tr/tr/body".to_string()]);
    }
}
