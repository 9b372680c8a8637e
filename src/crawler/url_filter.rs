//! URL canonicalization and the domain/extension follow rules

use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;

/// Canonical form of a URL: scheme, authority and path only.
///
/// Query string and fragment are discarded so that two links differing only in
/// those parts map to the same crawl key.
pub fn normalize(url: &str) -> Result<String, CrawlError> {
    let mut parsed = Url::parse(url.trim())?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed.into())
}

/// Lower-cased extension of the last path segment, including the dot
pub fn path_extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let dot = segment.rfind('.')?;
    if dot == 0 && segment.len() == 1 {
        return None;
    }
    Some(segment[dot..].to_lowercase())
}

/// Decides which discovered links are worth following
#[derive(Debug, Clone)]
pub struct UrlFilter {
    allowed_domains: Vec<String>,
    ignored_extensions: Vec<String>,
}

impl UrlFilter {
    /// Create a filter from explicit rules
    pub fn new(allowed_domains: Vec<String>, ignored_extensions: Vec<String>) -> Self {
        Self {
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.trim_start_matches('.').to_lowercase())
                .collect(),
            ignored_extensions: ignored_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Create a filter from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.allowed_domains.clone(),
            config.ignored_extensions.clone(),
        )
    }

    /// Whether the host is one of the allowed domains or a subdomain of one
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.allowed_domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Whether the path ends with a blocked extension
    pub fn is_ignored_path(&self, path: &str) -> bool {
        let path = path.to_lowercase();
        self.ignored_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    }

    /// Accepts a URL iff it parses, its host is allowed and its path is not blocked.
    /// Malformed URLs are rejected, never reported.
    pub fn is_valid(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };

        self.is_allowed_host(host) && !self.is_ignored_path(parsed.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> UrlFilter {
        UrlFilter::from_config(&CrawlerConfig::default())
    }

    #[test]
    fn test_normalize_strips_query_and_fragment() {
        assert_eq!(
            normalize("https://gsu.edu.tr/tr/duyurular?page=2#top").unwrap(),
            "https://gsu.edu.tr/tr/duyurular"
        );
        assert_eq!(
            normalize("https://gsu.edu.tr/tr/duyurular?page=2").unwrap(),
            normalize("https://gsu.edu.tr/tr/duyurular#x").unwrap()
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let urls = [
            "https://gsu.edu.tr/tr/",
            "https://gsu.edu.tr",
            "HTTPS://FBE.GSU.EDU.TR/tr/a b?c=d#e",
            "http://user@hukuk.gsu.edu.tr:8080/x/../y/?q",
            "https://gsu.edu.tr/dosya.pdf#page=3",
        ];
        for url in urls {
            let once = normalize(url).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice, "normalization of {url} is not idempotent");
        }
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert!(normalize("not a url").is_err());
        assert!(normalize("").is_err());
    }

    #[test]
    fn test_is_valid_domains() {
        let filter = filter();

        assert!(filter.is_valid("https://gsu.edu.tr/tr/about"));
        assert!(filter.is_valid("https://muhendislik.gsu.edu.tr/tr/"));
        assert!(!filter.is_valid("https://external.com"));
        assert!(!filter.is_valid("https://gsu.edu.tr.evil.com/tr/"));
        assert!(!filter.is_valid("https://notgsu.edu.tr/tr/"));
    }

    #[test]
    fn test_is_valid_rejects_off_domain_hosts() {
        let filter = filter();
        let hosts = [
            "example.com",
            "edu.tr",
            "gsu.edu.tr.example.com",
            "xgsu.edu.tr",
            "localhost",
            "127.0.0.1",
        ];
        for host in hosts {
            let url = format!("https://{host}/tr/");
            assert!(!filter.is_valid(&url), "{url} should be rejected");
        }
    }

    #[test]
    fn test_is_valid_extensions() {
        let filter = filter();

        assert!(!filter.is_valid("https://gsu.edu.tr/logo.PNG"));
        assert!(!filter.is_valid("https://gsu.edu.tr/static/site.css"));
        assert!(!filter.is_valid("https://gsu.edu.tr/archive.zip"));
        assert!(filter.is_valid("https://gsu.edu.tr/yonetmelik.pdf"));
        assert!(filter.is_valid("https://gsu.edu.tr/tr/"));
    }

    #[test]
    fn test_is_valid_rejects_malformed_and_non_http() {
        let filter = filter();

        assert!(!filter.is_valid("::::"));
        assert!(!filter.is_valid("mailto:info@gsu.edu.tr"));
        assert!(!filter.is_valid("javascript:void(0)"));
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(path_extension("/a/b/Rapor.PDF"), Some(".pdf".to_string()));
        assert_eq!(path_extension("/a/b/"), None);
        assert_eq!(path_extension("/a/b"), None);
        assert_eq!(path_extension("/a.b/c"), None);
    }
}
