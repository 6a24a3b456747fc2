use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for URL filtering during a search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Domains that are never fetched. Matched as host suffixes, so
    /// `facebook.com` also covers `www.facebook.com`.
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,

    /// Regex patterns for URLs to exclude
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// Social platforms the original agent refuses to wander into
fn default_blocked_domains() -> Vec<String> {
    vec!["facebook.com".to_string(), "twitter.com".to_string()]
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        // Asset file types that carry no answerable text
        r"\.(jpg|jpeg|png|gif|css|js|ico|woff|woff2|ttf|eot|svg|pdf)$".to_string(),
    ]
}

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            blocked_domains: default_blocked_domains(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// URL filter that decides which links are eligible targets for a visit
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    exclude_regexes: Vec<Regex>,
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new(UrlFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            config,
            exclude_regexes,
        })
    }

    /// Determine whether a URL may be fetched at all
    pub fn allows(&self, url: &Url) -> bool {
        // Only web pages; mailto:, ftp:, javascript: and friends are out
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if self.is_blocked_domain(url) {
            return false;
        }

        let url_str = url.as_str();
        for regex in &self.exclude_regexes {
            if regex.is_match(url_str) {
                return false;
            }
        }

        true
    }

    /// Check the host against the blocked-domain suffix list
    fn is_blocked_domain(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        self.config.blocked_domains.iter().any(|domain| {
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }
}

/// Parse a link into the canonical form used for explored-set and page-cache
/// keys. Fragments are stripped so `/page` and `/page#section` count as the
/// same page.
pub fn parse_and_normalize(link: &str) -> Option<Url> {
    let mut url = Url::parse(link).ok()?;
    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_excludes_assets() {
        let filter = UrlFilter::default();

        let image_url = Url::parse("https://example.com/image.jpg").unwrap();
        assert!(!filter.allows(&image_url));

        let stylesheet = Url::parse("https://example.com/theme.css").unwrap();
        assert!(!filter.allows(&stylesheet));

        let pdf = Url::parse("https://example.com/brochure.pdf").unwrap();
        assert!(!filter.allows(&pdf));

        let page = Url::parse("https://example.com/page.html").unwrap();
        assert!(filter.allows(&page));
    }

    #[test]
    fn test_blocked_domains_match_suffixes() {
        let filter = UrlFilter::default();

        let blocked = Url::parse("https://facebook.com/somecompany").unwrap();
        assert!(!filter.allows(&blocked));

        let subdomain = Url::parse("https://www.facebook.com/somecompany").unwrap();
        assert!(!filter.allows(&subdomain));

        let twitter = Url::parse("https://twitter.com/somecompany").unwrap();
        assert!(!filter.allows(&twitter));

        // Suffix matching must respect the dot boundary
        let lookalike = Url::parse("https://notfacebook.com/page").unwrap();
        assert!(filter.allows(&lookalike));
    }

    #[test]
    fn test_non_web_schemes_rejected() {
        let filter = UrlFilter::default();

        let mailto = Url::parse("mailto:info@example.com").unwrap();
        assert!(!filter.allows(&mailto));

        let ftp = Url::parse("ftp://example.com/file").unwrap();
        assert!(!filter.allows(&ftp));

        let http = Url::parse("http://example.com/").unwrap();
        assert!(filter.allows(&http));
    }

    #[test]
    fn test_custom_exclude_patterns() {
        let config = UrlFilterConfig {
            blocked_domains: vec![],
            exclude_patterns: vec![r"/drafts/".to_string()],
        };
        let filter = UrlFilter::new(config).unwrap();

        let draft = Url::parse("https://example.com/drafts/post").unwrap();
        assert!(!filter.allows(&draft));

        let published = Url::parse("https://example.com/blog/post").unwrap();
        assert!(filter.allows(&published));
    }

    #[test]
    fn test_parse_and_normalize_strips_fragments() {
        let url = parse_and_normalize("https://example.com/page#section").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");

        let plain = parse_and_normalize("https://example.com/page").unwrap();
        assert_eq!(url, plain);

        assert!(parse_and_normalize("not a url").is_none());
    }
}
