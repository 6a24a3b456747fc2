use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::fetch::FetchPolicy;
use crate::filter::{UrlFilter, UrlFilterConfig};

/// Which fetch strategy the navigator uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Plain HTTP requests
    #[default]
    Http,

    /// Rendered pages through a WebDriver session
    Webdriver,
}

/// Configuration for the navigator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorConfig {
    /// Site the search starts from
    pub base_url: String,

    /// Maximum link-follow depth per question
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Confidence a lead must exceed (strictly) before it is followed
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,

    /// How many model-suggested links to keep per analyzed page
    #[serde(default = "default_max_next_links")]
    pub max_next_links: usize,

    /// Network politeness and safety settings
    #[serde(default)]
    pub fetch: FetchPolicy,

    /// Domains to block in addition to the built-in list
    #[serde(default)]
    pub blocked_domains: Vec<String>,

    /// URL exclude regexes in addition to the built-in asset patterns
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Which fetcher to use
    #[serde(default)]
    pub fetcher: FetcherKind,

    /// WebDriver endpoint, used when `fetcher` is `webdriver`
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

/// Default value for max_depth
fn default_max_depth() -> usize {
    20
}

/// Default value for min_confidence
fn default_min_confidence() -> u8 {
    30
}

/// Default value for max_next_links
fn default_max_next_links() -> usize {
    3
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl NavigatorConfig {
    /// Create a new configuration with default values
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            max_depth: default_max_depth(),
            min_confidence: default_min_confidence(),
            max_next_links: default_max_next_links(),
            fetch: FetchPolicy::default(),
            blocked_domains: Vec::new(),
            exclude_patterns: Vec::new(),
            fetcher: FetcherKind::default(),
            webdriver_url: default_webdriver_url(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the URL filter: built-in rules plus the configured extras
    pub fn url_filter(&self) -> Result<UrlFilter, regex::Error> {
        let mut filter_config = UrlFilterConfig::default();
        filter_config
            .blocked_domains
            .extend(self.blocked_domains.iter().cloned());
        filter_config
            .exclude_patterns
            .extend(self.exclude_patterns.iter().cloned());
        UrlFilter::new(filter_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_minimal_json_gets_defaults() {
        let config = NavigatorConfig::from_json(r#"{"base_url": "https://example.com"}"#).unwrap();
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.min_confidence, 30);
        assert_eq!(config.max_next_links, 3);
        assert_eq!(config.fetcher, FetcherKind::Http);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.fetch.delay_min_ms, 2000);
        assert_eq!(config.fetch.delay_max_ms, 5000);
    }

    #[test]
    fn test_full_json_overrides() {
        let config = NavigatorConfig::from_json(
            r#"{
                "base_url": "https://example.com",
                "max_depth": 5,
                "min_confidence": 50,
                "fetcher": "webdriver",
                "webdriver_url": "http://localhost:9515",
                "fetch": {"delay_min_ms": 0, "delay_max_ms": 0, "timeout_secs": 3},
                "blocked_domains": ["ads.example.net"],
                "exclude_patterns": ["/tracking/"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.min_confidence, 50);
        assert_eq!(config.fetcher, FetcherKind::Webdriver);
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert_eq!(config.fetch.timeout_secs, 3);
        assert_eq!(config.fetch.max_redirects, 5);
        assert_eq!(config.blocked_domains, vec!["ads.example.net"]);
    }

    #[test]
    fn test_url_filter_keeps_builtin_rules() {
        let mut config = NavigatorConfig::new("https://example.com");
        config.blocked_domains.push("ads.example.net".to_string());
        config.exclude_patterns.push(r"/tracking/".to_string());

        let filter = config.url_filter().unwrap();

        // Built-in rules still apply
        let facebook = Url::parse("https://facebook.com/page").unwrap();
        assert!(!filter.allows(&facebook));
        let asset = Url::parse("https://example.com/logo.svg").unwrap();
        assert!(!filter.allows(&asset));

        // Configured extras apply on top
        let ads = Url::parse("https://ads.example.net/banner").unwrap();
        assert!(!filter.allows(&ads));
        let tracking = Url::parse("https://example.com/tracking/pixel").unwrap();
        assert!(!filter.allows(&tracking));
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let err = NavigatorConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
