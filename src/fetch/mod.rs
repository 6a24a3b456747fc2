pub mod http;
pub mod webdriver;

pub use http::HttpFetcher;
pub use webdriver::WebDriverFetcher;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

/// One successfully fetched page: where we ended up, what it says, and where
/// it points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// Readable text extracted from the page
    pub text: String,

    /// Absolute outgoing links
    pub links: Vec<String>,
}

impl FetchedPage {
    /// Compose the model-facing document that gets cached and analyzed
    pub fn into_document(self) -> String {
        format!(
            "Page Content:\n{}\n\nAvailable Links:\n{}",
            self.text,
            self.links.join("\n")
        )
    }
}

/// Fetches one page. `None` covers everything a search should simply step
/// past: disallowed URLs, non-HTML responses, transport errors and timeouts.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Option<FetchedPage>;
}

/// Network politeness and safety settings shared by the fetchers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// Lower bound of the pause before each network fetch, in milliseconds
    #[serde(default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    /// Upper bound of the pause before each network fetch, in milliseconds
    #[serde(default = "default_delay_max_ms")]
    pub delay_max_ms: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many redirects to follow before giving up
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_delay_min_ms() -> u64 {
    2000
}

fn default_delay_max_ms() -> u64 {
    5000
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    5
}

fn default_user_agent() -> String {
    // Plenty of sites serve bots a stripped page, so look like a browser
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            delay_min_ms: default_delay_min_ms(),
            delay_max_ms: default_delay_max_ms(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchPolicy {
    /// Policy without the politeness pause, for local servers and tests
    pub fn no_delay() -> Self {
        Self {
            delay_min_ms: 0,
            delay_max_ms: 0,
            ..Self::default()
        }
    }

    /// The pause to apply before the next fetch, or None when the window is
    /// zero
    fn delay_ms(&self) -> Option<u64> {
        if self.delay_min_ms == 0 && self.delay_max_ms == 0 {
            return None;
        }
        if self.delay_min_ms >= self.delay_max_ms {
            return Some(self.delay_min_ms);
        }
        Some(rand::thread_rng().gen_range(self.delay_min_ms..=self.delay_max_ms))
    }

    /// Sleep a random time inside the configured window before touching the
    /// network
    pub async fn politeness_pause(&self) {
        if let Some(ms) = self.delay_ms() {
            ::log::debug!("Politeness pause: {} ms", ms);
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_composition() {
        let page = FetchedPage {
            url: "https://example.com/".to_string(),
            text: "Heading: Welcome\nWe build things.".to_string(),
            links: vec![
                "https://example.com/about".to_string(),
                "https://example.com/contact".to_string(),
            ],
        };
        assert_eq!(
            page.into_document(),
            "Page Content:\nHeading: Welcome\nWe build things.\n\nAvailable Links:\nhttps://example.com/about\nhttps://example.com/contact"
        );
    }

    #[test]
    fn test_delay_window() {
        let policy = FetchPolicy::no_delay();
        assert_eq!(policy.delay_ms(), None);

        let fixed = FetchPolicy {
            delay_min_ms: 300,
            delay_max_ms: 300,
            ..FetchPolicy::default()
        };
        assert_eq!(fixed.delay_ms(), Some(300));

        let ranged = FetchPolicy::default();
        for _ in 0..50 {
            let ms = ranged.delay_ms().unwrap();
            assert!((2000..=5000).contains(&ms));
        }
    }

    #[test]
    fn test_policy_defaults() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.timeout_secs, 10);
        assert_eq!(policy.max_redirects, 5);
        assert!(policy.user_agent.starts_with("Mozilla/5.0"));
    }
}
