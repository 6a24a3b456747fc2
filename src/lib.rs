//! LLM-guided website question answering.
//!
//! Given a base URL and one or more questions, the [`Navigator`] walks the
//! site one page at a time: it fetches a page, asks a completion model whether
//! the page answers the question, and follows model-suggested links until it
//! finds an answer or runs out of budget. Page content is cached across
//! questions; analysis is always fresh per question.

pub mod completion;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod navigator;
mod prompts;
pub mod results;
pub mod schema;

// Re-export commonly used types for convenience
pub use config::{ConfigError, FetcherKind, NavigatorConfig};
pub use navigator::{Navigator, NavigatorError, PageCache};
pub use results::{Answer, Question, QuestionInput, SearchOutcome, answer_map};

use std::sync::Arc;
use thiserror::Error;

use completion::{CompletionError, CompletionService, OpenAiCompletion};
use fetch::{HttpFetcher, PageFetcher, WebDriverFetcher};

/// Errors raised while assembling a [`Navigator`]
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL exclude pattern: {0}")]
    Filter(#[from] regex::Error),

    #[error("Failed to build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to set up the completion backend: {0}")]
    Completion(#[from] CompletionError),
}

/// Builder assembling a [`Navigator`] from configuration plus optional
/// collaborator overrides.
///
/// By default the completion backend comes from the environment
/// (`OPENAI_API_KEY` and friends) and the fetcher from the configured
/// [`FetcherKind`]; tests and embedders can inject their own implementations
/// of either trait instead.
pub struct NavigatorBuilder {
    config: NavigatorConfig,
    completion: Option<Arc<dyn CompletionService>>,
    fetcher: Option<Arc<dyn PageFetcher>>,
}

impl NavigatorBuilder {
    /// Create a new builder targeting the given site
    pub fn new(base_url: &str) -> Self {
        Self {
            config: NavigatorConfig::new(base_url),
            completion: None,
            fetcher: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(
        self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, ConfigError> {
        let config = NavigatorConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a JSON string
    pub fn with_config_str(self, config_str: &str) -> Result<Self, ConfigError> {
        let config = NavigatorConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    /// Set the site the search starts from
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    /// Set the maximum link-follow depth per question
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the confidence a lead must exceed before it is followed
    pub fn with_min_confidence(mut self, min_confidence: u8) -> Self {
        self.config.min_confidence = min_confidence;
        self
    }

    /// Choose between the HTTP and WebDriver fetch strategies
    pub fn with_fetcher_kind(mut self, kind: FetcherKind) -> Self {
        self.config.fetcher = kind;
        self
    }

    /// Use a specific completion backend instead of the environment default
    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Use a specific page fetcher instead of building one from the config
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Assemble the navigator
    pub fn build(self) -> Result<Navigator, BuildError> {
        let completion: Arc<dyn CompletionService> = match self.completion {
            Some(completion) => completion,
            None => Arc::new(OpenAiCompletion::from_env()?),
        };

        let fetcher: Arc<dyn PageFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let filter = self.config.url_filter()?;
                let policy = self.config.fetch.clone();
                match self.config.fetcher {
                    FetcherKind::Http => Arc::new(HttpFetcher::new(filter, policy)?),
                    FetcherKind::Webdriver => Arc::new(WebDriverFetcher::new(
                        self.config.webdriver_url.clone(),
                        filter,
                        policy,
                    )),
                }
            }
        };

        Ok(Navigator::new(self.config, completion, fetcher))
    }
}
