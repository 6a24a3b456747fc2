use std::time::Duration;

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;

use super::{FetchPolicy, FetchedPage, PageFetcher};
use crate::extract;
use crate::filter::UrlFilter;

/// Fetcher that renders pages through a WebDriver session, for sites whose
/// content only exists after script runs. Connects lazily on the first fetch.
pub struct WebDriverFetcher {
    webdriver_url: String,
    filter: UrlFilter,
    policy: FetchPolicy,
    client: Mutex<Option<Client>>,
}

impl WebDriverFetcher {
    /// `webdriver_url` can be overridden with the WEBDRIVER_URL environment
    /// variable
    pub fn new(webdriver_url: impl Into<String>, filter: UrlFilter, policy: FetchPolicy) -> Self {
        let mut webdriver_url = webdriver_url.into();
        if let Ok(from_env) = std::env::var("WEBDRIVER_URL") {
            if !from_env.is_empty() {
                webdriver_url = from_env;
            }
        }

        Self {
            webdriver_url,
            filter,
            policy,
            client: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Option<Client> {
        match ClientBuilder::native().connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
                Some(client)
            }
            Err(e) => {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
                ::log::error!(
                    "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
                );
                None
            }
        }
    }

    /// Navigate and pull the rendered source plus the post-redirect URL
    async fn navigate(
        &self,
        client: &Client,
        url: &Url,
    ) -> Result<(String, Url), fantoccini::error::CmdError> {
        client.goto(url.as_str()).await?;
        let final_url = client.current_url().await?;
        let source = client.source().await?;
        Ok((source, final_url))
    }

    /// Close the WebDriver session if one was opened
    pub async fn shutdown(&self) {
        let mut guard = self.client.lock().await;
        if let Some(client) = guard.take() {
            if let Err(e) = client.close().await {
                ::log::warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn fetch(&self, url: &Url) -> Option<FetchedPage> {
        if !self.filter.allows(url) {
            ::log::warn!("Skipping invalid or blocked URL: {}", url);
            return None;
        }

        self.policy.politeness_pause().await;

        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(client) = guard.as_mut() else {
            return None;
        };

        let request_timeout = Duration::from_secs(self.policy.timeout_secs);
        let mut fetched = None;

        for attempt in 0..2 {
            if attempt > 0 {
                // The session sometimes dies under the browser; reconnect once
                ::log::warn!("Attempting to reconnect WebDriver session");
                match self.connect().await {
                    Some(new_client) => *client = new_client,
                    None => break,
                }
            }

            match timeout(request_timeout, self.navigate(client, url)).await {
                Ok(Ok((source, final_url))) => {
                    fetched = Some((source, final_url));
                    break;
                }
                Ok(Err(e)) => {
                    if lost_session(&e) && attempt == 0 {
                        ::log::warn!("Lost WebDriver session while fetching {}", url);
                        continue;
                    }
                    ::log::error!("Failed to fetch {} through WebDriver: {}", url, e);
                    break;
                }
                Err(_) => {
                    ::log::error!("Timeout fetching {} through WebDriver", url);
                    break;
                }
            }
        }

        let (source, final_url) = fetched?;
        let extracted = extract::extract(&source, &final_url);
        Some(FetchedPage {
            url: final_url.to_string(),
            text: extracted.text,
            links: extracted.links,
        })
    }
}

fn lost_session(error: &fantoccini::error::CmdError) -> bool {
    error.to_string().contains("Unable to find session")
}
