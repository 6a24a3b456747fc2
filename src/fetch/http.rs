use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use url::Url;

use super::{FetchPolicy, FetchedPage, PageFetcher};
use crate::extract;
use crate::filter::UrlFilter;

const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Extra wait after a 429 so the next request does not hit the same limit
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(30);

/// Plain HTTP fetcher. Good for server-rendered sites; pages that only build
/// their content from script need the WebDriver fetcher instead.
pub struct HttpFetcher {
    client: Client,
    filter: UrlFilter,
    policy: FetchPolicy,
}

impl HttpFetcher {
    pub fn new(filter: UrlFilter, policy: FetchPolicy) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(policy.timeout_secs))
            .redirect(Policy::limited(policy.max_redirects))
            .user_agent(&policy.user_agent)
            .build()?;
        Ok(Self {
            client,
            filter,
            policy,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Option<FetchedPage> {
        if !self.filter.allows(url) {
            ::log::warn!("Skipping invalid or blocked URL: {}", url);
            return None;
        }

        self.policy.politeness_pause().await;

        ::log::info!("Fetching {}", url);
        let response = match self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_VALUE)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header(REFERER, origin(url))
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                ::log::error!("Error fetching {}: {}", url, err);
                return None;
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            ::log::warn!("Rate limited (429) for {}, backing off", url);
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
            return None;
        }
        if !status.is_success() {
            ::log::error!("HTTP {} fetching {}", status, url);
            return None;
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("text/html"));
        if !is_html {
            ::log::warn!("Skipping non-HTML content at {}", url);
            return None;
        }

        let final_url = response.url().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                ::log::error!("Error reading body of {}: {}", url, err);
                return None;
            }
        };

        let extracted = extract::extract(&body, &final_url);
        Some(FetchedPage {
            url: final_url.to_string(),
            text: extracted.text,
            links: extracted.links,
        })
    }
}

/// Origin (scheme://host) sent as the Referer, like a browser following an
/// in-site link would
fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}
