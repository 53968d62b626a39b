use std::time::Duration;

use otklik_core::error::EngineError;
use otklik_core::traits::PageFetcher;
use reqwest::Client;

use crate::normalize::page_url;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// HTTP listing-page fetcher using reqwest.
///
/// Downloads raw search-result HTML with a browser-like User-Agent and a
/// configurable timeout. Pagination is expressed as a `page` query parameter
/// appended to the normalized base URL.
#[derive(Clone)]
pub struct ReqwestPageFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestPageFetcher {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, EngineError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| EngineError::Http(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl PageFetcher for ReqwestPageFetcher {
    async fn fetch_page(&self, base_url: &str, page: u32) -> Result<String, EngineError> {
        let url = page_url(base_url, page)?;

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                EngineError::Network(format!("Connection failed: {e}"))
            } else {
                EngineError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Http(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| EngineError::Http(format!("Failed to read response body: {e}")))
    }
}
