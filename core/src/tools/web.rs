//! HTTP fetch for api commands

use crate::error::DispatchError;
use async_trait::async_trait;
use std::time::Duration;

/// User agent string for web requests
const USER_AGENT: &str = concat!("cmdbot/", env!("CARGO_PKG_VERSION"));

/// Fetches the body of a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, DispatchError>;
}

/// `Fetcher` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, DispatchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DispatchError::Fetch(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}
