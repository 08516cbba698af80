//! Series sources.
//!
//! [`SeriesSource`] is the boundary between the transformation layer and whatever serves raw
//! records. [`HttpSource`] queries the stats REST API.

use crate::{config::StatsConfig, endpoint::Endpoint, error::FetchError, window::TimeWindow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches the raw records of one endpoint over a window.
///
/// One best-effort request per call; no retries.
#[async_trait]
pub trait SeriesSource: Send + Sync + 'static {
    async fn fetch(&self, endpoint: &Endpoint, window: TimeWindow)
    -> Result<Vec<Value>, FetchError>;
}

/// [`SeriesSource`] backed by the stats REST API.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    api_url: Url,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(config: &StatsConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            timeout: config.request_timeout,
        }
    }

    pub fn request_url(&self, endpoint: &Endpoint, window: TimeWindow) -> Result<Url, FetchError> {
        endpoint.url(&self.api_url, window)
    }
}

#[async_trait]
impl SeriesSource for HttpSource {
    async fn fetch(
        &self,
        endpoint: &Endpoint,
        window: TimeWindow,
    ) -> Result<Vec<Value>, FetchError> {
        let url = self.request_url(endpoint, window)?;
        debug!(%endpoint, %url, "requesting series");

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let records = response.json::<Vec<Value>>().await?;
        debug!(%endpoint, records = records.len(), "series received");

        Ok(records)
    }
}
