//! HTTP retriever for place datasets published as JSON.

use std::time::Duration;

use anyhow::Context;
use futures::future::BoxFuture;
use reqwest::{header, Client};
use tracing::{debug, warn};

use super::SourceError;
use crate::cache::PlacesRetriever;
use crate::models::Place;

/// HTTP request timeout in seconds.
/// Registries are small; a minute covers slow mirrors.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Fetches the full place list from a URL returning a JSON array.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, url))
    }

    /// Share an existing client (and its connection pool).
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<Vec<Place>, SourceError> {
        debug!(url = %self.url, "Fetching places");

        let response = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %self.url, %status, "Places request failed");
            return Err(SourceError::from_status(status, &body));
        }

        let body = response.text().await?;
        let places: Vec<Place> = serde_json::from_str(&body)?;
        debug!(url = %self.url, count = places.len(), "Fetched places");
        Ok(places)
    }
}

impl PlacesRetriever for HttpSource {
    fn retrieve(&self) -> BoxFuture<'_, anyhow::Result<Vec<Place>>> {
        Box::pin(async move {
            self.fetch()
                .await
                .with_context(|| format!("Failed to fetch places from {}", self.url))
        })
    }
}
