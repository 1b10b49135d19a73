use crate::error::FeedError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Anything that can hand back one raw feed payload.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, FeedError>;
}

/// Client for the USGS GeoJSON summary feed.
pub struct UsgsApi {
    client: Client,
    url: String,
}

impl UsgsApi {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FeedSource for UsgsApi {
    async fn fetch(&self) -> Result<Value, FeedError> {
        debug!("Sending request to {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| FeedError::Decode(e.to_string()))?;

        debug!(
            "Received {} features",
            json.get("features")
                .and_then(|f| f.as_array())
                .map_or(0, |f| f.len())
        );
        Ok(json)
    }
}
