use crate::error::ClientError;
use crate::models::event::Event;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// What the dashboard gets back from `/api/earthquakes`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSnapshot {
    #[serde(default)]
    pub source: String,
    #[serde(rename = "cachedUntil", default)]
    pub cached_until: i64,
    #[serde(default)]
    pub data: Vec<Event>,
}

/// The dashboard's view of the server.
#[async_trait]
pub trait EventFeed: Send + Sync {
    async fn fetch_events(&self, refresh: bool) -> Result<FeedSnapshot, ClientError>;
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn events_url(&self, refresh: bool) -> String {
        if refresh {
            format!("{}/api/earthquakes?refresh=true", self.base_url)
        } else {
            format!("{}/api/earthquakes", self.base_url)
        }
    }
}

#[async_trait]
impl EventFeed for ApiClient {
    async fn fetch_events(&self, refresh: bool) -> Result<FeedSnapshot, ClientError> {
        let url = self.events_url(refresh);
        debug!("Sending request to {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let snapshot: FeedSnapshot = response.json().await?;
        debug!(
            "Got {} events (source={}, cachedUntil={})",
            snapshot.data.len(),
            snapshot.source,
            snapshot.cached_until
        );
        Ok(snapshot)
    }
}
