use crate::models::event::Event;
use serde::Serialize;
use std::sync::Arc;

/// One normalized snapshot of the feed. Replaced as a whole, never mutated.
#[derive(Debug)]
pub struct CacheEntry {
    pub data: Arc<Vec<Event>>,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

/// Where a cache answer came from. The serde names are the wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheStatus {
    #[serde(rename = "cache")]
    Cache,
    #[serde(rename = "usgs")]
    Live,
    #[serde(rename = "cache-stale")]
    Stale,
}

#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub status: CacheStatus,
    pub data: Arc<Vec<Event>>,
    pub expires_at: i64,
}

impl CacheSnapshot {
    pub fn from_entry(status: CacheStatus, entry: &CacheEntry) -> Self {
        Self {
            status,
            data: Arc::clone(&entry.data),
            expires_at: entry.expires_at,
        }
    }
}
