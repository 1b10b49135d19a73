//! Single-slot TTL cache in front of the upstream feed.
//!
//! The slot holds an `Arc<CacheEntry>` that is swapped as a whole on every
//! successful fetch. Readers clone the `Arc` and drop the lock immediately, so
//! data and expiry are always observed together.

use crate::api::usgs::FeedSource;
use crate::error::FeedError;
use crate::models::cache::{CacheEntry, CacheSnapshot, CacheStatus};
use crate::services::normalizer::normalize;
use crate::utils::clock::Clock;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// The cached entry plus a count of finished upstream attempts, read and
/// written under one lock so a reader sees both from the same moment.
#[derive(Default)]
struct Slot {
    entry: Option<Arc<CacheEntry>>,
    attempts: u64,
    last_failure: Option<String>,
}

/// What a request saw of the slot when it started.
struct Observed {
    entry: Option<Arc<CacheEntry>>,
    attempts: u64,
}

pub struct FeedCache {
    source: Arc<dyn FeedSource>,
    clock: Arc<dyn Clock>,
    ttl_millis: i64,
    slot: RwLock<Slot>,
    fetch_lock: Option<Mutex<()>>,
}

impl FeedCache {
    /// A TTL too long to express in `i64` milliseconds is clamped to `i64::MAX`.
    pub fn new(source: Arc<dyn FeedSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            slot: RwLock::new(Slot::default()),
            fetch_lock: None,
        }
    }

    /// Coalesce concurrent refreshes into one upstream fetch.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.fetch_lock = enabled.then(|| Mutex::new(()));
        self
    }

    pub async fn get(&self, force_refresh: bool) -> Result<CacheSnapshot, FeedError> {
        let observed = self.observe();
        if !force_refresh {
            let now = self.clock.now_millis();
            if let Some(entry) = observed.entry.as_ref().filter(|e| e.expires_at > now) {
                debug!("Cache hit, valid until {}", entry.expires_at);
                return Ok(CacheSnapshot::from_entry(CacheStatus::Cache, entry));
            }
        }

        debug!(force_refresh, "Cache miss, fetching upstream");
        match self.refresh(&observed).await {
            Ok(entry) => Ok(CacheSnapshot::from_entry(CacheStatus::Live, &entry)),
            Err(e) => match self.current() {
                Some(entry) => {
                    warn!("Upstream fetch failed, serving stale cache: {}", e);
                    Ok(CacheSnapshot::from_entry(CacheStatus::Stale, &entry))
                }
                None => {
                    error!("Upstream fetch failed with nothing cached: {}", e);
                    Err(e)
                }
            },
        }
    }

    /// Expiry of the current entry in epoch millis, `0` if nothing was ever cached.
    pub fn cached_until(&self) -> i64 {
        self.current().map_or(0, |e| e.expires_at)
    }

    fn current(&self) -> Option<Arc<CacheEntry>> {
        self.observe().entry
    }

    fn observe(&self) -> Observed {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        Observed {
            entry: slot.entry.clone(),
            attempts: slot.attempts,
        }
    }

    async fn refresh(&self, observed: &Observed) -> Result<Arc<CacheEntry>, FeedError> {
        let Some(lock) = &self.fetch_lock else {
            return self.fetch_and_store().await;
        };

        let _guard = lock.lock().await;
        if let Some(outcome) = self.finished_since(observed) {
            return outcome;
        }
        self.fetch_and_store().await
    }

    /// The outcome of an attempt that finished after `observed` was taken, if
    /// any: a replaced entry is shared, a failure is passed on without going
    /// upstream again.
    fn finished_since(&self, observed: &Observed) -> Option<Result<Arc<CacheEntry>, FeedError>> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        if slot.attempts == observed.attempts {
            return None;
        }

        let replaced = match (&slot.entry, &observed.entry) {
            (Some(now), Some(before)) => !Arc::ptr_eq(now, before),
            (Some(_), None) => true,
            (None, _) => false,
        };
        match &slot.entry {
            Some(entry) if replaced => {
                debug!("Joined a fetch that finished while waiting");
                Some(Ok(Arc::clone(entry)))
            }
            _ => Some(Err(FeedError::Shared(
                slot.last_failure.clone().unwrap_or_default(),
            ))),
        }
    }

    async fn fetch_and_store(&self) -> Result<Arc<CacheEntry>, FeedError> {
        let fetched = self.source.fetch().await;

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.attempts += 1;

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                slot.last_failure = Some(e.to_string());
                return Err(e);
            }
        };

        let entry = Arc::new(CacheEntry {
            data: Arc::new(normalize(&raw)),
            expires_at: self.clock.now_millis().saturating_add(self.ttl_millis),
        });
        slot.entry = Some(Arc::clone(&entry));
        slot.last_failure = None;
        drop(slot);

        info!(
            "Fetched {} events, cached until {}",
            entry.data.len(),
            entry.expires_at
        );
        Ok(entry)
    }
}
