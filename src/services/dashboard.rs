//! Client-side dashboard state.
//!
//! Holds the last fetched events, the user's filter, the filtered view and the
//! marker layer. Any change to events or criteria recomputes the filtered set
//! and re-renders every marker.

use crate::api::feed_client::{EventFeed, FeedSnapshot};
use crate::error::ClientError;
use crate::models::event::Event;
use crate::models::filter::FilterCriteria;
use crate::services::filter::filter_events;
use crate::services::marker_renderer::{render_markers, MarkerLayer};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

/// The event list shows at most this many rows.
pub const LIST_LIMIT: usize = 200;

pub struct Dashboard<L: MarkerLayer> {
    feed: Arc<dyn EventFeed>,
    layer: L,
    events: Vec<Event>,
    criteria: FilterCriteria,
    filtered: Vec<Event>,
    last_updated: Option<DateTime<Utc>>,
    loading: bool,
}

impl<L: MarkerLayer> Dashboard<L> {
    pub fn new(feed: Arc<dyn EventFeed>, layer: L) -> Self {
        Self {
            feed,
            layer,
            events: Vec::new(),
            criteria: FilterCriteria::default(),
            filtered: Vec::new(),
            last_updated: None,
            loading: false,
        }
    }

    /// Fetch from the server. On failure the previous events stay in place.
    /// Returns whether the fetch succeeded.
    pub async fn refresh(&mut self, force: bool) -> bool {
        let feed = self.begin_refresh();
        let result = feed.fetch_events(force).await;
        self.finish_refresh(result)
    }

    /// Mark a fetch as in flight and hand out the feed to run it on. The
    /// caller passes the result to [`Dashboard::finish_refresh`].
    pub fn begin_refresh(&mut self) -> Arc<dyn EventFeed> {
        self.loading = true;
        Arc::clone(&self.feed)
    }

    /// Apply a fetch result. `loading` is cleared either way.
    pub fn finish_refresh(&mut self, result: Result<FeedSnapshot, ClientError>) -> bool {
        self.loading = false;

        match result {
            Ok(snapshot) => {
                info!(
                    "Loaded {} events (source={})",
                    snapshot.data.len(),
                    snapshot.source
                );
                self.events = snapshot.data;
                self.last_updated = Some(Utc::now());
                self.recompute();
                true
            }
            Err(e) => {
                error!("Failed to fetch events: {}", e);
                false
            }
        }
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.recompute();
    }

    pub fn set_min_mag(&mut self, min_mag: f64) {
        self.set_criteria(FilterCriteria {
            min_mag,
            ..self.criteria
        });
    }

    pub fn set_max_depth(&mut self, max_depth_km: Option<f64>) {
        self.set_criteria(FilterCriteria {
            max_depth_km,
            ..self.criteria
        });
    }

    fn recompute(&mut self) {
        self.filtered = filter_events(&self.events, &self.criteria);
        let markers = render_markers(&mut self.layer, &self.filtered);
        debug!(
            "{} of {} events pass the filter, {} on the map",
            self.filtered.len(),
            self.events.len(),
            markers
        );
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn filtered(&self) -> &[Event] {
        &self.filtered
    }

    /// Rows for the event list.
    pub fn visible_list(&self) -> &[Event] {
        &self.filtered[..self.filtered.len().min(LIST_LIMIT)]
    }

    pub fn total(&self) -> usize {
        self.filtered.len()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.criteria
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

/// A line typed into the watch prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh,
    MinMag(f64),
    MaxDepth(Option<f64>),
    Show,
    Exit,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut parts = input.split_whitespace();
        let head = parts.next().unwrap_or("");
        let arg = parts.next();

        match (head, arg) {
            ("r" | "refresh", None) => Ok(Command::Refresh),
            ("" | "show", None) => Ok(Command::Show),
            ("exit" | "quit", None) => Ok(Command::Exit),
            ("min", Some(value)) => parse_finite(value)
                .map(Command::MinMag)
                .ok_or_else(|| format!("not a magnitude: {}", value)),
            ("depth", Some("any")) => Ok(Command::MaxDepth(None)),
            ("depth", Some(value)) => parse_finite(value)
                .map(|d| Command::MaxDepth(Some(d)))
                .ok_or_else(|| format!("not a depth: {}", value)),
            _ => Err(format!("unknown command: {}", input.trim())),
        }
    }
}

fn parse_finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EVENT_SOURCE;
    use crate::services::marker_renderer::ClusterGroup;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn event(id: &str, mag: Option<f64>, depth_km: Option<f64>) -> Event {
        Event {
            id: id.into(),
            mag,
            depth_km,
            time: "2024-05-01T12:00:00.000Z".into(),
            lat: Some(12.0),
            lon: Some(122.0),
            place: "Mindanao".into(),
            source: EVENT_SOURCE.into(),
        }
    }

    /// Replays canned responses and records the refresh flag of each call.
    struct FakeFeed {
        responses: Mutex<VecDeque<Option<Vec<Event>>>>,
        requests: Mutex<Vec<bool>>,
    }

    impl FakeFeed {
        fn new(responses: Vec<Option<Vec<Event>>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl EventFeed for FakeFeed {
        async fn fetch_events(&self, refresh: bool) -> Result<FeedSnapshot, ClientError> {
            self.requests.lock().unwrap().push(refresh);
            match self.responses.lock().unwrap().pop_front().flatten() {
                Some(data) => Ok(FeedSnapshot {
                    source: "usgs".into(),
                    cached_until: 0,
                    data,
                }),
                None => Err(ClientError::Status {
                    status: 500,
                    message: "failed to fetch feed".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_loads_filters_and_renders() {
        let feed = FakeFeed::new(vec![Some(vec![
            event("a", Some(1.0), Some(10.0)),
            event("b", None, None),
        ])]);
        let mut dash = Dashboard::new(feed.clone(), ClusterGroup::new());

        assert!(dash.refresh(false).await);
        assert_eq!(dash.total(), 2);
        assert_eq!(dash.layer().len(), 2);
        assert!(dash.last_updated().is_some());
        assert!(!dash.is_loading());
        assert_eq!(*feed.requests.lock().unwrap(), vec![false]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_events() {
        let feed = FakeFeed::new(vec![Some(vec![event("a", Some(3.0), Some(10.0))]), None]);
        let mut dash = Dashboard::new(feed.clone(), ClusterGroup::new());

        dash.refresh(false).await;
        let stamped = dash.last_updated();
        assert!(!dash.refresh(true).await);

        assert!(!dash.is_loading());
        assert_eq!(dash.events().len(), 1);
        assert_eq!(dash.layer().len(), 1);
        assert_eq!(dash.last_updated(), stamped);
        assert_eq!(*feed.requests.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_loading_flag_spans_the_fetch() {
        let feed = FakeFeed::new(vec![None]);
        let mut dash = Dashboard::new(feed, ClusterGroup::new());
        assert!(!dash.is_loading());

        let in_flight = dash.begin_refresh();
        assert!(dash.is_loading());

        let result = in_flight.fetch_events(true).await;
        assert!(!dash.finish_refresh(result));
        assert!(!dash.is_loading());
        assert!(dash.last_updated().is_none());
    }

    #[tokio::test]
    async fn test_criteria_edit_rerenders_markers() {
        let feed = FakeFeed::new(vec![Some(vec![
            event("a", Some(4.9), Some(50.0)),
            event("b", Some(5.1), Some(200.0)),
            event("c", Some(6.0), Some(10.0)),
        ])]);
        let mut dash = Dashboard::new(feed, ClusterGroup::new());
        dash.refresh(false).await;

        dash.set_min_mag(5.0);
        let ids: Vec<&str> = dash.filtered().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(dash.total(), 2);
        dash.set_max_depth(Some(100.0));
        let ids: Vec<&str> = dash.layer().markers().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);

        dash.set_criteria(FilterCriteria::default());
        assert_eq!(dash.layer().len(), 3);
    }

    #[tokio::test]
    async fn test_visible_list_is_capped() {
        let many: Vec<Event> = (0..250).map(|i| event(&format!("e{i}"), None, None)).collect();
        let feed = FakeFeed::new(vec![Some(many)]);
        let mut dash = Dashboard::new(feed, ClusterGroup::new());
        dash.refresh(false).await;

        assert_eq!(dash.total(), 250);
        assert_eq!(dash.visible_list().len(), LIST_LIMIT);
        assert_eq!(dash.visible_list()[0].id, "e0");
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("r"), Ok(Command::Refresh));
        assert_eq!(Command::parse("  "), Ok(Command::Show));
        assert_eq!(Command::parse("min 4.5"), Ok(Command::MinMag(4.5)));
        assert_eq!(Command::parse("depth 70"), Ok(Command::MaxDepth(Some(70.0))));
        assert_eq!(Command::parse("depth any"), Ok(Command::MaxDepth(None)));
        assert_eq!(Command::parse("exit"), Ok(Command::Exit));
        assert!(Command::parse("min big").is_err());
        assert!(Command::parse("min nan").is_err());
        assert!(Command::parse("min inf").is_err());
        assert!(Command::parse("depth NaN").is_err());
        assert!(Command::parse("depth -inf").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
