use crate::error::AppError;
use crate::models::cache::CacheStatus;
use crate::models::event::Event;
use crate::services::feed_cache::FeedCache;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<FeedCache>,
}

impl AppState {
    pub fn new(cache: FeedCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    refresh: Option<String>,
    force: Option<String>,
}

impl FeedQuery {
    pub fn wants_refresh(&self) -> bool {
        self.refresh.as_deref() == Some("true") || self.force.as_deref() == Some("true")
    }
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub source: CacheStatus,
    #[serde(rename = "cachedUntil")]
    pub cached_until: i64,
    pub data: Arc<Vec<Event>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(rename = "cachedUntil")]
    pub cached_until: i64,
}

pub async fn earthquakes(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let snapshot = state.cache.get(query.wants_refresh()).await?;
    debug!(
        "Serving {} events from {:?}",
        snapshot.data.len(),
        snapshot.status
    );

    Ok(Json(FeedResponse {
        source: snapshot.status,
        cached_until: snapshot.expires_at,
        data: snapshot.data,
    }))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        cached_until: state.cache.cached_until(),
    })
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/earthquakes", get(earthquakes))
        .route("/api/status", get(status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The API router with a static file fallback, when `static_dir` exists.
pub fn create_app(state: AppState, static_dir: &str) -> Router {
    let router = create_router(state);
    if Path::new(static_dir).is_dir() {
        router.fallback_service(ServeDir::new(static_dir))
    } else {
        debug!("Static directory {} not found, serving API only", static_dir);
        router
    }
}
