//! Environment-driven settings for the server and the watch dashboard.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Unset variables fall back to the defaults below.

use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_day.geojson";

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_url: String,
    pub cache_ttl: Duration,
    pub port: u16,
    pub static_dir: String,
    pub single_flight: bool,
    pub upstream_timeout: Duration,
    pub api_base: String,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            cache_ttl: Duration::from_secs(300),
            port: 3000,
            static_dir: "public".to_string(),
            single_flight: false,
            upstream_timeout: Duration::from_secs(10),
            api_base: "http://localhost:3000".to_string(),
            poll_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("USGS_FEED").filter(|v| !v.trim().is_empty()) {
            config.feed_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("CACHE_TTL") {
            let ttl = Duration::from_secs(parse_u64(&raw, "CACHE_TTL")?);
            if i64::try_from(ttl.as_millis()).is_err() {
                return Err(ConfigError::Invalid {
                    name: "CACHE_TTL",
                    expected: "a TTL whose milliseconds fit in i64",
                    value: raw,
                });
            }
            config.cache_ttl = ttl;
        }
        if let Some(raw) = lookup("PORT") {
            config.port = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "a port number",
                value: raw.clone(),
            })?;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            config.static_dir = dir;
        }
        if let Some(raw) = lookup("SINGLE_FLIGHT") {
            config.single_flight = parse_bool(&raw);
        }
        if let Some(raw) = lookup("UPSTREAM_TIMEOUT_SECS") {
            config.upstream_timeout =
                Duration::from_secs(parse_u64(&raw, "UPSTREAM_TIMEOUT_SECS")?);
        }
        if let Some(base) = lookup("API_BASE").filter(|v| !v.trim().is_empty()) {
            config.api_base = base.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("POLL_INTERVAL_SECS") {
            let secs = parse_u64(&raw, "POLL_INTERVAL_SECS")?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: "POLL_INTERVAL_SECS",
                    expected: "an integer > 0",
                    value: raw,
                });
            }
            config.poll_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_u64(raw: &str, name: &'static str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        name,
        expected: "an integer >= 0",
        value: raw.to_string(),
    })
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    !lowered.is_empty() && lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}
