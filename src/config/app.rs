// src/config/app.rs
use std::env;
use std::time::Duration;

use crate::ingest::http::DEFAULT_TIMEOUT_SECS;
use crate::pipeline::DEFAULT_EVENT_GRACE_SECS;

pub const ENV_BIND_ADDR: &str = "MACRO_BIND_ADDR";
pub const ENV_DB_PATH: &str = "MACRO_DB_PATH";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "MACRO_HTTP_TIMEOUT_SECS";
pub const ENV_EVENT_GRACE_SECS: &str = "MACRO_EVENT_GRACE_SECS";
pub const ENV_LOG_FORMAT: &str = "MACRO_LOG_FORMAT";
pub const ENV_RUN_ON_START: &str = "MACRO_RUN_ON_START";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_DB_PATH: &str = "data/macro_news.sqlite";

const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 60;
const MAX_EVENT_GRACE_SECS: i64 = 7 * 86_400;

/// Process settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// SQLite file path, or `:memory:` for the in-process store.
    pub db_path: String,
    pub http_timeout: Duration,
    pub event_grace_secs: i64,
    pub log_json: bool,
    pub run_on_start: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            event_grace_secs: DEFAULT_EVENT_GRACE_SECS,
            log_json: false,
            run_on_start: false,
        }
    }
}

impl AppConfig {
    /// Missing or malformed values fall back to defaults; out-of-range
    /// values are clamped.
    pub fn from_env() -> Self {
        let d = Self::default();

        let timeout_secs = env_parse::<u64>(ENV_HTTP_TIMEOUT_SECS)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);

        let grace = match env_parse::<i64>(ENV_EVENT_GRACE_SECS) {
            Some(g) if g < 0 => d.event_grace_secs,
            Some(g) if g > MAX_EVENT_GRACE_SECS => {
                tracing::warn!(value = g, max = MAX_EVENT_GRACE_SECS, "event grace clamped");
                MAX_EVENT_GRACE_SECS
            }
            Some(g) => g,
            None => d.event_grace_secs,
        };

        Self {
            bind_addr: env_string(ENV_BIND_ADDR).unwrap_or(d.bind_addr),
            db_path: env_string(ENV_DB_PATH).unwrap_or(d.db_path),
            http_timeout: Duration::from_secs(timeout_secs),
            event_grace_secs: grace,
            log_json: env_string(ENV_LOG_FORMAT).is_some_and(|v| v.eq_ignore_ascii_case("json")),
            run_on_start: env_string(ENV_RUN_ON_START)
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring malformed env value");
            None
        }
    }
}
