// src/store/mod.rs
//! Append/query collections for articles, events, briefs and run logs.
//!
//! Every operation takes the implementation's internal lock for its own
//! duration only. Two pipeline runs in flight at once interleave their
//! writes; nothing serializes whole runs.

pub mod memory;
pub mod sqlite;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::model::{Article, Brief, Event, RunLog};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Value of `MACRO_DB_PATH` that selects the in-memory store.
pub const MEMORY_DSN: &str = ":memory:";

pub trait Store: Send + Sync {
    fn insert_articles(&self, items: &[Article]) -> Result<usize>;
    fn insert_events(&self, items: &[Event]) -> Result<usize>;
    fn insert_brief(&self, brief: &Brief) -> Result<()>;
    fn insert_run_log(&self, log: &RunLog) -> Result<()>;

    /// Raw URLs of every stored article.
    fn article_urls(&self) -> Result<HashSet<String>>;

    /// Newest first by `published_at`.
    fn recent_articles(&self, limit: usize, offset: usize) -> Result<Vec<Article>>;
    /// Events with `from <= date_time <= to`, ascending.
    fn events_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Event>>;
    /// Newest first by `created_at`.
    fn recent_briefs(&self, limit: usize) -> Result<Vec<Brief>>;
    /// Newest first by `started_at`.
    fn recent_run_logs(&self, limit: usize) -> Result<Vec<RunLog>>;
}

/// Open the configured store. Any failure here is fatal at startup.
pub fn open_store(dsn: &str) -> Result<Arc<dyn Store>> {
    if dsn.trim() == MEMORY_DSN {
        tracing::info!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SqliteStore::open(Path::new(dsn))?;
    Ok(Arc::new(store))
}
