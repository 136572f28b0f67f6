// src/store/memory.rs
//! In-process store. Used by tests and by `MACRO_DB_PATH=:memory:`.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use super::Store;
use crate::model::{Article, Brief, Event, RunLog};

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Mutex<Vec<Article>>,
    events: Mutex<Vec<Event>>,
    briefs: Mutex<Vec<Brief>>,
    run_logs: Mutex<Vec<RunLog>>,
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("memory store mutex poisoned")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn insert_articles(&self, items: &[Article]) -> Result<usize> {
        let mut v = self.articles.lock().map_err(poisoned)?;
        v.extend_from_slice(items);
        Ok(items.len())
    }

    fn insert_events(&self, items: &[Event]) -> Result<usize> {
        let mut v = self.events.lock().map_err(poisoned)?;
        v.extend_from_slice(items);
        Ok(items.len())
    }

    fn insert_brief(&self, brief: &Brief) -> Result<()> {
        self.briefs.lock().map_err(poisoned)?.push(brief.clone());
        Ok(())
    }

    fn insert_run_log(&self, log: &RunLog) -> Result<()> {
        self.run_logs.lock().map_err(poisoned)?.push(log.clone());
        Ok(())
    }

    fn article_urls(&self) -> Result<HashSet<String>> {
        let v = self.articles.lock().map_err(poisoned)?;
        Ok(v.iter().map(|a| a.url.clone()).collect())
    }

    fn recent_articles(&self, limit: usize, offset: usize) -> Result<Vec<Article>> {
        let mut v = self.articles.lock().map_err(poisoned)?.clone();
        v.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(v.into_iter().skip(offset).take(limit).collect())
    }

    fn events_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Event>> {
        let v = self.events.lock().map_err(poisoned)?;
        let mut out: Vec<Event> = v
            .iter()
            .filter(|e| e.date_time >= from && e.date_time <= to)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.date_time.cmp(&b.date_time));
        Ok(out)
    }

    fn recent_briefs(&self, limit: usize) -> Result<Vec<Brief>> {
        let mut v = self.briefs.lock().map_err(poisoned)?.clone();
        v.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        v.truncate(limit);
        Ok(v)
    }

    fn recent_run_logs(&self, limit: usize) -> Result<Vec<RunLog>> {
        let mut v = self.run_logs.lock().map_err(poisoned)?.clone();
        v.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        v.truncate(limit);
        Ok(v)
    }
}
