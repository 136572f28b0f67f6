// src/store/sqlite.rs
//! SQLite-backed store.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text
//! (`2025-03-01T12:00:00.000000Z`), so lexical order equals time order.
//! Schema version is tracked in `PRAGMA user_version`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use super::Store;
use crate::model::{ActionBias, Article, Brief, Event, EventStatus, RunLog};

const LATEST_SCHEMA_VERSION: u32 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS articles (
    id TEXT NOT NULL,
    source TEXT NOT NULL,
    url TEXT NOT NULL,
    published_at TEXT NOT NULL,
    published_at_estimated INTEGER NOT NULL DEFAULT 0,
    country TEXT NOT NULL,
    headline TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
CREATE INDEX IF NOT EXISTS idx_articles_url ON articles(url);

CREATE TABLE IF NOT EXISTS events (
    source TEXT NOT NULL,
    date_time TEXT NOT NULL,
    country TEXT NOT NULL,
    event_type TEXT NOT NULL,
    details TEXT NOT NULL,
    source_link TEXT,
    impact TEXT,
    status TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_date_time ON events(date_time);

CREATE TABLE IF NOT EXISTS briefs (
    run_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    article_ids TEXT NOT NULL,
    what_happened TEXT NOT NULL,
    why_it_matters TEXT NOT NULL,
    action_bias TEXT NOT NULL,
    confidence REAL NOT NULL,
    risks TEXT NOT NULL,
    links TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_briefs_created_at ON briefs(created_at);

CREATE TABLE IF NOT EXISTS run_logs (
    run_id TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    items_in INTEGER NOT NULL,
    items_out INTEGER NOT NULL,
    new_items INTEGER NOT NULL,
    events_in INTEGER NOT NULL,
    sources_total INTEGER NOT NULL,
    sources_failed INTEGER NOT NULL,
    latency_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_run_logs_started_at ON run_logs(started_at);
";

const ARTICLE_COLUMNS: &str =
    "id, source, url, published_at, published_at_estimated, country, headline, summary";
const EVENT_COLUMNS: &str =
    "source, date_time, country, event_type, details, source_link, impact, status";
const BRIEF_COLUMNS: &str = "run_id, created_at, article_ids, what_happened, why_it_matters, action_bias, confidence, risks, links";
const RUN_LOG_COLUMNS: &str = "run_id, started_at, finished_at, items_in, items_out, new_items, events_in, sources_total, sources_failed, latency_ms";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and apply migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let started_at = Instant::now();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating store directory {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening sqlite store at {}", path.display()))?;
        let store = Self::bootstrap(conn)?;
        tracing::info!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "sqlite store ready"
        );
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory sqlite")?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        let version: u32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if version > LATEST_SCHEMA_VERSION {
            bail!(
                "database schema version {version} is newer than supported {LATEST_SCHEMA_VERSION}"
            );
        }
        if version < 1 {
            conn.execute_batch(SCHEMA_V1).context("applying schema v1")?;
            conn.pragma_update(None, "user_version", LATEST_SCHEMA_VERSION)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("sqlite store mutex poisoned"))
    }
}

fn ts_to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ts_from_db(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn list_from_db(idx: usize, s: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn count_to_db(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn count_from_db(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    let v: i64 = row.get(idx)?;
    Ok(usize::try_from(v).unwrap_or_default())
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    let published: String = row.get(3)?;
    Ok(Article {
        id: row.get(0)?,
        source: row.get(1)?,
        url: row.get(2)?,
        published_at: ts_from_db(3, &published)?,
        published_at_estimated: row.get::<_, i64>(4)? != 0,
        country: row.get(5)?,
        headline: row.get(6)?,
        summary: row.get(7)?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let when: String = row.get(1)?;
    let status: String = row.get(7)?;
    let status = EventStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            Type::Text,
            format!("unknown event status `{status}`").into(),
        )
    })?;
    Ok(Event {
        source: row.get(0)?,
        date_time: ts_from_db(1, &when)?,
        country: row.get(2)?,
        event_type: row.get(3)?,
        details: row.get(4)?,
        source_link: row.get(5)?,
        impact: row.get(6)?,
        status,
    })
}

fn brief_from_row(row: &Row<'_>) -> rusqlite::Result<Brief> {
    let created: String = row.get(1)?;
    let ids: String = row.get(2)?;
    let links: String = row.get(8)?;
    let confidence: f64 = row.get(6)?;
    let bias: String = row.get(5)?;
    let action_bias = ActionBias::parse(&bias).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown action bias `{bias}`").into(),
        )
    })?;
    Ok(Brief {
        run_id: row.get(0)?,
        created_at: ts_from_db(1, &created)?,
        article_ids: list_from_db(2, &ids)?,
        what_happened: row.get(3)?,
        why_it_matters: row.get(4)?,
        action_bias,
        confidence: confidence as f32,
        risks: row.get(7)?,
        links: list_from_db(8, &links)?,
    })
}

fn run_log_from_row(row: &Row<'_>) -> rusqlite::Result<RunLog> {
    let started: String = row.get(1)?;
    let finished: Option<String> = row.get(2)?;
    Ok(RunLog {
        run_id: row.get(0)?,
        started_at: ts_from_db(1, &started)?,
        finished_at: finished.as_deref().map(|f| ts_from_db(2, f)).transpose()?,
        items_in: count_from_db(row, 3)?,
        items_out: count_from_db(row, 4)?,
        new_items: count_from_db(row, 5)?,
        events_in: count_from_db(row, 6)?,
        sources_total: count_from_db(row, 7)?,
        sources_failed: count_from_db(row, 8)?,
        latency_ms: u64::try_from(row.get::<_, i64>(9)?).unwrap_or_default(),
    })
}

impl Store for SqliteStore {
    fn insert_articles(&self, items: &[Article]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO articles ({ARTICLE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))?;
            for a in items {
                stmt.execute(params![
                    a.id,
                    a.source,
                    a.url,
                    ts_to_db(&a.published_at),
                    i64::from(a.published_at_estimated),
                    a.country,
                    a.headline,
                    a.summary,
                ])?;
            }
        }
        tx.commit().context("committing articles")?;
        Ok(items.len())
    }

    fn insert_events(&self, items: &[Event]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ))?;
            for e in items {
                stmt.execute(params![
                    e.source,
                    ts_to_db(&e.date_time),
                    e.country,
                    e.event_type,
                    e.details,
                    e.source_link,
                    e.impact,
                    e.status.as_str(),
                ])?;
            }
        }
        tx.commit().context("committing events")?;
        Ok(items.len())
    }

    fn insert_brief(&self, b: &Brief) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO briefs ({BRIEF_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                b.run_id,
                ts_to_db(&b.created_at),
                serde_json::to_string(&b.article_ids)?,
                b.what_happened,
                b.why_it_matters,
                b.action_bias.as_str(),
                f64::from(b.confidence),
                b.risks,
                serde_json::to_string(&b.links)?,
            ],
        )
        .context("inserting brief")?;
        Ok(())
    }

    fn insert_run_log(&self, r: &RunLog) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO run_logs ({RUN_LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                r.run_id,
                ts_to_db(&r.started_at),
                r.finished_at.as_ref().map(ts_to_db),
                count_to_db(r.items_in),
                count_to_db(r.items_out),
                count_to_db(r.new_items),
                count_to_db(r.events_in),
                count_to_db(r.sources_total),
                count_to_db(r.sources_failed),
                i64::try_from(r.latency_ms).unwrap_or(i64::MAX),
            ],
        )
        .context("inserting run log")?;
        Ok(())
    }

    fn article_urls(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached("SELECT url FROM articles")?;
        let urls = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(urls)
    }

    fn recent_articles(&self, limit: usize, offset: usize) -> Result<Vec<Article>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles
             ORDER BY published_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
            .query_map(
                params![count_to_db(limit), count_to_db(offset)],
                article_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn events_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Event>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE date_time >= ?1 AND date_time <= ?2
             ORDER BY date_time ASC, rowid ASC"
        ))?;
        let rows = stmt
            .query_map(params![ts_to_db(&from), ts_to_db(&to)], event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn recent_briefs(&self, limit: usize) -> Result<Vec<Brief>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {BRIEF_COLUMNS} FROM briefs ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![count_to_db(limit)], brief_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn recent_run_logs(&self, limit: usize) -> Result<Vec<RunLog>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {RUN_LOG_COLUMNS} FROM run_logs ORDER BY started_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let rows = stmt
            .query_map(params![count_to_db(limit)], run_log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
