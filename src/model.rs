// src/model.rs
//! Canonical records produced by the ingest pipeline and persisted by the store.
//!
//! Nothing here is mutated after construction. `Event::status` is computed once
//! during normalization and goes stale as time passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized news headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Short hex digest of the canonical URL.
    pub id: String,
    pub source: String,
    /// Dedup identity.
    pub url: String,
    pub published_at: DateTime<Utc>,
    /// True when the source timestamp was unparseable and "now" was used instead.
    #[serde(default)]
    pub published_at_estimated: bool,
    pub country: String,
    pub headline: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Released,
}

impl EventStatus {
    /// `Upcoming` iff `at >= now - grace`. A grace reaching past the
    /// representable range counts every event as upcoming.
    pub fn at(at: DateTime<Utc>, now: DateTime<Utc>, grace: chrono::Duration) -> Self {
        if now.checked_sub_signed(grace).map_or(true, |cutoff| at >= cutoff) {
            EventStatus::Upcoming
        } else {
            EventStatus::Released
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Released => "released",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Some(EventStatus::Upcoming),
            "released" => Some(EventStatus::Released),
            _ => None,
        }
    }
}

/// A calendar entry (data release, auction, central bank meeting...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub source: String,
    pub date_time: DateTime<Utc>,
    pub country: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub details: String,
    pub source_link: Option<String>,
    pub impact: Option<String>,
    pub status: EventStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionBias {
    #[default]
    Observe,
}

impl ActionBias {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionBias::Observe => "Observe",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Observe" => Some(ActionBias::Observe),
            _ => None,
        }
    }
}

/// One synthesized summary per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brief {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub article_ids: Vec<String>,
    pub what_happened: String,
    pub why_it_matters: String,
    pub action_bias: ActionBias,
    pub confidence: f32,
    pub risks: String,
    pub links: Vec<String>,
}

/// Operations log entry, one per pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Candidate articles returned by all article adapters.
    pub items_in: usize,
    /// Articles surviving the relevance filter.
    pub items_out: usize,
    /// Articles stored after dedup.
    pub new_items: usize,
    pub events_in: usize,
    pub sources_total: usize,
    pub sources_failed: usize,
    pub latency_ms: u64,
}

/// What `POST /run` hands back to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub items_in: usize,
    pub items_out: usize,
    pub new_items: usize,
    pub events_in: usize,
    pub sources_failed: usize,
    pub latency_ms: u64,
    pub what_happened: String,
}

impl From<(&RunLog, &Brief)> for RunSummary {
    fn from((log, brief): (&RunLog, &Brief)) -> Self {
        Self {
            run_id: log.run_id.clone(),
            items_in: log.items_in,
            items_out: log.items_out,
            new_items: log.new_items,
            events_in: log.events_in,
            sources_failed: log.sources_failed,
            latency_ms: log.latency_ms,
            what_happened: brief.what_happened.clone(),
        }
    }
}
