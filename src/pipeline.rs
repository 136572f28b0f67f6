// src/pipeline.rs
//! One pipeline run: fetch every source in turn, normalize, gate on
//! relevance, dedup against the store, persist, then write a brief and a
//! run log.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};

use crate::ingest::{
    ensure_metrics_described, normalize_article, normalize_event, ArticleSource, Deduplicator,
    EventSource,
};
use crate::model::{ActionBias, Article, Brief, Event, RunLog, RunSummary};
use crate::relevance::KeywordFilter;
use crate::store::Store;

pub const DEFAULT_EVENT_GRACE_SECS: i64 = 300;
pub const DEFAULT_BRIEF_TOP_N: usize = 3;

pub const NO_NEW_ITEMS: &str = "No new relevant items in this run.";
const WHY_IT_MATTERS: &str =
    "Central bank and data headlines move rate expectations and bond yields.";
const RISKS: &str = "Headline-only signal. Check the linked sources before acting.";
const BASE_CONFIDENCE: f32 = 0.4;
const TOP_ITEMS_BONUS: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Events at or after `now - event_grace` are `upcoming`.
    pub event_grace: Duration,
    pub brief_top_n: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            event_grace: Duration::seconds(DEFAULT_EVENT_GRACE_SECS),
            brief_top_n: DEFAULT_BRIEF_TOP_N,
        }
    }
}

pub struct Pipeline {
    store: Arc<dyn Store>,
    article_sources: Vec<Box<dyn ArticleSource>>,
    event_sources: Vec<Box<dyn EventSource>>,
    relevance: KeywordFilter,
    settings: PipelineSettings,
}

impl Pipeline {
    /// No sources, accept-all relevance, default settings.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            article_sources: Vec::new(),
            event_sources: Vec::new(),
            relevance: KeywordFilter::accept_all(),
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_article_source<S: ArticleSource + 'static>(mut self, source: S) -> Self {
        self.article_sources.push(Box::new(source));
        self
    }

    pub fn with_article_sources(mut self, sources: Vec<Box<dyn ArticleSource>>) -> Self {
        self.article_sources.extend(sources);
        self
    }

    pub fn with_event_source<S: EventSource + 'static>(mut self, source: S) -> Self {
        self.event_sources.push(Box::new(source));
        self
    }

    pub fn with_event_sources(mut self, sources: Vec<Box<dyn EventSource>>) -> Self {
        self.event_sources.extend(sources);
        self
    }

    pub fn with_relevance(mut self, relevance: KeywordFilter) -> Self {
        self.relevance = relevance;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn sources_total(&self) -> usize {
        self.article_sources.len() + self.event_sources.len()
    }

    /// Run every source once and persist the results.
    ///
    /// Source failures are logged and counted, never returned. Store
    /// failures abort the run with an error.
    pub async fn run_once(&self) -> Result<RunSummary> {
        ensure_metrics_described();
        let clock = Instant::now();
        let started_at = Utc::now();
        let run_id = new_run_id();
        let mut sources_failed = 0usize;
        tracing::info!(run_id = %run_id, sources = self.sources_total(), "run started");

        // articles: fetch + normalize + relevance
        let mut items_in = 0usize;
        let mut relevant: Vec<Article> = Vec::new();
        for src in &self.article_sources {
            let raw = match src.fetch_articles().await {
                Ok(v) => v,
                Err(e) => {
                    sources_failed += 1;
                    tracing::warn!(error = ?e, source = src.name(), "article source error");
                    counter!("ingest_source_errors_total").increment(1);
                    continue;
                }
            };
            items_in += raw.len();
            tracing::debug!(source = src.name(), items = raw.len(), "fetched articles");

            for r in raw {
                let Some(a) = normalize_article(r, src.default_country(), started_at) else {
                    continue;
                };
                if !src.skip_relevance() && !self.relevance.accepts(&a.headline, &a.summary) {
                    counter!("ingest_filtered_total").increment(1);
                    continue;
                }
                relevant.push(a);
            }
        }
        let items_out = relevant.len();
        counter!("ingest_items_total").increment(items_in as u64);

        // dedup against the store, then within the batch
        let known = self.store.article_urls().context("loading stored urls")?;
        let mut dedup = Deduplicator::from_urls(known);
        let (mut fresh, dropped) = dedup.dedup(relevant);
        counter!("ingest_dedup_total").increment(dropped as u64);

        fresh.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let new_items = self
            .store
            .insert_articles(&fresh)
            .context("storing articles")?;
        counter!("ingest_new_total").increment(new_items as u64);

        // events
        let mut events: Vec<Event> = Vec::new();
        for src in &self.event_sources {
            match src.fetch_events().await {
                Ok(raw) => {
                    tracing::debug!(source = src.name(), items = raw.len(), "fetched events");
                    events.extend(raw.into_iter().filter_map(|r| {
                        normalize_event(
                            r,
                            src.default_country(),
                            started_at,
                            self.settings.event_grace,
                        )
                    }));
                }
                Err(e) => {
                    sources_failed += 1;
                    tracing::warn!(error = ?e, source = src.name(), "event source error");
                    counter!("ingest_source_errors_total").increment(1);
                }
            }
        }
        let events_in = self
            .store
            .insert_events(&events)
            .context("storing events")?;
        counter!("ingest_events_total").increment(events_in as u64);

        // brief + run log
        let finished_at = Utc::now();
        let top = &fresh[..fresh.len().min(self.settings.brief_top_n)];
        let brief = build_brief(&run_id, finished_at, top);
        self.store.insert_brief(&brief).context("storing brief")?;

        let log = RunLog {
            run_id,
            started_at,
            finished_at: Some(finished_at),
            items_in,
            items_out,
            new_items,
            events_in,
            sources_total: self.sources_total(),
            sources_failed,
            latency_ms: clock.elapsed().as_millis() as u64,
        };
        self.store.insert_run_log(&log).context("storing run log")?;

        counter!("ingest_runs_total").increment(1);
        gauge!("ingest_pipeline_last_run_ts").set(finished_at.timestamp() as f64);
        tracing::info!(
            run_id = %log.run_id,
            items_in,
            items_out,
            new_items,
            events_in,
            sources_failed,
            latency_ms = log.latency_ms,
            "run complete"
        );
        if sources_failed > 0 && sources_failed == log.sources_total {
            tracing::warn!(run_id = %log.run_id, "every source failed in this run");
        }

        Ok(RunSummary::from((&log, &brief)))
    }
}

/// Brief over the top new articles (already sorted newest first).
pub fn build_brief(run_id: &str, created_at: DateTime<Utc>, top: &[Article]) -> Brief {
    let what_happened = if top.is_empty() {
        NO_NEW_ITEMS.to_string()
    } else {
        top.iter()
            .map(|a| a.headline.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    };
    let confidence = if top.is_empty() {
        BASE_CONFIDENCE
    } else {
        BASE_CONFIDENCE + TOP_ITEMS_BONUS
    };
    Brief {
        run_id: run_id.to_string(),
        created_at,
        article_ids: top.iter().map(|a| a.id.clone()).collect(),
        what_happened,
        why_it_matters: WHY_IT_MATTERS.to_string(),
        action_bias: ActionBias::Observe,
        confidence,
        risks: RISKS.to_string(),
        links: top.iter().map(|a| a.url.clone()).collect(),
    }
}

/// 12 lowercase hex chars.
pub fn new_run_id() -> String {
    format!("{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff)
}
