// tests/ingest_pipeline.rs
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};

use macro_news_analyst::ingest::providers::rss::{FeedProvider, FeedSpec};
use macro_news_analyst::ingest::{ArticleSource, EventSource, RawArticle, RawEvent};
use macro_news_analyst::model::{Article, EventStatus};
use macro_news_analyst::pipeline::NO_NEW_ITEMS;
use macro_news_analyst::relevance::KeywordFilter;
use macro_news_analyst::store::{MemoryStore, Store};
use macro_news_analyst::{Pipeline, PipelineSettings};

const ECB_XML: &str = include_str!("fixtures/ecb_press.xml");

struct StaticArticles {
    name: &'static str,
    items: Vec<RawArticle>,
    skip_relevance: bool,
}

#[async_trait]
impl ArticleSource for StaticArticles {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        self.name
    }
    fn default_country(&self) -> &str {
        "EU"
    }
    fn skip_relevance(&self) -> bool {
        self.skip_relevance
    }
}

struct Broken;

#[async_trait]
impl ArticleSource for Broken {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        Err(anyhow!("connection reset by peer"))
    }
    fn name(&self) -> &str {
        "Broken"
    }
}

#[async_trait]
impl EventSource for Broken {
    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        Err(anyhow!("calendar timed out"))
    }
    fn name(&self) -> &str {
        "Broken"
    }
}

struct StaticEvents(Vec<RawEvent>);

#[async_trait]
impl EventSource for StaticEvents {
    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &str {
        "Calendar"
    }
    fn default_country(&self) -> &str {
        "US"
    }
}

fn raw(url: &str, headline: &str) -> RawArticle {
    RawArticle {
        source: "Wire".into(),
        url: Some(url.into()),
        headline: Some(headline.into()),
        summary: None,
        published: Some("2025-03-10T09:00:00Z".into()),
        country: None,
    }
}

fn wire(items: Vec<RawArticle>) -> StaticArticles {
    StaticArticles {
        name: "Wire",
        items,
        skip_relevance: false,
    }
}

fn ecb_feed() -> FeedProvider {
    let spec = FeedSpec {
        name: "ECB Press".into(),
        url: "https://www.ecb.europa.eu/rss/press.html".into(),
        country: "EU".into(),
        max_items: 20,
        skip_relevance: false,
        enabled: true,
    };
    FeedProvider::from_fixture_str(spec, ECB_XML)
}

#[tokio::test]
async fn empty_source_list_writes_placeholder_brief_and_run_log() {
    let store = Arc::new(MemoryStore::new());
    let p = Pipeline::new(store.clone());

    let s = p.run_once().await.unwrap();
    assert_eq!(s.items_in, 0);
    assert_eq!(s.items_out, 0);
    assert_eq!(s.new_items, 0);
    assert_eq!(s.what_happened, NO_NEW_ITEMS);

    let briefs = store.recent_briefs(10).unwrap();
    let runs = store.recent_run_logs(10).unwrap();
    assert_eq!(briefs.len(), 1);
    assert_eq!(runs.len(), 1);
    assert_eq!(briefs[0].run_id, runs[0].run_id);
    assert_eq!(briefs[0].confidence, 0.4);
    assert!(runs[0].finished_at.is_some());
    assert_eq!(runs[0].sources_total, 0);
}

#[tokio::test]
async fn url_already_stored_is_not_new_again() {
    let store = Arc::new(MemoryStore::new());
    let prior = Article {
        id: "prior".into(),
        source: "Wire".into(),
        url: "https://example.test/u1".into(),
        published_at: Utc::now() - Duration::days(1),
        published_at_estimated: false,
        country: "EU".into(),
        headline: "Earlier story".into(),
        summary: String::new(),
    };
    store.insert_articles(&[prior]).unwrap();

    let p = Pipeline::new(store.clone()).with_article_source(wire(vec![
        raw("https://example.test/u1", "ECB holds rates"),
        raw("https://example.test/u2", "ECB minutes published"),
    ]));
    let s = p.run_once().await.unwrap();
    assert_eq!(s.items_in, 2);
    assert_eq!(s.items_out, 2);
    assert_eq!(s.new_items, 1);

    let stored = store.recent_articles(10, 0).unwrap();
    let urls: Vec<_> = stored.iter().map(|a| a.url.as_str()).collect();
    assert!(urls.contains(&"https://example.test/u2"));
    assert_eq!(urls.len(), 2);
}

#[tokio::test]
async fn second_run_over_same_feed_adds_nothing() {
    let store = Arc::new(MemoryStore::new());
    let p = Pipeline::new(store.clone())
        .with_article_source(ecb_feed())
        .with_relevance(KeywordFilter::default_seed());

    let first = p.run_once().await.unwrap();
    assert_eq!(first.items_in, 5);
    // the art exhibition item has no macro keyword
    assert_eq!(first.items_out, 4);
    // the #top duplicate collapses onto the decision URL
    assert_eq!(first.new_items, 3);

    let second = p.run_once().await.unwrap();
    assert_eq!(second.items_in, 5);
    assert_eq!(second.new_items, 0);
    assert_eq!(second.what_happened, NO_NEW_ITEMS);

    let confidences: Vec<f32> = store
        .recent_briefs(10)
        .unwrap()
        .iter()
        .map(|b| b.confidence)
        .collect();
    assert_eq!(confidences.len(), 2);
    for c in confidences {
        assert!(c == 0.4 || (c - 0.6).abs() < 1e-6, "confidence {c}");
    }
}

#[tokio::test]
async fn brief_lists_newest_first_and_flags_estimated_time() {
    let store = Arc::new(MemoryStore::new());
    let p = Pipeline::new(store.clone())
        .with_article_source(ecb_feed())
        .with_relevance(KeywordFilter::default_seed());
    p.run_once().await.unwrap();

    let brief = &store.recent_briefs(1).unwrap()[0];
    // unparseable pubDate becomes "now", so that item sorts first
    assert!(brief
        .what_happened
        .starts_with("ECB publishes inflation expectations survey; Monetary policy decisions"));
    assert_eq!(brief.links.len(), 3);
    assert_eq!(brief.article_ids.len(), 3);

    let articles = store.recent_articles(10, 0).unwrap();
    let estimated: Vec<_> = articles
        .iter()
        .filter(|a| a.published_at_estimated)
        .map(|a| a.headline.as_str())
        .collect();
    assert_eq!(estimated, vec!["ECB publishes inflation expectations survey"]);
    assert!(articles.iter().all(|a| a.country == "EU"));
}

#[tokio::test]
async fn failing_sources_are_counted_and_others_survive() {
    let store = Arc::new(MemoryStore::new());
    let p = Pipeline::new(store.clone())
        .with_article_source(Broken)
        .with_article_source(wire(vec![raw("https://example.test/a", "GDP beats")]))
        .with_event_source(Broken);

    let s = p.run_once().await.unwrap();
    assert_eq!(s.sources_failed, 2);
    assert_eq!(s.new_items, 1);

    let runs = store.recent_run_logs(1).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].sources_total, 3);
    assert_eq!(runs[0].sources_failed, 2);
}

#[tokio::test]
async fn batch_urls_are_unique_across_sources() {
    let store = Arc::new(MemoryStore::new());
    let p = Pipeline::new(store.clone())
        .with_article_source(wire(vec![
            raw("https://example.test/x?utm_source=a", "Bond auction covered"),
            raw("https://example.test/y", "Budget deficit widens"),
        ]))
        .with_article_source(wire(vec![
            raw("https://EXAMPLE.test/x", "Bond auction covered (repost)"),
            raw("https://example.test/y/", "Budget deficit widens"),
        ]));
    let s = p.run_once().await.unwrap();
    assert_eq!(s.items_in, 4);
    assert_eq!(s.new_items, 2);

    let stored = store.recent_articles(10, 0).unwrap();
    let ids: HashSet<_> = stored.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids.len(), stored.len());
}

#[tokio::test]
async fn relevance_applies_unless_source_opts_out() {
    let store = Arc::new(MemoryStore::new());
    let p = Pipeline::new(store.clone())
        .with_relevance(KeywordFilter::new(["inflation"]))
        .with_article_source(wire(vec![
            raw("https://example.test/1", "Inflation slows"),
            raw("https://example.test/2", "Weather report"),
        ]))
        .with_article_source(StaticArticles {
            name: "Releases",
            items: vec![raw("https://example.test/3", "Employment Situation Summary")],
            skip_relevance: true,
        });

    let s = p.run_once().await.unwrap();
    assert_eq!(s.items_in, 3);
    assert_eq!(s.items_out, 2);
    assert_eq!(s.new_items, 2);
}

#[tokio::test]
async fn event_status_follows_grace_window() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    let at = |mins: i64| {
        Some((now + Duration::minutes(mins)).to_rfc3339_opts(SecondsFormat::Secs, true))
    };
    let ev = |title: &str, when: Option<String>| RawEvent {
        source: "Calendar".into(),
        when,
        title: Some(title.into()),
        ..RawEvent::default()
    };

    let p = Pipeline::new(store.clone()).with_event_source(StaticEvents(vec![
        ev("long gone", at(-10)),
        ev("just out", at(-2)),
        ev("later today", at(60)),
        ev("", None),
    ]));
    let s = p.run_once().await.unwrap();
    assert_eq!(s.events_in, 3);

    let events = store
        .events_between(now - Duration::hours(1), now + Duration::hours(2))
        .unwrap();
    let by_details: Vec<_> = events.iter().map(|e| (e.details.as_str(), e.status)).collect();
    assert_eq!(
        by_details,
        vec![
            ("long gone", EventStatus::Released),
            ("just out", EventStatus::Upcoming),
            ("later today", EventStatus::Upcoming),
        ]
    );
    assert!(events.iter().all(|e| e.country == "US"));
}

#[tokio::test]
async fn oversized_grace_marks_events_upcoming_without_panicking() {
    let store = Arc::new(MemoryStore::new());
    let settings = PipelineSettings {
        event_grace: Duration::seconds(9_000_000_000_000),
        ..PipelineSettings::default()
    };
    let p = Pipeline::new(store.clone())
        .with_settings(settings)
        .with_event_source(StaticEvents(vec![RawEvent {
            source: "Calendar".into(),
            when: Some("2020-01-03T13:30:00Z".into()),
            title: Some("Non-Farm Payrolls".into()),
            ..RawEvent::default()
        }]));

    let s = p.run_once().await.unwrap();
    assert_eq!(s.events_in, 1);
    let from = Utc::now() - Duration::days(3650);
    let events = store.events_between(from, Utc::now()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, EventStatus::Upcoming);
}
