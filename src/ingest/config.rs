// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::http::HttpFetcher;
use crate::ingest::normalize::DEFAULT_EVENT_TYPE;
use crate::ingest::providers::calendar_html::{CalendarHtmlProvider, CalendarHtmlSpec};
use crate::ingest::providers::calendar_json::{CalendarJsonProvider, CalendarJsonSpec};
use crate::ingest::providers::html_scrape::{ScrapeProvider, ScrapeSelectors, ScrapeSpec};
use crate::ingest::providers::news_api::{
    NewsApiProvider, NewsApiSpec, DEFAULT_ENDPOINT, ENV_NEWS_API_KEY,
};
use crate::ingest::providers::rss::{FeedProvider, FeedSpec};
use crate::ingest::types::{ArticleSource, EventSource};

pub const ENV_SOURCES_PATH: &str = "MACRO_SOURCES_PATH";
const DEFAULT_TOML_PATH: &str = "config/sources.toml";
const DEFAULT_JSON_PATH: &str = "config/sources.json";

/// One configured source, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Rss(FeedSpec),
    Html(ScrapeSpec),
    NewsApi(NewsApiSpec),
    CalendarJson(CalendarJsonSpec),
    CalendarHtml(CalendarHtmlSpec),
}

impl SourceSpec {
    pub fn name(&self) -> &str {
        match self {
            SourceSpec::Rss(s) => &s.name,
            SourceSpec::Html(s) => &s.name,
            SourceSpec::NewsApi(s) => &s.name,
            SourceSpec::CalendarJson(s) => &s.name,
            SourceSpec::CalendarHtml(s) => &s.name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            SourceSpec::Rss(s) => s.enabled,
            SourceSpec::Html(s) => s.enabled,
            SourceSpec::NewsApi(s) => s.enabled,
            SourceSpec::CalendarJson(s) => s.enabled,
            SourceSpec::CalendarHtml(s) => s.enabled,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl SourcesConfig {
    /// Built-in source list, used when no config file exists.
    pub fn default_seed() -> Self {
        let feed = |name: &str, url: &str, country: &str| {
            SourceSpec::Rss(FeedSpec {
                name: name.into(),
                url: url.into(),
                country: country.into(),
                max_items: 20,
                skip_relevance: false,
                enabled: true,
            })
        };
        Self {
            sources: vec![
                feed("ECB Press", "https://www.ecb.europa.eu/rss/press.html", "EU"),
                feed(
                    "Federal Reserve",
                    "https://www.federalreserve.gov/feeds/press_all.xml",
                    "US",
                ),
                feed("Bank of England", "https://www.bankofengland.co.uk/rss/news", "GB"),
                feed("BLS", "https://www.bls.gov/feed/bls_latest.rss", "US"),
                SourceSpec::Html(ScrapeSpec {
                    name: "AFT News".into(),
                    url: "https://www.aft.gouv.fr/en/actualites".into(),
                    country: "FR".into(),
                    selectors: ScrapeSelectors {
                        item: "div.views-row".into(),
                        headline: "h3, .title".into(),
                        link: "a[href]".into(),
                        date: Some("time".into()),
                        date_attr: Some("datetime".into()),
                        summary: None,
                    },
                    max_items: 20,
                    skip_relevance: false,
                    enabled: true,
                }),
                SourceSpec::NewsApi(NewsApiSpec {
                    name: "NewsAPI".into(),
                    endpoint: DEFAULT_ENDPOINT.into(),
                    queries: vec![
                        "inflation OR \"central bank\"".into(),
                        "ECB OR \"Federal Reserve\" OR \"Bank of England\"".into(),
                        "\"bond auction\" OR \"treasury yields\"".into(),
                    ],
                    window_hours: 24,
                    language: "en".into(),
                    page_size: 50,
                    country: "XX".into(),
                    api_key_env: ENV_NEWS_API_KEY.into(),
                    skip_relevance: false,
                    enabled: true,
                }),
                SourceSpec::CalendarJson(CalendarJsonSpec {
                    name: "Economic Calendar".into(),
                    url: "https://nfs.faireconomy.media/ff_calendar_thisweek.json".into(),
                    impacts: vec!["High".into(), "Medium".into()],
                    countries: Vec::new(),
                    event_type: DEFAULT_EVENT_TYPE.into(),
                    enabled: true,
                }),
            ],
        }
    }
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<SourcesConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Load sources using env var + fallbacks:
/// 1) $MACRO_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in seed
pub fn load_sources_default() -> Result<SourcesConfig> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON_PATH);
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    tracing::info!("no sources config found, using built-in sources");
    Ok(SourcesConfig::default_seed())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourcesConfig> {
    match hint_ext {
        "json" => Ok(serde_json::from_str(s)?),
        "toml" => Ok(toml::from_str(s)?),
        // unknown extension: JSON first, then TOML
        _ => serde_json::from_str(s)
            .or_else(|_| toml::from_str(s))
            .map_err(|e| anyhow!("unsupported sources format: {e}")),
    }
}

/// Adapters built from a config, split by record kind.
pub struct BuiltSources {
    pub articles: Vec<Box<dyn ArticleSource>>,
    pub events: Vec<Box<dyn EventSource>>,
}

/// Instantiate HTTP-backed adapters for every enabled source.
/// API keys are read from the env var each `news_api` entry names.
pub fn build_sources(cfg: &SourcesConfig, fetcher: &HttpFetcher) -> BuiltSources {
    let mut built = BuiltSources {
        articles: Vec::new(),
        events: Vec::new(),
    };
    for spec in &cfg.sources {
        if !spec.enabled() {
            tracing::debug!(source = spec.name(), "source disabled");
            continue;
        }
        match spec.clone() {
            SourceSpec::Rss(s) => built
                .articles
                .push(Box::new(FeedProvider::from_url(s, fetcher.clone()))),
            SourceSpec::Html(s) => built
                .articles
                .push(Box::new(ScrapeProvider::from_url(s, fetcher.clone()))),
            SourceSpec::NewsApi(s) => {
                let key = std::env::var(&s.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty());
                if key.is_none() {
                    tracing::warn!(
                        source = %s.name,
                        env = %s.api_key_env,
                        "news api key not set, source will fail until configured"
                    );
                }
                built
                    .articles
                    .push(Box::new(NewsApiProvider::from_url(s, key, fetcher.clone())));
            }
            SourceSpec::CalendarJson(s) => built
                .events
                .push(Box::new(CalendarJsonProvider::from_url(s, fetcher.clone()))),
            SourceSpec::CalendarHtml(s) => built
                .events
                .push(Box::new(CalendarHtmlProvider::from_url(s, fetcher.clone()))),
        }
    }
    tracing::info!(
        article_sources = built.articles.len(),
        event_sources = built.events.len(),
        "sources configured"
    );
    built
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_kinds_are_tagged() {
        let toml = r#"
[[sources]]
kind = "rss"
name = "ECB Press"
url = "https://www.ecb.europa.eu/rss/press.html"
country = "EU"

[[sources]]
kind = "calendar_json"
name = "Cal"
url = "https://example.test/cal.json"
impacts = ["High"]
enabled = false
"#;
        let cfg = parse_sources(toml, "toml").unwrap();
        assert_eq!(cfg.sources.len(), 2);
        match &cfg.sources[0] {
            SourceSpec::Rss(f) => {
                assert_eq!(f.max_items, 20);
                assert!(!f.skip_relevance);
                assert!(f.enabled);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!cfg.sources[1].enabled());
    }

    #[test]
    fn json_and_unknown_extension() {
        let json = r#"{"sources":[{"kind":"news_api","name":"N","queries":["cpi"]}]}"#;
        let cfg = parse_sources(json, "").unwrap();
        match &cfg.sources[0] {
            SourceSpec::NewsApi(n) => {
                assert_eq!(n.endpoint, DEFAULT_ENDPOINT);
                assert_eq!(n.window_hours, 24);
                assert_eq!(n.api_key_env, ENV_NEWS_API_KEY);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parse_sources(r#"{"sources":[{"kind":"ftp"}]}"#, "json").is_err());
    }

    #[test]
    fn seed_covers_every_kind_but_html_calendar() {
        let seed = SourcesConfig::default_seed();
        assert!(seed.sources.iter().all(|s| s.enabled()));
        let fetcher = HttpFetcher::new(std::time::Duration::from_secs(1)).unwrap();
        let built = build_sources(&seed, &fetcher);
        assert_eq!(built.articles.len(), 6);
        assert_eq!(built.events.len(), 1);
    }
}
