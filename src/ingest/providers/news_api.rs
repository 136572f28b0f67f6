// src/ingest/providers/news_api.rs
//! NewsAPI-compatible query adapter (`/v2/everything`).
//!
//! Every configured query runs over the same recency window; results are
//! merged and deduplicated by URL before leaving the adapter.

use std::collections::HashSet;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use metrics::histogram;
use serde::{Deserialize, Serialize};

use super::{default_country, default_enabled};
use crate::ingest::dedup::url_key;
use crate::ingest::http::HttpFetcher;
use crate::ingest::types::{ArticleSource, RawArticle};

pub const DEFAULT_ENDPOINT: &str = "https://newsapi.org/v2/everything";
pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";

/// Placeholder title NewsAPI uses for withdrawn articles.
const REMOVED_MARKER: &str = "[Removed]";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_window_hours() -> i64 {
    24
}
fn default_language() -> String {
    "en".to_string()
}
fn default_page_size() -> u32 {
    50
}
fn default_key_env() -> String {
    ENV_NEWS_API_KEY.to_string()
}

/// `kind = "news_api"` entry in the sources config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsApiSpec {
    pub name: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub queries: Vec<String>,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_country")]
    pub country: String,
    /// Env var holding the API key.
    #[serde(default = "default_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub skip_relevance: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    source: Option<NewsApiOutlet>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiOutlet {
    name: Option<String>,
}

/// Parse one response body. The outlet name becomes the article source when present.
pub fn parse_response(body: &str, adapter: &str) -> Result<Vec<RawArticle>> {
    let t0 = std::time::Instant::now();
    let resp: NewsApiResponse =
        serde_json::from_str(body).with_context(|| format!("parsing {adapter} response json"))?;
    if !resp.status.eq_ignore_ascii_case("ok") {
        bail!(
            "{adapter} returned status={}: {}",
            resp.status,
            resp.message.unwrap_or_default()
        );
    }

    let out = resp
        .articles
        .into_iter()
        .filter(|a| a.title.as_deref() != Some(REMOVED_MARKER))
        .map(|a| RawArticle {
            source: a
                .source
                .and_then(|s| s.name)
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| adapter.to_string()),
            url: a.url,
            headline: a.title,
            summary: a.description,
            published: a.published_at,
            country: None,
        })
        .collect();

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

/// Concatenate query batches, keeping the first occurrence of each URL.
/// Records without a URL are dropped here.
pub fn merge_unique(batches: Vec<Vec<RawArticle>>) -> Vec<RawArticle> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|a| match a.url.as_deref() {
            Some(u) => seen.insert(url_key(u)),
            None => false,
        })
        .collect()
}

enum QueryMode {
    Fixture(Vec<String>),
    Http(HttpFetcher),
}

pub struct NewsApiProvider {
    spec: NewsApiSpec,
    api_key: Option<String>,
    mode: QueryMode,
}

impl NewsApiProvider {
    /// One fixture body per query.
    pub fn from_fixture_bodies(spec: NewsApiSpec, bodies: Vec<String>) -> Self {
        Self {
            spec,
            api_key: None,
            mode: QueryMode::Fixture(bodies),
        }
    }

    pub fn from_url(spec: NewsApiSpec, api_key: Option<String>, fetcher: HttpFetcher) -> Self {
        Self {
            spec,
            api_key,
            mode: QueryMode::Http(fetcher),
        }
    }

    fn query_params(&self, q: &str, key: &str) -> Vec<(&'static str, String)> {
        let from = (Utc::now() - Duration::hours(self.spec.window_hours.max(1)))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        vec![
            ("q", q.to_string()),
            ("from", from),
            ("language", self.spec.language.clone()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", self.spec.page_size.clamp(1, 100).to_string()),
            ("apiKey", key.to_string()),
        ]
    }
}

/// Fold per-query outcomes. Failed queries are logged and skipped; the
/// adapter fails only when no query succeeded.
fn collect_batches(
    name: &str,
    results: Vec<(String, Result<Vec<RawArticle>>)>,
) -> Result<Vec<Vec<RawArticle>>> {
    let mut batches = Vec::new();
    let mut last_err = None;
    for (q, res) in results {
        match res {
            Ok(v) => batches.push(v),
            Err(e) => {
                tracing::warn!(error = ?e, provider = name, query = %q, "news api query failed");
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) if batches.is_empty() => Err(e),
        _ => Ok(batches),
    }
}

#[async_trait]
impl ArticleSource for NewsApiProvider {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        let name = self.spec.name.as_str();

        let results = match &self.mode {
            QueryMode::Fixture(bodies) => bodies
                .iter()
                .enumerate()
                .map(|(i, body)| {
                    let q = self.spec.queries.get(i).cloned().unwrap_or_default();
                    (q, parse_response(body, name))
                })
                .collect(),
            QueryMode::Http(fetcher) => {
                let key = self
                    .api_key
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| anyhow!("{name}: missing API key (${})", self.spec.api_key_env))?;

                let mut results = Vec::with_capacity(self.spec.queries.len());
                for q in &self.spec.queries {
                    let params = self.query_params(q, key);
                    let res = fetcher
                        .get_text_with_query(&self.spec.endpoint, &params)
                        .await
                        .and_then(|body| parse_response(&body, name));
                    results.push((q.clone(), res));
                }
                results
            }
        };

        Ok(merge_unique(collect_batches(name, results)?))
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn default_country(&self) -> &str {
        &self.spec.country
    }

    fn skip_relevance(&self) -> bool {
        self.spec.skip_relevance
    }
}
