// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};

use super::{default_country, default_enabled, default_max_items, Mode};
use crate::ingest::http::HttpFetcher;
use crate::ingest::normalize::try_parse_timestamp;
use crate::ingest::scrub_html_entities_for_xml;
use crate::ingest::types::{ArticleSource, RawArticle};

/// `kind = "rss"` entry in the sources config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "default_country")]
    pub country: String,
    /// Keep only the N most recent entries. Undated entries rank last.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub skip_relevance: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "@isPermaLink")]
    is_perma_link: Option<String>,
    #[serde(rename = "$text", default)]
    value: String,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

fn looks_like_atom(xml: &str) -> bool {
    match (xml.find("<rss"), xml.find("<feed")) {
        (None, Some(_)) => true,
        (Some(r), Some(f)) => f < r,
        _ => false,
    }
}

fn rss_items(xml: &str, source: &str) -> Result<Vec<RawArticle>> {
    let rss: Rss = from_str(xml).with_context(|| format!("parsing {source} rss xml"))?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| {
            // guid doubles as the link when it's a permalink
            let guid_link = it.guid.and_then(|g| {
                let perma = g
                    .is_perma_link
                    .as_deref()
                    .map_or(true, |p| p.eq_ignore_ascii_case("true"));
                (perma && g.value.trim().starts_with("http")).then(|| g.value.trim().to_string())
            });
            RawArticle {
                source: source.to_string(),
                url: it.link.filter(|l| !l.trim().is_empty()).or(guid_link),
                headline: it.title,
                summary: it.description,
                published: it.pub_date.or(it.dc_date),
                country: None,
            }
        })
        .collect())
}

fn atom_entries(xml: &str, source: &str) -> Result<Vec<RawArticle>> {
    let feed: AtomFeed = from_str(xml).with_context(|| format!("parsing {source} atom xml"))?;
    Ok(feed
        .entry
        .into_iter()
        .map(|e| {
            let link = e
                .links
                .iter()
                .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                .or_else(|| e.links.first())
                .and_then(|l| l.href.clone());
            RawArticle {
                source: source.to_string(),
                url: link,
                headline: e.title.map(|t| t.value),
                summary: e.summary.or(e.content).map(|t| t.value),
                published: e.published.or(e.updated),
                country: None,
            }
        })
        .collect())
}

/// Keep the `max_items` most recent entries, in document order.
/// Unparseable dates rank below every dated entry.
fn keep_most_recent(items: Vec<RawArticle>, max_items: usize) -> Vec<RawArticle> {
    if items.len() <= max_items {
        return items;
    }
    let mut ranked: Vec<(usize, Option<_>)> = items
        .iter()
        .enumerate()
        .map(|(i, a)| (i, a.published.as_deref().and_then(try_parse_timestamp)))
        .collect();
    // stable: ties keep feed order; `None` sorts after any timestamp
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let mut keep = vec![false; items.len()];
    for (i, _) in ranked.into_iter().take(max_items) {
        keep[i] = true;
    }
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(a, k)| k.then_some(a))
        .collect()
}

/// Parse an RSS 2.0 or Atom body, keeping the `max_items` most recent entries.
pub fn parse_feed(xml: &str, source: &str, max_items: usize) -> Result<Vec<RawArticle>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let mut out = if looks_like_atom(&xml_clean) {
        atom_entries(&xml_clean, source)?
    } else {
        rss_items(&xml_clean, source)?
    };
    out = keep_most_recent(out, max_items);

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

pub struct FeedProvider {
    spec: FeedSpec,
    mode: Mode,
}

impl FeedProvider {
    pub fn from_fixture_str(spec: FeedSpec, xml: &str) -> Self {
        Self {
            spec,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(spec: FeedSpec, fetcher: HttpFetcher) -> Self {
        let url = spec.url.clone();
        Self {
            spec,
            mode: Mode::Http { url, fetcher },
        }
    }
}

#[async_trait]
impl ArticleSource for FeedProvider {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        let body = self.mode.load().await?;
        parse_feed(&body, &self.spec.name, self.spec.max_items)
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
