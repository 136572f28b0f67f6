// src/ingest/providers/html_scrape.rs
//! Selector-driven scraper for press/news listing pages without a feed.

use anyhow::Result;
use async_trait::async_trait;
use metrics::histogram;
use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    compile_optional, compile_selector, default_country, default_enabled, default_max_items,
    element_text, resolve_link, select_value, Mode,
};
use crate::ingest::http::HttpFetcher;
use crate::ingest::types::{ArticleSource, RawArticle};

fn default_link_selector() -> String {
    "a[href]".to_string()
}

/// CSS selectors applied to a listing page. `item` picks one node per story;
/// the rest are evaluated inside that node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeSelectors {
    pub item: String,
    pub headline: String,
    #[serde(default = "default_link_selector")]
    pub link: String,
    #[serde(default)]
    pub date: Option<String>,
    /// Read the date from this attribute (e.g. `datetime`) instead of the text.
    #[serde(default)]
    pub date_attr: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// `kind = "html"` entry in the sources config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub selectors: ScrapeSelectors,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub skip_relevance: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Extract stories from a listing page. Relative links resolve against `page_url`.
/// Dates are passed through as text; the normalizer decides what they mean.
pub fn parse_page(
    html: &str,
    page_url: &str,
    source: &str,
    selectors: &ScrapeSelectors,
    max_items: usize,
) -> Result<Vec<RawArticle>> {
    let t0 = std::time::Instant::now();

    let item_sel = compile_selector(&selectors.item)?;
    let headline_sel = compile_selector(&selectors.headline)?;
    let link_sel = compile_selector(&selectors.link)?;
    let date_sel = compile_optional(selectors.date.as_deref())?;
    let summary_sel = compile_optional(selectors.summary.as_deref())?;
    let base = Url::parse(page_url).ok();

    let document = Html::parse_document(html);
    let mut out = Vec::new();
    for item in document.select(&item_sel).take(max_items) {
        let headline = item
            .select(&headline_sel)
            .next()
            .map(element_text)
            .filter(|h| !h.is_empty());

        // The item node itself may be the anchor.
        let href = item
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .or_else(|| item.value().attr("href"));
        let url = href.and_then(|h| resolve_link(base.as_ref(), h));

        out.push(RawArticle {
            source: source.to_string(),
            url,
            headline,
            summary: select_value(item, summary_sel.as_ref(), None),
            published: select_value(item, date_sel.as_ref(), selectors.date_attr.as_deref()),
            country: None,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    tracing::debug!(source, count = out.len(), "scraped listing page");
    Ok(out)
}

pub struct ScrapeProvider {
    spec: ScrapeSpec,
    mode: Mode,
}

impl ScrapeProvider {
    pub fn from_fixture_str(spec: ScrapeSpec, html: &str) -> Self {
        Self {
            spec,
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn from_url(spec: ScrapeSpec, fetcher: HttpFetcher) -> Self {
        let url = spec.url.clone();
        Self {
            spec,
            mode: Mode::Http { url, fetcher },
        }
    }
}

#[async_trait]
impl ArticleSource for ScrapeProvider {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>> {
        let body = self.mode.load().await?;
        parse_page(
            &body,
            &self.spec.url,
            &self.spec.name,
            &self.spec.selectors,
            self.spec.max_items,
        )
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
