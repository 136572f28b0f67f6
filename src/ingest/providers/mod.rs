// src/ingest/providers/mod.rs
//! Source adapters. Each one fetches a body (HTTP, or a fixture string in
//! tests) and parses it into raw records; normalization happens in the
//! pipeline.
//!
//! | kind            | adapter                         | body            |
//! |-----------------|---------------------------------|-----------------|
//! | `rss`           | [`rss::FeedProvider`]           | RSS 2.0 / Atom  |
//! | `html`          | [`html_scrape::ScrapeProvider`] | HTML page       |
//! | `news_api`      | [`news_api::NewsApiProvider`]   | JSON (per query)|
//! | `calendar_json` | [`calendar_json::CalendarJsonProvider`] | JSON array |
//! | `calendar_html` | [`calendar_html::CalendarHtmlProvider`] | HTML table |

pub mod calendar_html;
pub mod calendar_json;
pub mod html_scrape;
pub mod news_api;
pub mod rss;

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Selector};
use url::Url;

use crate::ingest::http::HttpFetcher;
use crate::ingest::types::UNKNOWN_COUNTRY;

pub(crate) fn default_enabled() -> bool {
    true
}

pub(crate) fn default_country() -> String {
    UNKNOWN_COUNTRY.to_string()
}

pub(crate) fn default_max_items() -> usize {
    20
}

/// Where an adapter gets its body from.
pub(crate) enum Mode {
    // Own copy, so tests can hand in any &str.
    Fixture(String),
    Http { url: String, fetcher: HttpFetcher },
}

impl Mode {
    pub(crate) async fn load(&self) -> Result<String> {
        match self {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, fetcher } => fetcher.get_text(url).await,
        }
    }
}

pub(crate) fn compile_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid css selector `{css}`: {e:?}"))
}

pub(crate) fn compile_optional(css: Option<&str>) -> Result<Option<Selector>> {
    css.map(compile_selector).transpose()
}

/// Visible text of an element, pieces joined by single spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text (or `attr` value) of the first match of `sel` under `scope`.
pub(crate) fn select_value(
    scope: ElementRef<'_>,
    sel: Option<&Selector>,
    attr: Option<&str>,
) -> Option<String> {
    let el = sel.and_then(|s| scope.select(s).next())?;
    let v = match attr {
        Some(a) => el.value().attr(a)?.trim().to_string(),
        None => element_text(el),
    };
    (!v.is_empty()).then_some(v)
}

/// Resolve `href` against the page URL; absolute hrefs pass through.
pub(crate) fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    match base {
        Some(b) => b.join(href).ok().map(|u| u.to_string()),
        None => Url::parse(href).ok().map(|u| u.to_string()),
    }
}
