// src/ingest/providers/calendar_html.rs
use anyhow::Result;
use async_trait::async_trait;
use metrics::histogram;
use scraper::Html;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    compile_optional, compile_selector, default_country, default_enabled, resolve_link,
    select_value, Mode,
};
use crate::ingest::http::HttpFetcher;
use crate::ingest::types::{EventSource, RawEvent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSelectors {
    pub row: String,
    pub datetime: String,
    #[serde(default)]
    pub datetime_attr: Option<String>,
    pub title: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// `kind = "calendar_html"` entry in the sources config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarHtmlSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub event_type: Option<String>,
    pub selectors: CalendarSelectors,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

pub fn parse_calendar_page(html: &str, spec: &CalendarHtmlSpec) -> Result<Vec<RawEvent>> {
    let t0 = std::time::Instant::now();
    let sel = &spec.selectors;
    let row_sel = compile_selector(&sel.row)?;
    let when_sel = compile_selector(&sel.datetime)?;
    let title_sel = compile_selector(&sel.title)?;
    let country_sel = compile_optional(sel.country.as_deref())?;
    let details_sel = compile_optional(sel.details.as_deref())?;
    let link_sel = compile_optional(sel.link.as_deref())?;
    let base = Url::parse(&spec.url).ok();

    let document = Html::parse_document(html);
    let mut out = Vec::new();
    for row in document.select(&row_sel) {
        let title = select_value(row, Some(&title_sel), None);
        // header rows and spacer rows have no title cell
        if title.is_none() {
            continue;
        }
        let link = select_value(row, link_sel.as_ref(), Some("href"))
            .and_then(|h| resolve_link(base.as_ref(), &h));

        out.push(RawEvent {
            source: spec.name.clone(),
            when: select_value(row, Some(&when_sel), sel.datetime_attr.as_deref()),
            country: select_value(row, country_sel.as_ref(), None),
            event_type: spec.event_type.clone(),
            title,
            details: select_value(row, details_sel.as_ref(), None),
            link,
            impact: None,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

pub struct CalendarHtmlProvider {
    spec: CalendarHtmlSpec,
    mode: Mode,
}

impl CalendarHtmlProvider {
    pub fn from_fixture_str(spec: CalendarHtmlSpec, html: &str) -> Self {
        Self {
            spec,
            mode: Mode::Fixture(html.to_string()),
        }
    }

    pub fn from_url(spec: CalendarHtmlSpec, fetcher: HttpFetcher) -> Self {
        let url = spec.url.clone();
        Self {
            spec,
            mode: Mode::Http { url, fetcher },
        }
    }
}

#[async_trait]
impl EventSource for CalendarHtmlProvider {
    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        let body = self.mode.load().await?;
        parse_calendar_page(&body, &self.spec)
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn default_country(&self) -> &str {
        &self.spec.country
    }
}
