// src/ingest/providers/calendar_json.rs
//! Weekly economic calendar published as a JSON array
//! (`[{title, country, date, impact, forecast, previous}]`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use serde::{Deserialize, Serialize};

use super::{default_enabled, Mode};
use crate::ingest::http::HttpFetcher;
use crate::ingest::normalize::DEFAULT_EVENT_TYPE;
use crate::ingest::types::{EventSource, RawEvent, UNKNOWN_COUNTRY};

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_string()
}

/// `kind = "calendar_json"` entry in the sources config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarJsonSpec {
    pub name: String,
    pub url: String,
    /// Keep only these impact levels (case-insensitive); empty keeps all.
    #[serde(default)]
    pub impacts: Vec<String>,
    /// Keep only these country codes (after currency mapping); empty keeps all.
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
struct CalendarRow {
    title: Option<String>,
    country: Option<String>,
    date: Option<String>,
    impact: Option<String>,
    forecast: Option<String>,
    previous: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// The calendar labels rows by currency; events are keyed by country.
pub fn currency_to_country(code: &str) -> String {
    let c = code.trim().to_ascii_uppercase();
    let mapped = match c.as_str() {
        "USD" => "US",
        "EUR" => "EU",
        "GBP" => "GB",
        "JPY" => "JP",
        "CAD" => "CA",
        "AUD" => "AU",
        "NZD" => "NZ",
        "CHF" => "CH",
        "CNY" => "CN",
        "ALL" => "XX",
        _ => return c,
    };
    mapped.to_string()
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_calendar_json(body: &str, spec: &CalendarJsonSpec) -> Result<Vec<RawEvent>> {
    let t0 = std::time::Instant::now();
    let rows: Vec<CalendarRow> =
        serde_json::from_str(body).with_context(|| format!("parsing {} calendar json", spec.name))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let impact = non_empty(row.impact.as_deref()).map(str::to_string);
        if !spec.impacts.is_empty() {
            let keep = impact
                .as_deref()
                .is_some_and(|i| spec.impacts.iter().any(|w| w.eq_ignore_ascii_case(i)));
            if !keep {
                continue;
            }
        }

        let country = non_empty(row.country.as_deref())
            .map(currency_to_country)
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
        if !spec.countries.is_empty()
            && !spec.countries.iter().any(|c| c.eq_ignore_ascii_case(&country))
        {
            continue;
        }

        let mut parts = Vec::new();
        if let Some(f) = non_empty(row.forecast.as_deref()) {
            parts.push(format!("forecast {f}"));
        }
        if let Some(p) = non_empty(row.previous.as_deref()) {
            parts.push(format!("previous {p}"));
        }

        out.push(RawEvent {
            source: spec.name.clone(),
            when: row.date,
            country: Some(country),
            event_type: Some(spec.event_type.clone()),
            title: row.title,
            details: (!parts.is_empty()).then(|| parts.join(", ")),
            link: row.url,
            impact,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

pub struct CalendarJsonProvider {
    spec: CalendarJsonSpec,
    mode: Mode,
}

impl CalendarJsonProvider {
    pub fn from_fixture_str(spec: CalendarJsonSpec, body: &str) -> Self {
        Self {
            spec,
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(spec: CalendarJsonSpec, fetcher: HttpFetcher) -> Self {
        let url = spec.url.clone();
        Self {
            spec,
            mode: Mode::Http { url, fetcher },
        }
    }
}

#[async_trait]
impl EventSource for CalendarJsonProvider {
    async fn fetch_events(&self) -> Result<Vec<RawEvent>> {
        let body = self.mode.load().await?;
        parse_calendar_json(&body, &self.spec)
    }

    fn name(&self) -> &str {
        &self.spec.name
    }
}
