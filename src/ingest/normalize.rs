// src/ingest/normalize.rs
//! Raw adapter records → canonical `Article` / `Event`.
//!
//! Timestamp parsing never fails: an unparseable value becomes `now` and the
//! result is flagged `estimated` so it stays distinguishable downstream.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use metrics::counter;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::dedup::{article_id, url_key};
use crate::ingest::types::{RawArticle, RawEvent};
use crate::ingest::{normalize_text, HEADLINE_MAX_CHARS, SUMMARY_MAX_CHARS};
use crate::model::{Article, Event, EventStatus};

/// Event type used when the calendar source doesn't give one.
pub const DEFAULT_EVENT_TYPE: &str = "macro release";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
    "%d %B %Y %H:%M",
    "%d %b %Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%m-%d-%Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTime {
    pub at: DateTime<Utc>,
    /// `true` when `at` is the substituted "now".
    pub estimated: bool,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond()))
        .or_else(|| {
            DateTime::parse_from_rfc2822(ts)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Strict parse; `None` on anything unrecognized. Naive values are taken as UTC.
pub fn try_parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(dt) = parse_rfc2822(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Unix seconds
    if s.len() >= 9 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt));
        }
    }
    None
}

/// Tolerant parse: falls back to `now` and flags the result.
pub fn parse_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> ParsedTime {
    match raw.and_then(try_parse_timestamp) {
        Some(at) => ParsedTime {
            at,
            estimated: false,
        },
        None => {
            counter!("ingest_timestamp_fallback_total").increment(1);
            tracing::debug!(raw = ?raw, "timestamp unparseable, substituting now");
            ParsedTime {
                at: now,
                estimated: true,
            }
        }
    }
}

fn clean_country(raw: Option<&str>, default_country: &str) -> String {
    raw.map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(default_country)
        .to_ascii_uppercase()
}

/// Returns `None` for records without a usable headline or URL.
pub fn normalize_article(
    raw: RawArticle,
    default_country: &str,
    now: DateTime<Utc>,
) -> Option<Article> {
    let url = raw.url.as_deref().map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return None;
    }
    let headline = normalize_text(raw.headline.as_deref().unwrap_or_default(), HEADLINE_MAX_CHARS);
    if headline.is_empty() {
        return None;
    }
    let summary = normalize_text(raw.summary.as_deref().unwrap_or_default(), SUMMARY_MAX_CHARS);
    let published = parse_timestamp(raw.published.as_deref(), now);

    Some(Article {
        id: article_id(&url_key(url)),
        source: raw.source,
        url: url.to_string(),
        published_at: published.at,
        published_at_estimated: published.estimated,
        country: clean_country(raw.country.as_deref(), default_country),
        headline,
        summary,
    })
}

/// Returns `None` for records with neither title nor details.
/// Status is frozen here: `Upcoming` iff `date_time >= now - grace`.
pub fn normalize_event(
    raw: RawEvent,
    default_country: &str,
    now: DateTime<Utc>,
    grace: Duration,
) -> Option<Event> {
    let title = normalize_text(raw.title.as_deref().unwrap_or_default(), HEADLINE_MAX_CHARS);
    let extra = normalize_text(raw.details.as_deref().unwrap_or_default(), SUMMARY_MAX_CHARS);
    let details = match (title.is_empty(), extra.is_empty()) {
        (true, true) => return None,
        (false, true) => title,
        (true, false) => extra,
        (false, false) => format!("{title} ({extra})"),
    };

    let when = parse_timestamp(raw.when.as_deref(), now);
    let event_type = raw
        .event_type
        .map(|t| normalize_text(&t, 64))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());

    Some(Event {
        source: raw.source,
        date_time: when.at,
        country: clean_country(raw.country.as_deref(), default_country),
        event_type,
        details,
        source_link: raw.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
        impact: raw.impact.map(|i| i.trim().to_string()).filter(|i| !i.is_empty()),
        status: EventStatus::at(when.at, now, grace),
    })
}
