// src/ingest/mod.rs
pub mod config;
pub mod dedup;
pub mod http;
pub mod normalize;
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use dedup::{url_key, Deduplicator};
pub use normalize::{normalize_article, normalize_event, parse_timestamp, ParsedTime};
pub use types::{ArticleSource, EventSource, RawArticle, RawEvent};

/// Max chars kept for a headline after cleanup.
pub const HEADLINE_MAX_CHARS: usize = 300;
/// Max chars kept for summaries and event details.
pub const SUMMARY_MAX_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_items_total",
            "Candidate articles returned by source adapters."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Articles dropped by the keyword relevance filter."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Articles dropped because their URL was already seen."
        );
        describe_counter!("ingest_new_total", "Articles stored as new.");
        describe_counter!("ingest_events_total", "Calendar events stored.");
        describe_counter!(
            "ingest_source_errors_total",
            "Source adapter fetch/parse errors."
        );
        describe_counter!(
            "ingest_timestamp_fallback_total",
            "Records whose timestamp could not be parsed and was replaced by now."
        );
        describe_counter!("ingest_runs_total", "Completed pipeline runs.");
        describe_histogram!("ingest_parse_ms", "Adapter parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the ingest pipeline last completed."
        );
    });
}

/// Clean scraped/feed text: decode entities, strip tags, fold quotes,
/// collapse whitespace and cap the length at `max_chars`.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags (feeds often double-escape markup in <description>)
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect::<String>().trim_end().to_string();
    }

    out
}

/// Some feeds ship HTML named entities that XML parsers reject.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
        .replace("&euro;", "EUR ")
        .replace("&pound;", "GBP ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_entities() {
        let s = "  Hello,&nbsp;&nbsp; world!  ";
        assert_eq!(normalize_text(s, 100), "Hello, world!");
    }

    #[test]
    fn normalize_text_keeps_headline_punctuation() {
        assert_eq!(
            normalize_text("Will the ECB cut again?", 100),
            "Will the ECB cut again?"
        );
    }

    #[test]
    fn normalize_text_strips_tags_between_words() {
        assert_eq!(normalize_text("<p>CPI</p><p>rises</p>", 100), "CPI rises");
    }

    #[test]
    fn normalize_text_caps_length() {
        let out = normalize_text(&"ab ".repeat(100), 10);
        assert!(out.chars().count() <= 10);
        assert!(!out.ends_with(' '));
    }

    #[test]
    fn scrub_replaces_named_entities() {
        let s = scrub_html_entities_for_xml("<t>A&nbsp;&ndash;&nbsp;B &ldquo;x&rdquo;</t>");
        assert_eq!(s, "<t>A - B \"x\"</t>");
    }
}
