// tests/providers_calendar.rs
use chrono::{Duration, TimeZone, Utc};

use macro_news_analyst::ingest::normalize_event;
use macro_news_analyst::ingest::providers::calendar_html::{
    CalendarHtmlProvider, CalendarHtmlSpec, CalendarSelectors,
};
use macro_news_analyst::ingest::providers::calendar_json::{
    currency_to_country, parse_calendar_json, CalendarJsonProvider, CalendarJsonSpec,
};
use macro_news_analyst::ingest::EventSource;
use macro_news_analyst::model::EventStatus;

const FF_JSON: &str = include_str!("fixtures/ff_calendar.json");
const AUCTIONS_HTML: &str = include_str!("fixtures/auction_calendar.html");

fn json_spec(impacts: &[&str], countries: &[&str]) -> CalendarJsonSpec {
    CalendarJsonSpec {
        name: "Economic Calendar".into(),
        url: "https://nfs.faireconomy.media/ff_calendar_thisweek.json".into(),
        impacts: impacts.iter().map(|s| s.to_string()).collect(),
        countries: countries.iter().map(|s| s.to_string()).collect(),
        event_type: "macro release".into(),
        enabled: true,
    }
}

#[test]
fn impact_filter_and_currency_mapping() {
    let rows = parse_calendar_json(FF_JSON, &json_spec(&["high", "MEDIUM"], &[])).unwrap();
    let got: Vec<_> = rows
        .iter()
        .map(|r| (r.title.as_deref().unwrap_or_default(), r.country.as_deref().unwrap_or_default()))
        .collect();
    assert_eq!(
        got,
        vec![
            ("CPI m/m", "US"),
            ("Main Refinancing Rate", "EU"),
            ("Retail Sales m/m", "GB"),
        ]
    );
    assert_eq!(rows[0].details.as_deref(), Some("forecast 0.3%, previous 0.5%"));
    assert_eq!(rows[0].impact.as_deref(), Some("High"));
}

#[test]
fn country_filter_applies_after_mapping() {
    let rows = parse_calendar_json(FF_JSON, &json_spec(&[], &["eu"])).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title.as_deref(), Some("Main Refinancing Rate"));
    assert_eq!(currency_to_country("chf"), "CH");
    assert_eq!(currency_to_country("sek"), "SEK");
}

#[tokio::test]
async fn normalized_json_events_carry_status_and_utc_time() {
    let p = CalendarJsonProvider::from_fixture_str(json_spec(&["High"], &[]), FF_JSON);
    let raw = p.fetch_events().await.unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let events: Vec<_> = raw
        .into_iter()
        .filter_map(|r| normalize_event(r, p.default_country(), now, Duration::seconds(300)))
        .collect();

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].date_time,
        Utc.with_ymd_and_hms(2025, 3, 12, 12, 30, 0).unwrap()
    );
    assert_eq!(events[0].status, EventStatus::Upcoming);
    assert_eq!(events[0].details, "CPI m/m (forecast 0.3%, previous 0.5%)");
    assert_eq!(events[1].status, EventStatus::Released);
    assert_eq!(events[1].country, "EU");
}

#[tokio::test]
async fn html_calendar_rows_use_source_country_as_default() {
    let spec = CalendarHtmlSpec {
        name: "AFT Auctions".into(),
        url: "https://www.aft.gouv.fr/en/auction-calendar".into(),
        country: "FR".into(),
        event_type: Some("auction".into()),
        selectors: CalendarSelectors {
            row: "tr.auction".into(),
            datetime: "td.when time".into(),
            datetime_attr: Some("datetime".into()),
            title: "td.what".into(),
            country: Some("td.ctry".into()),
            details: Some("td.amount".into()),
            link: Some("td.what a".into()),
        },
        enabled: true,
    };
    let p = CalendarHtmlProvider::from_fixture_str(spec, AUCTIONS_HTML);
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let events: Vec<_> = p
        .fetch_events()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| normalize_event(r, p.default_country(), now, Duration::seconds(300)))
        .collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].country, "FR");
    assert_eq!(events[0].event_type, "auction");
    assert_eq!(events[0].details, "Long-term OAT (EUR 11-12bn)");
    assert_eq!(
        events[0].source_link.as_deref(),
        Some("https://www.aft.gouv.fr/en/auction/oat-long")
    );
    assert_eq!(events[0].status, EventStatus::Released);
    // empty country cell falls back to the source default
    assert_eq!(events[1].country, "FR");
    assert_eq!(events[1].details, "BTF");
    assert_eq!(events[1].status, EventStatus::Upcoming);
}
