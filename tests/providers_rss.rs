// tests/providers_rss.rs
use macro_news_analyst::ingest::providers::rss::{parse_feed, FeedProvider, FeedSpec};
use macro_news_analyst::ingest::ArticleSource;

// 'static fixtures via include_str! so no filesystem access at runtime.
const ECB_XML: &str = include_str!("fixtures/ecb_press.xml");
const BOE_ATOM: &str = include_str!("fixtures/boe_atom.xml");

fn spec(max_items: usize) -> FeedSpec {
    FeedSpec {
        name: "ECB Press".into(),
        url: "https://www.ecb.europa.eu/rss/press.html".into(),
        country: "EU".into(),
        max_items,
        skip_relevance: false,
        enabled: true,
    }
}

#[tokio::test]
async fn rss_fixture_yields_items_with_links_and_dates() {
    let p = FeedProvider::from_fixture_str(spec(20), ECB_XML);
    assert_eq!(p.name(), "ECB Press");
    assert_eq!(p.default_country(), "EU");

    let items = p.fetch_articles().await.expect("ecb rss parses");
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|a| a.source == "ECB Press"));
    assert!(items.iter().all(|a| a.url.is_some()));
    assert_eq!(
        items[0].published.as_deref(),
        Some("Thu, 06 Mar 2025 13:15:00 +0100")
    );
    // CDATA markup is kept raw; cleaning happens in the normalizer
    assert!(items[0].summary.as_deref().unwrap_or_default().contains("<p>"));
}

#[test]
fn max_items_keeps_the_most_recent_entries() {
    let items = parse_feed(ECB_XML, "ECB Press", 2).unwrap();
    assert_eq!(items.len(), 2);
    // both 6 March entries beat the older ones and the undated survey
    assert_eq!(items[0].headline.as_deref(), Some("Monetary policy decisions"));
    assert!(items
        .iter()
        .all(|i| i.published.as_deref() == Some("Thu, 06 Mar 2025 13:15:00 +0100")));
}

#[test]
fn atom_entries_pick_alternate_link_and_fall_back_to_updated() {
    let items = parse_feed(BOE_ATOM, "Bank of England", 20).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0].url.as_deref(),
        Some("https://www.bankofengland.co.uk/monetary-policy-summary-and-minutes/2025/march-2025")
    );
    assert_eq!(items[0].published.as_deref(), Some("2025-03-20T12:00:00Z"));
    assert_eq!(items[1].published.as_deref(), Some("2025-03-18T09:30:00Z"));
    assert_eq!(items[1].summary, None);
}

#[tokio::test]
async fn garbage_body_is_an_adapter_error() {
    let p = FeedProvider::from_fixture_str(spec(20), "<html><body>maintenance</body>");
    assert!(p.fetch_articles().await.is_err());
}
