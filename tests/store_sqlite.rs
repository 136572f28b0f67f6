// tests/store_sqlite.rs
use chrono::{Duration, TimeZone, Utc};

use macro_news_analyst::model::{ActionBias, Article, Brief, Event, EventStatus, RunLog};
use macro_news_analyst::store::{open_store, SqliteStore, Store, MEMORY_DSN};

fn article(n: i64) -> Article {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    Article {
        id: format!("{n:012x}"),
        source: "ECB Press".into(),
        url: format!("https://example.test/{n}"),
        published_at: base + Duration::minutes(n),
        published_at_estimated: n % 2 == 0,
        country: "EU".into(),
        headline: format!("Headline {n}"),
        summary: "summary".into(),
    }
}

fn brief(run_id: &str, mins: i64) -> Brief {
    Brief {
        run_id: run_id.into(),
        created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(mins),
        article_ids: vec!["aaa".into(), "bbb".into()],
        what_happened: "A; B".into(),
        why_it_matters: "why".into(),
        action_bias: ActionBias::Observe,
        confidence: 0.6,
        risks: "risks".into(),
        links: vec!["https://example.test/a".into()],
    }
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("macro.sqlite");

    {
        let s = SqliteStore::open(&path).unwrap();
        assert_eq!(s.insert_articles(&[article(1), article(2), article(3)]).unwrap(), 3);
    }

    let s = SqliteStore::open(&path).unwrap();
    let urls = s.article_urls().unwrap();
    assert_eq!(urls.len(), 3);
    assert!(urls.contains("https://example.test/2"));

    let page = s.recent_articles(2, 0).unwrap();
    assert_eq!(page, vec![article(3), article(2)]);
    let rest = s.recent_articles(2, 2).unwrap();
    assert_eq!(rest, vec![article(1)]);
}

#[test]
fn events_window_is_inclusive_and_sorted() {
    let s = SqliteStore::open_in_memory().unwrap();
    let t0 = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
    let ev = |h: i64, status: EventStatus| Event {
        source: "Economic Calendar".into(),
        date_time: t0 + Duration::hours(h),
        country: "US".into(),
        event_type: "macro release".into(),
        details: format!("h{h}"),
        source_link: (h == 24).then(|| "https://example.test/cpi".to_string()),
        impact: Some("High".into()),
        status,
    };
    s.insert_events(&[
        ev(30, EventStatus::Upcoming),
        ev(24, EventStatus::Upcoming),
        ev(1, EventStatus::Released),
        ev(0, EventStatus::Released),
    ])
    .unwrap();

    let got = s
        .events_between(t0 + Duration::hours(1), t0 + Duration::hours(24))
        .unwrap();
    assert_eq!(got, vec![ev(1, EventStatus::Released), ev(24, EventStatus::Upcoming)]);
}

#[test]
fn briefs_and_run_logs_newest_first() {
    let s = SqliteStore::open_in_memory().unwrap();
    s.insert_brief(&brief("run-a", 0)).unwrap();
    s.insert_brief(&brief("run-b", 5)).unwrap();
    let briefs = s.recent_briefs(1).unwrap();
    assert_eq!(briefs, vec![brief("run-b", 5)]);

    let started = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let log = |id: &str, mins: i64, finished: bool| RunLog {
        run_id: id.into(),
        started_at: started + Duration::minutes(mins),
        finished_at: finished.then(|| started + Duration::minutes(mins + 1)),
        items_in: 12,
        items_out: 7,
        new_items: 3,
        events_in: 4,
        sources_total: 6,
        sources_failed: 1,
        latency_ms: 1_234,
    };
    s.insert_run_log(&log("r1", 0, true)).unwrap();
    s.insert_run_log(&log("r2", 10, false)).unwrap();
    assert_eq!(
        s.recent_run_logs(10).unwrap(),
        vec![log("r2", 10, false), log("r1", 0, true)]
    );
}

#[test]
fn dsn_selects_backend() {
    let mem = open_store(MEMORY_DSN).unwrap();
    assert!(mem.article_urls().unwrap().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.sqlite");
    let file = open_store(path.to_str().unwrap()).unwrap();
    file.insert_articles(&[article(9)]).unwrap();
    assert!(path.exists());
}
