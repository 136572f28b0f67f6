//! Macro News Analyst: binary entrypoint.
//! Loads config, opens the store, wires sources into the pipeline and serves
//! the Axum API.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use macro_news_analyst::config::AppConfig;
use macro_news_analyst::ingest::config::{build_sources, load_sources_default};
use macro_news_analyst::ingest::http::HttpFetcher;
use macro_news_analyst::metrics::Metrics;
use macro_news_analyst::relevance::KeywordFilter;
use macro_news_analyst::{open_store, router, AppState, Pipeline, PipelineSettings};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("macro_news_analyst=info,warn"));

    let (json_layer, text_layer) = if json {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer().compact()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::from_env();
    init_tracing(cfg.log_json);

    // Store failure is fatal before serving.
    let store = open_store(&cfg.db_path)
        .with_context(|| format!("opening store at {}", cfg.db_path))?;

    let metrics = Metrics::init()?;
    let fetcher = HttpFetcher::new(cfg.http_timeout)?;

    let sources = load_sources_default()?;
    let built = build_sources(&sources, &fetcher);
    let relevance = KeywordFilter::from_toml()?;
    tracing::info!(keywords = relevance.keywords().len(), "relevance filter loaded");

    let settings = PipelineSettings {
        event_grace: chrono::Duration::seconds(cfg.event_grace_secs),
        ..PipelineSettings::default()
    };
    let pipeline = Arc::new(
        Pipeline::new(store)
            .with_article_sources(built.articles)
            .with_event_sources(built.events)
            .with_relevance(relevance)
            .with_settings(settings),
    );

    if cfg.run_on_start {
        let p = pipeline.clone();
        tokio::spawn(async move {
            match p.run_once().await {
                Ok(s) => tracing::info!(run_id = %s.run_id, new_items = s.new_items, "startup run done"),
                Err(e) => tracing::warn!(error = ?e, "startup run failed"),
            }
        });
    }

    let app = router(AppState::new(pipeline)).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
