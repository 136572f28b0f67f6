use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use tower_http::cors::CorsLayer;

use crate::model::{Article, Brief, Event, RunLog, RunSummary};
use crate::pipeline::Pipeline;

pub const DEFAULT_ARTICLES_LIMIT: usize = 20;
pub const MAX_ARTICLES_LIMIT: usize = 200;
pub const DEFAULT_EVENT_HOURS: i64 = 24;
pub const MAX_EVENT_HOURS: i64 = 168;
pub const DEFAULT_BRIEFS_LIMIT: usize = 5;
pub const DEFAULT_RUNS_LIMIT: usize = 10;
const MAX_LIST_LIMIT: usize = 200;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

/// Dashboard-facing routes. `/metrics` is mounted separately by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/run", post(run))
        .route("/articles", get(articles))
        .route("/events", get(events))
        .route("/briefs", get(briefs))
        .route("/runs", get(runs))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Store or run failure, rendered as a plain-text 500.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self.0, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn run(State(state): State<AppState>) -> ApiResult<RunSummary> {
    let summary = state.pipeline.run_once().await?;
    Ok(Json(summary))
}

#[derive(Debug, Default, serde::Deserialize)]
struct PageQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn articles(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Vec<Article>> {
    let limit = q
        .limit
        .unwrap_or(DEFAULT_ARTICLES_LIMIT)
        .clamp(1, MAX_ARTICLES_LIMIT);
    let offset = q.offset.unwrap_or(0);
    Ok(Json(state.pipeline.store().recent_articles(limit, offset)?))
}

#[derive(Debug, Default, serde::Deserialize)]
struct HorizonQuery {
    hours: Option<i64>,
}

/// Events in `[now, now + hours]`, ascending.
async fn events(
    State(state): State<AppState>,
    Query(q): Query<HorizonQuery>,
) -> ApiResult<Vec<Event>> {
    let hours = q.hours.unwrap_or(DEFAULT_EVENT_HOURS).clamp(1, MAX_EVENT_HOURS);
    let now = Utc::now();
    let rows = state
        .pipeline
        .store()
        .events_between(now, now + Duration::hours(hours))?;
    Ok(Json(rows))
}

#[derive(Debug, Default, serde::Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn briefs(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> ApiResult<Vec<Brief>> {
    let limit = q.limit.unwrap_or(DEFAULT_BRIEFS_LIMIT).clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.pipeline.store().recent_briefs(limit)?))
}

async fn runs(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> ApiResult<Vec<RunLog>> {
    let limit = q.limit.unwrap_or(DEFAULT_RUNS_LIMIT).clamp(1, MAX_LIST_LIMIT);
    Ok(Json(state.pipeline.store().recent_run_logs(limit)?))
}
