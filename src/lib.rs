// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod relevance;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::pipeline::{Pipeline, PipelineSettings};
pub use crate::store::{open_store, Store};
