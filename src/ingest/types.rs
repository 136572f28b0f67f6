// src/ingest/types.rs
use anyhow::Result;

/// Country code used when neither the source nor the record carries one.
pub const UNKNOWN_COUNTRY: &str = "XX";

/// Article fields as the adapter found them, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    pub source: String,
    pub url: Option<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    /// Unparsed timestamp text (RFC 2822, RFC 3339, or something looser).
    pub published: Option<String>,
    pub country: Option<String>,
}

/// Calendar fields as the adapter found them, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEvent {
    pub source: String,
    pub when: Option<String>,
    pub country: Option<String>,
    pub event_type: Option<String>,
    pub title: Option<String>,
    pub details: Option<String>,
    pub link: Option<String>,
    pub impact: Option<String>,
}

#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_articles(&self) -> Result<Vec<RawArticle>>;
    fn name(&self) -> &str;

    /// Country assigned to records that don't carry their own.
    fn default_country(&self) -> &str {
        UNKNOWN_COUNTRY
    }

    /// Sources opt out of the keyword gate explicitly (e.g. a feed that is
    /// already topic-scoped).
    fn skip_relevance(&self) -> bool {
        false
    }
}

#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<RawEvent>>;
    fn name(&self) -> &str;

    fn default_country(&self) -> &str {
        UNKNOWN_COUNTRY
    }
}
