// src/ingest/http.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const USER_AGENT: &str = concat!("macro-news-analyst/", env!("CARGO_PKG_VERSION"));

/// Shared outbound client for every adapter. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }

    /// GET and return the body; non-2xx is an error.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET {url} status"))?;
        resp.text()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET {url} .text()"))
    }

    /// GET with query params. Non-2xx becomes an error carrying a body snippet.
    /// Errors name `url` only, never the query, which may carry credentials.
    pub async fn get_text_with_query(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET {url} .text()"))?;
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            bail!("GET {url} returned {status}: {snippet}");
        }
        Ok(body)
    }
}
