// src/ingest/dedup.rs
//! URL-keyed dedup across runs and within a batch.
//!
//! Keys are canonical URLs: lowercase scheme/host (via `url`), no fragment,
//! no `utm_*` params, no trailing slash on the path. Unparseable input is
//! keyed by its trimmed raw text.

use std::collections::HashSet;

use url::Url;

use crate::model::Article;

pub fn url_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };
    if url.cannot_be_a_base() {
        return trimmed.to_string();
    }

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.to_ascii_lowercase().starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

/// Short stable id: first 6 bytes of SHA-256 over the key, hex encoded.
pub fn article_id(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    /// Seed with URLs already present in the store.
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            seen: urls.into_iter().map(|u| url_key(u.as_ref())).collect(),
        }
    }

    /// Records the URL; `false` if it was already seen.
    pub fn admit(&mut self, url: &str) -> bool {
        self.seen.insert(url_key(url))
    }

    /// Keeps first occurrences of unseen URLs, preserving order.
    /// Returns (kept, dropped_count).
    pub fn dedup(&mut self, articles: Vec<Article>) -> (Vec<Article>, usize) {
        let mut dropped = 0usize;
        let mut keep = Vec::with_capacity(articles.len());
        for a in articles {
            if self.admit(&a.url) {
                keep.push(a);
            } else {
                dropped += 1;
            }
        }
        (keep, dropped)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
