// src/relevance.rs
//! Keyword relevance gate: case-insensitive substring match of any configured
//! keyword against `headline + " " + summary`. Stateless.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

// --- env defaults & names ---
pub const DEFAULT_RELEVANCE_CONFIG_PATH: &str = "config/relevance.toml";
pub const ENV_RELEVANCE_CONFIG_PATH: &str = "MACRO_RELEVANCE_PATH";

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceRoot {
    pub relevance: RelevanceSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceSection {
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Compiled keyword list (lowercased, trimmed, deduplicated).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kw: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        kw.sort();
        kw.dedup();
        Self { keywords: kw }
    }

    /// A filter that accepts everything.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Load from `$MACRO_RELEVANCE_PATH`, else `config/relevance.toml`,
    /// else the built-in seed. An env path that doesn't exist is an error.
    pub fn from_toml() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_RELEVANCE_CONFIG_PATH) {
            let path = PathBuf::from(p);
            if !path.exists() {
                anyhow::bail!(
                    "{ENV_RELEVANCE_CONFIG_PATH} points to non-existent path {}",
                    path.display()
                );
            }
            return Self::from_path(&path);
        }
        let default = PathBuf::from(DEFAULT_RELEVANCE_CONFIG_PATH);
        if default.exists() {
            return Self::from_path(&default);
        }
        tracing::info!("no relevance config found, using built-in keywords");
        Ok(Self::default_seed())
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read relevance config at {}: {}",
                path.display(),
                e
            )
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: RelevanceRoot = toml::from_str(toml_str)?;
        Ok(Self::new(cfg.relevance.keywords))
    }

    /// Built-in macro keyword list, used when no config file exists.
    pub fn default_seed() -> Self {
        Self::new([
            "inflation",
            "cpi",
            "hicp",
            "gdp",
            "interest rate",
            "rates",
            "central bank",
            "ecb",
            "federal reserve",
            "fomc",
            "bank of england",
            "monetary policy",
            "budget",
            "deficit",
            "debt",
            "bond",
            "auction",
            "treasury",
            "yield",
            "unemployment",
            "payrolls",
            "labour market",
            "labor market",
            "pmi",
            "tariff",
            "trade balance",
            "recession",
            "eurozone",
            "euro area",
        ])
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// First keyword found in `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let hay = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| hay.contains(k.as_str()))
            .map(String::as_str)
    }

    /// Empty keyword list accepts everything.
    pub fn accepts(&self, headline: &str, summary: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        self.first_match(&format!("{headline} {summary}")).is_some()
    }
}

/* ----------------------------
Tests
---------------------------- */
