//! TOML configuration parsing and validation.
//!
//! ```toml
//! [api]
//! base_url = "https://api.example.com/v1"
//! timeout_secs = 15
//!
//! [paging]
//! page_size = 20
//!
//! [search]
//! debounce_ms = 500
//!
//! [company]
//! name = "Loja Central"
//! ```
//!
//! Only `[api].base_url` is required. See [`load_config`] for the
//! validation rules.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub use bizdesk_core::invoice::CompanyProfile;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub company: CompanyProfile,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if !(config.api.base_url.starts_with("http://") || config.api.base_url.starts_with("https://"))
    {
        anyhow::bail!(
            "api.base_url must start with http:// or https:// (got '{}')",
            config.api.base_url
        );
    }
    while config.api.base_url.ends_with('/') {
        config.api.base_url.pop();
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    if config.paging.page_size == 0 {
        anyhow::bail!("paging.page_size must be > 0");
    }

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
