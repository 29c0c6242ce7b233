//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::catalog::retry::RetryPolicy;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog listing endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value of the `filter` query parameter
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Region codes an item must be available in (any of them)
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Retry policy for page fetches
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Maximum pages in flight (unbounded when absent)
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Output CSV path
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_base_url() -> String {
    "https://api.detmir.ru/v2/products".to_string()
}

fn default_filter() -> String {
    "categories[].alias:lego;promo:false".to_string()
}

fn default_page_size() -> u64 {
    100
}

fn default_regions() -> Vec<String> {
    vec!["RU-MOW".to_string(), "RU-SPE".to_string()]
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_output() -> PathBuf {
    PathBuf::from("output.csv")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            filter: default_filter(),
            page_size: default_page_size(),
            regions: default_regions(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry: RetryPolicy::default(),
            concurrency: None,
            output: default_output(),
            proxy: None,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("catalog-crawler").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("CATALOG_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(proxy) = std::env::var("CATALOG_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(limit) = std::env::var("CATALOG_CONCURRENCY") {
            if let Ok(n) = limit.parse() {
                self.concurrency = Some(n);
            }
        }

        self
    }

    /// Checks values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, "page_size must be greater than zero");
        ensure!(self.retry.max_attempts > 0, "retry.max_attempts must be at least 1");
        ensure!(!self.regions.is_empty(), "at least one region code is required");
        ensure!(self.concurrency != Some(0), "concurrency must be greater than zero");
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
