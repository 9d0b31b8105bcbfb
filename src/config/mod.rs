// src/config/mod.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::{alpha_vantage, fred, news_api, twelve_data};
use crate::ingest::types::WINDOW_SIZE;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_task_interval_ms() -> u64 {
    2_000
}
fn default_request_interval_ms() -> u64 {
    1_000
}
fn default_window_size() -> usize {
    WINDOW_SIZE
}
fn default_headline_max_chars() -> usize {
    120
}

/// Base URLs of the upstream APIs. Overridable for mirrors and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub twelve_data: String,
    pub alpha_vantage: String,
    pub fred: String,
    pub news_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            twelve_data: "https://api.twelvedata.com".into(),
            alpha_vantage: "https://www.alphavantage.co".into(),
            fred: "https://api.stlouisfed.org/fred".into(),
            news_api: "https://newsapi.org/v2".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Hard cap per HTTP request; a hung provider must not stall the run.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause between the four top-level tasks.
    #[serde(default = "default_task_interval_ms")]
    pub task_interval_ms: u64,
    /// Pause between consecutive requests inside one task.
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_headline_max_chars")]
    pub headline_max_chars: usize,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            task_interval_ms: default_task_interval_ms(),
            request_interval_ms: default_request_interval_ms(),
            window_size: default_window_size(),
            headline_max_chars: default_headline_max_chars(),
            endpoints: Endpoints::default(),
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn task_interval(&self) -> Duration {
        Duration::from_millis(self.task_interval_ms)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let mut cfg: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $PIPELINE_CONFIG_PATH
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        Ok(Self::default())
    }

    fn sanitize(&mut self) {
        if self.window_size == 0 {
            self.window_size = default_window_size();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        if self.headline_max_chars < 8 {
            self.headline_max_chars = default_headline_max_chars();
        }
    }
}

/// The four provider secrets. Read once at startup and passed down.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub twelve_data: Option<String>,
    pub alpha_vantage: Option<String>,
    pub fred: Option<String>,
    /// Optional: absence only disables the event task.
    pub news_api: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; blank values count as absent.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            twelve_data: get(twelve_data::ENV_KEY),
            alpha_vantage: get(alpha_vantage::ENV_KEY),
            fred: get(fred::ENV_KEY),
            news_api: get(news_api::ENV_KEY),
        }
    }

    /// Names of the variables that are set, for the startup log line.
    pub fn present(&self) -> Vec<&'static str> {
        [
            (twelve_data::ENV_KEY, &self.twelve_data),
            (alpha_vantage::ENV_KEY, &self.alpha_vantage),
            (fred::ENV_KEY, &self.fred),
            (news_api::ENV_KEY, &self.news_api),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_some())
        .map(|(k, _)| k)
        .collect()
    }
}

// never print secrets
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("present", &self.present())
            .finish()
    }
}
