// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "COLLECTIBLES_CONFIG_PATH";
pub const ENV_GATEWAY_URL: &str = "COLLECTIBLES_GATEWAY_URL";

fn default_staleness_ms() -> u64 {
    30_000
}
fn default_refresh_interval_secs() -> u64 {
    300
}
fn default_page_size() -> u64 {
    10
}
fn default_gateway_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_request_timeout_secs() -> u64 {
    10
}

/// One SNS partition the maturity source walks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    pub root: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Minimum age of a cache entry before a non-forced refresh recomputes.
    #[serde(default = "default_staleness_ms")]
    pub staleness_ms: u64,
    /// Period of the forced background refresh.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Page size used when walking a pool's position listing.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Root of the partition whose neurons the rewards ledger is keyed by.
    #[serde(default)]
    pub reward_partition: Option<String>,
    #[serde(default)]
    pub partitions: Vec<PartitionConfig>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            staleness_ms: default_staleness_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
            page_size: default_page_size(),
            gateway_url: default_gateway_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            reward_partition: None,
            partitions: Vec::new(),
        }
    }
}

impl AggregatorConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be >= 1");
        }
        if self.staleness_ms == 0 {
            bail!("staleness_ms must be > 0");
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be > 0");
        }
        if let Some(root) = &self.reward_partition {
            if root.trim().is_empty() {
                bail!("reward_partition must not be blank");
            }
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_GATEWAY_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.gateway_url = url.to_string();
            }
        }
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<AggregatorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading collectibles config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing {}", path.display()))?;
    cfg.apply_env_overrides();
    cfg.validate()?;
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $COLLECTIBLES_CONFIG_PATH
/// 2) config/collectibles.toml
/// 3) config/collectibles.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<AggregatorConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/collectibles.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/collectibles.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    let mut cfg = AggregatorConfig::default();
    cfg.apply_env_overrides();
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AggregatorConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    match toml::from_str::<AggregatorConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported config format: {toml_err}")),
    }
}
