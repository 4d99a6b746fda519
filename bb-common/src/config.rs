//! Configuration file model and config-path resolution
//!
//! The TOML file is optional. Every key is optional and a missing file yields
//! defaults; per-setting priority (CLI → ENV → TOML → default) is applied by
//! the consuming service.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "BEATBRIDGE_CONFIG";

/// Logging configuration (`[logging]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Conversion pipeline tuning (`[conversion]` table)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Minimum composite score for a candidate to be accepted
    pub match_threshold: Option<f64>,
    /// Concurrent destination searches per job
    pub max_concurrent_searches: Option<usize>,
    /// Per-HTTP-request timeout in seconds
    pub request_timeout_seconds: Option<u64>,
    /// Budget for one adapter call, retries included, in seconds
    pub adapter_call_timeout_seconds: Option<u64>,
    /// Total attempts for a rate-limited or timed-out upstream call
    pub max_retry_attempts: Option<u32>,
    /// First backoff delay in milliseconds (doubles per attempt)
    pub retry_base_delay_ms: Option<u64>,
    /// How long finished jobs stay queryable, in seconds
    pub job_retention_seconds: Option<u64>,
    /// Interval between eviction sweeps, in seconds
    pub eviction_interval_seconds: Option<u64>,
}

/// `[spotify]` credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// `[apple_music]` credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleMusicConfig {
    /// Signed developer token (JWT)
    pub developer_token: Option<String>,
    /// Catalog storefront, e.g. "us"
    pub storefront: Option<String>,
}

/// `[youtube_music]` credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeMusicConfig {
    pub api_key: Option<String>,
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Listen address, e.g. "127.0.0.1"
    pub bind_address: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    pub logging: LoggingConfig,
    pub conversion: ConversionConfig,
    pub spotify: SpotifyConfig,
    pub apple_music: AppleMusicConfig,
    pub youtube_music: YouTubeMusicConfig,
}

/// Resolve the config file location
///
/// Priority:
/// 1. Command-line argument
/// 2. `BEATBRIDGE_CONFIG` environment variable
/// 3. `<config_dir>/beatbridge/config.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("beatbridge").join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file is not an error: defaults are returned.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        debug!("Config file not found, using defaults: {}", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// User-Agent sent to upstream catalog APIs
pub fn get_user_agent() -> String {
    format!("BeatBridge/{}", env!("CARGO_PKG_VERSION"))
}
