//! Configuration resolution for bb-convert
//!
//! Every setting resolves with Command line → ENV → TOML → default priority.
//! Credentials found in more than one source log a warning.

use crate::catalog::{HttpSettings, PlatformCredentials, RetryPolicy};
use crate::services::conversion_orchestrator::{OrchestratorSettings, MAX_CONCURRENT_SEARCHES};
use bb_common::config::TomlConfig;
use bb_common::{Error, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ADAPTER_CALL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_JOB_RETENTION_SECS: u64 = 86_400;
const DEFAULT_EVICTION_INTERVAL_SECS: u64 = 300;
const DEFAULT_STOREFRONT: &str = "us";

pub const ENV_BIND_ADDRESS: &str = "BEATBRIDGE_BIND_ADDRESS";
pub const ENV_PORT: &str = "BEATBRIDGE_PORT";
pub const ENV_MATCH_THRESHOLD: &str = "BEATBRIDGE_MATCH_THRESHOLD";
pub const ENV_MAX_CONCURRENT_SEARCHES: &str = "BEATBRIDGE_MAX_CONCURRENT_SEARCHES";
pub const ENV_SPOTIFY_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const ENV_SPOTIFY_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";
pub const ENV_APPLE_MUSIC_DEVELOPER_TOKEN: &str = "APPLE_MUSIC_DEVELOPER_TOKEN";
pub const ENV_APPLE_MUSIC_STOREFRONT: &str = "APPLE_MUSIC_STOREFRONT";
pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    /// Empty means any origin
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub orchestrator: OrchestratorSettings,
    pub http: HttpSettings,
    pub credentials: PlatformCredentials,
    /// How long finished jobs stay queryable
    pub job_retention: Duration,
    pub eviction_interval: Duration,
}

impl ServiceConfig {
    /// Resolve from the command line, process environment and TOML file
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        Self::resolve_with(cli, toml_config, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with<E>(cli: &CliOverrides, toml_config: &TomlConfig, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let conversion = &toml_config.conversion;

        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| non_empty(env(ENV_BIND_ADDRESS)))
            .or_else(|| toml_config.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let port = match cli.port {
            Some(port) => port,
            None => parse_env::<u16>(&env, ENV_PORT)?
                .or(toml_config.port)
                .unwrap_or(DEFAULT_PORT),
        };

        let match_threshold = parse_env::<f64>(&env, ENV_MATCH_THRESHOLD)?
            .or(conversion.match_threshold)
            .unwrap_or(crate::matcher::DEFAULT_MATCH_THRESHOLD);
        if !(0.0..=1.0).contains(&match_threshold) {
            return Err(Error::Config(format!(
                "match_threshold must be between 0.0 and 1.0, got {}",
                match_threshold
            )));
        }

        let requested_concurrency = parse_env::<usize>(&env, ENV_MAX_CONCURRENT_SEARCHES)?
            .or(conversion.max_concurrent_searches)
            .unwrap_or(OrchestratorSettings::default().max_concurrent_searches);
        let max_concurrent_searches = requested_concurrency.clamp(1, MAX_CONCURRENT_SEARCHES);
        if max_concurrent_searches != requested_concurrency {
            warn!(
                requested = requested_concurrency,
                using = max_concurrent_searches,
                "max_concurrent_searches out of range"
            );
        }

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: conversion
                .max_retry_attempts
                .unwrap_or(retry_defaults.max_attempts)
                .max(1),
            base_delay: conversion
                .retry_base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(retry_defaults.base_delay),
            max_delay: retry_defaults.max_delay,
        };

        let http = HttpSettings {
            request_timeout: Duration::from_secs(
                conversion
                    .request_timeout_seconds
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            retry,
            ..HttpSettings::default()
        };

        let orchestrator = OrchestratorSettings {
            match_threshold,
            max_concurrent_searches,
            adapter_call_timeout: Duration::from_secs(
                conversion
                    .adapter_call_timeout_seconds
                    .unwrap_or(DEFAULT_ADAPTER_CALL_TIMEOUT_SECS),
            ),
        };

        let credentials = PlatformCredentials {
            spotify_client_id: resolve_credential(
                "Spotify client id",
                env(ENV_SPOTIFY_CLIENT_ID),
                toml_config.spotify.client_id.as_ref(),
            ),
            spotify_client_secret: resolve_credential(
                "Spotify client secret",
                env(ENV_SPOTIFY_CLIENT_SECRET),
                toml_config.spotify.client_secret.as_ref(),
            ),
            apple_music_developer_token: resolve_credential(
                "Apple Music developer token",
                env(ENV_APPLE_MUSIC_DEVELOPER_TOKEN),
                toml_config.apple_music.developer_token.as_ref(),
            ),
            apple_music_storefront: non_empty(env(ENV_APPLE_MUSIC_STOREFRONT))
                .or_else(|| non_empty(toml_config.apple_music.storefront.clone()))
                .unwrap_or_else(|| DEFAULT_STOREFRONT.to_string()),
            youtube_api_key: resolve_credential(
                "YouTube API key",
                env(ENV_YOUTUBE_API_KEY),
                toml_config.youtube_music.api_key.as_ref(),
            ),
        };

        Ok(Self {
            bind_address,
            port,
            cors_origins: toml_config.cors_origins.clone(),
            log_level: toml_config.logging.level.clone(),
            orchestrator,
            http,
            credentials,
            job_retention: Duration::from_secs(
                conversion
                    .job_retention_seconds
                    .unwrap_or(DEFAULT_JOB_RETENTION_SECS),
            ),
            eviction_interval: Duration::from_secs(
                conversion
                    .eviction_interval_seconds
                    .unwrap_or(DEFAULT_EVICTION_INTERVAL_SECS)
                    .max(1),
            ),
        })
    }

    /// Address to listen on
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                Error::Config(format!(
                    "Invalid bind address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }
}

/// Validate credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| is_valid_key(v))
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(env(name)) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}={:?}: {}", name, raw, e))),
        None => Ok(None),
    }
}

/// Resolve a credential from ENV → TOML
fn resolve_credential(
    label: &str,
    env_value: Option<String>,
    toml_value: Option<&String>,
) -> Option<String> {
    let env_value = non_empty(env_value);
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in multiple sources: environment, TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Some(value);
    }
    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", label);
        return Some(value.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ServiceConfig::resolve_with(&CliOverrides::default(), &TomlConfig::default(), env_from(&[]))
                .unwrap();

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.orchestrator.match_threshold, 0.75);
        assert_eq!(config.orchestrator.max_concurrent_searches, 4);
        assert_eq!(config.orchestrator.adapter_call_timeout, Duration::from_secs(120));
        assert_eq!(config.http.request_timeout, Duration::from_secs(30));
        assert_eq!(config.http.retry.max_attempts, 3);
        assert_eq!(config.http.retry.base_delay, Duration::from_millis(500));
        assert_eq!(config.job_retention, Duration::from_secs(86_400));
        assert_eq!(config.credentials.apple_music_storefront, "us");
        assert!(config.credentials.spotify_client_id.is_none());
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn test_priority_cli_env_toml() {
        let mut toml_config = TomlConfig::default();
        toml_config.port = Some(6000);
        toml_config.bind_address = Some("0.0.0.0".to_string());
        toml_config.spotify.client_id = Some("toml-id".to_string());
        toml_config.youtube_music.api_key = Some("toml-key".to_string());

        let env = env_from(&[(ENV_PORT, "7000"), (ENV_SPOTIFY_CLIENT_ID, "env-id")]);

        let config = ServiceConfig::resolve_with(&CliOverrides::default(), &toml_config, &env).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.credentials.spotify_client_id.as_deref(), Some("env-id"));
        assert_eq!(config.credentials.youtube_api_key.as_deref(), Some("toml-key"));

        let cli = CliOverrides {
            bind_address: Some("127.0.0.2".to_string()),
            port: Some(8000),
        };
        let config = ServiceConfig::resolve_with(&cli, &toml_config, &env).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_address, "127.0.0.2");
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let mut toml_config = TomlConfig::default();
        toml_config.conversion.max_concurrent_searches = Some(64);
        let config =
            ServiceConfig::resolve_with(&CliOverrides::default(), &toml_config, env_from(&[])).unwrap();
        assert_eq!(config.orchestrator.max_concurrent_searches, 8);

        toml_config.conversion.max_concurrent_searches = Some(0);
        let config =
            ServiceConfig::resolve_with(&CliOverrides::default(), &toml_config, env_from(&[])).unwrap();
        assert_eq!(config.orchestrator.max_concurrent_searches, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = ServiceConfig::resolve_with(
            &CliOverrides::default(),
            &TomlConfig::default(),
            env_from(&[(ENV_PORT, "not-a-port")]),
        );
        assert!(matches!(result, Err(Error::Config(_))));

        let mut toml_config = TomlConfig::default();
        toml_config.conversion.match_threshold = Some(1.5);
        let result =
            ServiceConfig::resolve_with(&CliOverrides::default(), &toml_config, env_from(&[]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_blank_credentials_ignored() {
        let mut toml_config = TomlConfig::default();
        toml_config.apple_music.developer_token = Some("   ".to_string());
        let config = ServiceConfig::resolve_with(
            &CliOverrides::default(),
            &toml_config,
            env_from(&[(ENV_YOUTUBE_API_KEY, "")]),
        )
        .unwrap();
        assert!(config.credentials.apple_music_developer_token.is_none());
        assert!(config.credentials.youtube_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_resolve_reads_process_environment() {
        std::env::set_var(ENV_APPLE_MUSIC_STOREFRONT, "gb");
        let config = ServiceConfig::resolve(&CliOverrides::default(), &TomlConfig::default());
        std::env::remove_var(ENV_APPLE_MUSIC_STOREFRONT);

        assert_eq!(config.unwrap().credentials.apple_music_storefront, "gb");
    }
}
