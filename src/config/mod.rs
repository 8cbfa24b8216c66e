mod file_config;

pub use file_config::{ConfluentConfig, FileConfig};

use crate::server::config::DEFAULT_CACHE_TTL;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::upstream::{UpstreamSettings, DEFAULT_BASE_URL};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;
use tracing::warn;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_base_url: Option<String>,
    /// Raw `CACHE_DURATION` value, in minutes.
    pub cache_duration: Option<String>,
    pub cache_sweep_interval_sec: u64,
    pub request_timeout_sec: u64,
    pub collector_concurrency: usize,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    pub bearer_token: String,

    // Upstream
    pub api_key: String,
    pub api_secret: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub collector_concurrency: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let confluent = file.confluent.unwrap_or_default();

        let api_key = confluent
            .api_key
            .or_else(|| cli.api_key.clone())
            .filter(|key| !key.is_empty());
        let api_secret = confluent
            .api_secret
            .or_else(|| cli.api_secret.clone())
            .filter(|secret| !secret.is_empty());
        let (api_key, api_secret) = match (api_key, api_secret) {
            (Some(key), Some(secret)) => (key, secret),
            _ => bail!(
                "CONFLUENT_API_KEY and CONFLUENT_API_SECRET must be set (via --api-key/--api-secret, environment or the [confluent] section of the config file)"
            ),
        };

        let api_base_url = confluent
            .base_url
            .or_else(|| cli.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let cache_ttl = match file.cache_duration {
            Some(minutes) => Duration::from_secs(minutes.saturating_mul(60)),
            None => parse_cache_duration(cli.cache_duration.as_deref()),
        };
        let cache_sweep_interval = Duration::from_secs(
            file.cache_sweep_interval_sec
                .unwrap_or(cli.cache_sweep_interval_sec),
        );
        if cache_sweep_interval.is_zero() {
            bail!("cache_sweep_interval_sec must be greater than 0");
        }

        let request_timeout = Duration::from_secs(
            confluent
                .request_timeout_sec
                .unwrap_or(cli.request_timeout_sec),
        );
        if request_timeout.is_zero() {
            bail!("request_timeout_sec must be greater than 0");
        }

        let collector_concurrency = confluent
            .collector_concurrency
            .unwrap_or(cli.collector_concurrency);
        if collector_concurrency == 0 {
            bail!("collector_concurrency must be greater than 0");
        }

        // Scrapers authenticate with the API key unless told otherwise
        let bearer_token = file
            .bearer_token
            .or_else(|| cli.bearer_token.clone())
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| api_key.clone());

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            cache_ttl,
            cache_sweep_interval,
            bearer_token,
            api_key,
            api_secret,
            api_base_url,
            request_timeout,
            collector_concurrency,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            cache_ttl: self.cache_ttl,
            cache_sweep_interval: self.cache_sweep_interval,
            bearer_token: Some(self.bearer_token.clone()),
        }
    }

    pub fn upstream_settings(&self) -> UpstreamSettings {
        let mut settings = UpstreamSettings::new(self.api_key.clone(), self.api_secret.clone());
        settings.base_url = self.api_base_url.clone();
        settings.request_timeout = self.request_timeout;
        settings
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

/// `CACHE_DURATION` is a whole number of minutes. Anything unparsable falls
/// back to the default.
fn parse_cache_duration(raw: Option<&str>) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return DEFAULT_CACHE_TTL;
    };
    match raw.parse::<u64>() {
        Ok(minutes) => Duration::from_secs(minutes.saturating_mul(60)),
        Err(err) => {
            warn!(
                "Invalid CACHE_DURATION '{}' ({}), using default of {} minutes",
                raw,
                err,
                DEFAULT_CACHE_TTL.as_secs() / 60
            );
            DEFAULT_CACHE_TTL
        }
    }
}
