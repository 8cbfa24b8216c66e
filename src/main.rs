use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ccloud_discovery_server::catalog::DEFAULT_COLLECTOR_CONCURRENCY;
use ccloud_discovery_server::config::{AppConfig, CliConfig, FileConfig};
use ccloud_discovery_server::{
    run_server, ConfluentClient, RequestsLoggingLevel, UpstreamCollector,
};

#[derive(Parser, Debug)]
#[command(about = "Prometheus HTTP service discovery for Confluent Cloud resources")]
struct CliArgs {
    /// Path to a TOML config file. Its values override command line arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8080)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping). 0 disables it.
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Confluent Cloud API key.
    #[clap(long, env = "CONFLUENT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Confluent Cloud API secret.
    #[clap(long, env = "CONFLUENT_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Base URL of the Confluent Cloud API.
    #[clap(long, env = "CONFLUENT_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Lifetime of the cached resource catalog, in minutes (default 30).
    #[clap(long, env = "CACHE_DURATION")]
    pub cache_duration: Option<String>,

    /// Interval in seconds between sweeps of expired cache entries.
    #[clap(long, default_value_t = 300)]
    pub cache_sweep_interval_sec: u64,

    /// Timeout in seconds for each Confluent Cloud API request.
    #[clap(long, default_value_t = 30)]
    pub request_timeout_sec: u64,

    /// Number of environments collected concurrently.
    #[clap(long, default_value_t = DEFAULT_COLLECTOR_CONCURRENCY)]
    pub collector_concurrency: usize,

    /// Bearer token required on /discovery. Defaults to the API key.
    #[clap(long, env = "DISCOVERY_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            api_base_url: self.api_base_url.clone(),
            cache_duration: self.cache_duration.clone(),
            cache_sweep_interval_sec: self.cache_sweep_interval_sec,
            request_timeout_sec: self.request_timeout_sec,
            collector_concurrency: self.collector_concurrency,
            bearer_token: self.bearer_token.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Using Confluent Cloud API at {} (cache duration {} minutes)",
        app_config.api_base_url,
        app_config.cache_ttl.as_secs() / 60
    );
    let client = ConfluentClient::new(app_config.upstream_settings())?;
    let collector = UpstreamCollector::with_concurrency(
        Arc::new(client),
        app_config.collector_concurrency,
    );

    run_server(app_config.server_config(), Arc::new(collector)).await
}
