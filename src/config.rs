//! Configuration parsing and validation for the relay server
//!
//! This module handles command-line and environment parsing using clap, and turns the result
//! into the [`Settings`] the library is constructed with.
use anyhow::{anyhow, bail};
use chatrelay::{
    client::PoolConfig,
    cors::{AllowedOrigins, DEFAULT_ALLOWED_ORIGINS, OriginPolicy},
    settings::{ApiKey, Settings},
};
use clap::Parser;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the relay will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The route the chat endpoint is served on.
    #[arg(long, default_value = "/api/chat")]
    pub path: String,

    /// Credential for the upstream provider. Requests fail with a 500 while it is unset.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<ApiKey>,

    /// Full URL of the upstream chat completions endpoint.
    #[arg(
        long,
        env = "CHATRELAY_UPSTREAM_URL",
        default_value = "https://api.openai.com/v1/chat/completions"
    )]
    pub upstream_url: Url,

    /// Model identifier sent with every upstream request.
    #[arg(long, env = "CHATRELAY_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Origins allowed to call the relay, comma separated. The first one is the fallback.
    #[arg(
        long,
        env = "CHATRELAY_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values_t = DEFAULT_ALLOWED_ORIGINS.map(String::from)
    )]
    pub allowed_origins: Vec<String>,

    /// Omit the allow-origin header for unknown origins instead of falling back to the first one.
    #[arg(long)]
    pub strict_origins: bool,

    /// Number of trailing messages forwarded upstream.
    #[arg(long, default_value_t = 20)]
    pub context_window: usize,

    /// Stop relaying once this many bytes have been streamed back.
    #[arg(long, default_value_t = 250_000)]
    pub max_relay_bytes: usize,

    /// Largest inbound request body accepted.
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_request_bytes: usize,

    /// Whether to serve prometheus metrics.
    #[arg(short = 'm', long)]
    pub metrics: bool,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "chatrelay")]
    pub metrics_prefix: String,

    /// Maximum number of idle HTTP connections to keep alive to the upstream.
    #[arg(long, default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle upstream connections alive.
    #[arg(long, default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,

    /// Log output format: `text` or `json`.
    #[arg(long, env = "CHATRELAY_LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if !self.path.starts_with('/') {
            bail!("Path '{}' must start with '/'", self.path);
        }
        if self.context_window == 0 {
            bail!("Context window must be at least 1");
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            bail!("Unknown log format '{}'", self.log_format);
        }
        self.allowed_origins()?;
        Ok(self)
    }

    pub fn allowed_origins(&self) -> Result<AllowedOrigins, anyhow::Error> {
        let policy = if self.strict_origins {
            OriginPolicy::Strict
        } else {
            OriginPolicy::Fallback
        };
        AllowedOrigins::new(
            self.allowed_origins.iter().filter(|o| !o.trim().is_empty()),
            policy,
        )
        .map_err(|e| anyhow!("Invalid allowed origins: {}", e))
    }

    pub fn settings(&self) -> Result<Settings, anyhow::Error> {
        Ok(Settings::builder()
            .upstream_url(self.upstream_url.clone())
            .model(self.model.clone())
            .maybe_api_key(self.openai_api_key.clone())
            .path(self.path.clone())
            .allowed_origins(self.allowed_origins()?)
            .context_window(self.context_window)
            .max_relay_bytes(self.max_relay_bytes)
            .max_request_bytes(self.max_request_bytes)
            .build())
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            idle_timeout: Duration::from_secs(self.pool_idle_timeout_secs),
            max_idle_per_host: self.pool_max_idle_per_host,
        }
    }
}
