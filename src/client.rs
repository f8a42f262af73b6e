//! HTTP client abstraction for the upstream completion service
//!
//! The relay only needs "send this request, give me the response with a streaming body". The
//! trait lets tests swap in a recording mock while production uses a pooled hyper client.
use async_trait::async_trait;
use axum::response::IntoResponse;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use std::time::Duration;

pub const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 100;

pub type HyperClient = Client<
    hyper_tls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
    axum::body::Body,
>;

#[async_trait]
pub trait HttpClient: std::fmt::Debug {
    async fn request(
        &self,
        req: axum::extract::Request,
    ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn request(
        &self,
        req: axum::extract::Request,
    ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
        self.request(req)
            .await
            .map(|res| res.into_response())
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }
}

/// Connection pool tuning for the upstream client.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub idle_timeout: Duration,
    pub max_idle_per_host: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT_SECS),
            max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }
}

pub fn create_hyper_client(pool: PoolConfig) -> HyperClient {
    let https = hyper_tls::HttpsConnector::new();

    tracing::debug!(
        "HTTP client pool config: idle_timeout={}s, max_idle_per_host={}",
        pool.idle_timeout.as_secs(),
        pool.max_idle_per_host
    );

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(pool.idle_timeout)
        .pool_max_idle_per_host(pool.max_idle_per_host)
        .pool_timer(hyper_util::rt::TokioTimer::new())
        .build(https)
}
