//! Settings injected into the relay at construction time
//!
//! Nothing here is read from the environment by the handler; the binary resolves its CLI and
//! environment into a [`Settings`] once, and tests build their own.
use bon::Builder;
use std::fmt;
use url::Url;

use crate::cors::AllowedOrigins;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PATH: &str = "/api/chat";
pub const DEFAULT_CONTEXT_WINDOW: usize = 20;
pub const DEFAULT_MAX_RELAY_BYTES: usize = 250_000;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// The upstream bearer credential. Its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone, Builder)]
pub struct Settings {
    /// Full URL of the upstream chat completions endpoint.
    #[builder(default = default_upstream_url())]
    pub upstream_url: Url,
    /// Model identifier sent with every upstream request.
    #[builder(into, default = DEFAULT_MODEL.to_owned())]
    pub model: String,
    /// `None` is allowed at startup; requests then fail with a configuration error.
    #[builder(into)]
    pub api_key: Option<ApiKey>,
    /// Route the chat handler is mounted on.
    #[builder(into, default = DEFAULT_PATH.to_owned())]
    pub path: String,
    #[builder(default)]
    pub allowed_origins: AllowedOrigins,
    /// How many trailing messages are forwarded.
    #[builder(default = DEFAULT_CONTEXT_WINDOW)]
    pub context_window: usize,
    /// The relay stops after the chunk that takes the running total past this.
    #[builder(default = DEFAULT_MAX_RELAY_BYTES)]
    pub max_relay_bytes: usize,
    #[builder(default = DEFAULT_MAX_REQUEST_BYTES)]
    pub max_request_bytes: usize,
}

impl Settings {
    /// The configured credential, treating an empty key as missing.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::builder().build()
    }
}

fn default_upstream_url() -> Url {
    Url::parse(DEFAULT_UPSTREAM_URL).expect("default upstream URL is valid")
}
