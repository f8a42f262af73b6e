//! Request and response bodies for the chat endpoint
//!
//! The widget sends `{ messages, system?, temperature?, max_tokens? }`. Only the shape of
//! `messages` is checked; message elements and generation parameters are forwarded to the
//! upstream verbatim.
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::RelayError;

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u64 = 500;

/// A chat request as received from the widget.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Value>,
    pub system: Option<String>,
    pub temperature: Value,
    pub max_tokens: Value,
}

impl ChatRequest {
    /// Parses a raw request body.
    ///
    /// A body that isn't a JSON object is treated as `{}`, so it fails the same way as an object
    /// without `messages`.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let mut body = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };

        let messages = match body.remove("messages") {
            Some(Value::Array(messages)) => messages,
            _ => return Err(RelayError::MissingMessages),
        };

        let system = match body.remove("system") {
            Some(Value::String(system)) if !system.is_empty() => Some(system),
            _ => None,
        };

        Ok(Self {
            messages,
            system,
            temperature: take_or(&mut body, "temperature", json!(DEFAULT_TEMPERATURE)),
            max_tokens: take_or(&mut body, "max_tokens", json!(DEFAULT_MAX_TOKENS)),
        })
    }

    /// Builds the upstream payload: the system entry (if any), then the last `window` messages.
    pub fn into_upstream(self, model: &str, window: usize) -> UpstreamRequest {
        let recent = recent_messages(self.messages, window);
        let mut messages = Vec::with_capacity(recent.len() + 1);
        if let Some(system) = self.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.extend(recent);

        UpstreamRequest {
            model: model.to_owned(),
            stream: true,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages,
        }
    }
}

fn take_or(body: &mut serde_json::Map<String, Value>, key: &str, default: Value) -> Value {
    match body.remove(key) {
        Some(Value::Null) | None => default,
        Some(value) => value,
    }
}

/// Keeps the last `window` messages, in their original order.
pub fn recent_messages(mut messages: Vec<Value>, window: usize) -> Vec<Value> {
    let excess = messages.len().saturating_sub(window);
    messages.drain(..excess);
    messages
}

/// The body sent to the chat completions endpoint upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamRequest {
    pub model: String,
    pub stream: bool,
    pub temperature: Value,
    pub max_tokens: Value,
    pub messages: Vec<Value>,
}

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
