//! Transport contract consumed by every store.
//!
//! Implementations issue the request, attach the session credential and
//! normalize failures into [`TransportError`]. Paths are relative to the API
//! root (`"projects"`, `"tasks/3"`).

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Query string pairs, in order.
pub type QueryParams = Vec<(String, String)>;

/// Result alias for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        write!(f, "{}", value)
    }
}

/// Body of a POST request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/json`
    Json(Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// Uniform failure shape of the transport layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// A response arrived with a non-success status.
    #[error("server responded with status {status}")]
    Status { status: u16, body: Option<Value> },

    /// The request was sent but no response was received.
    #[error("no response received: {reason}")]
    NoResponse { reason: String },

    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// A success response whose body is not JSON.
    #[error("response body could not be decoded: {reason}")]
    Decode { reason: String },
}

impl TransportError {
    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened before any response arrived.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            TransportError::NoResponse { .. } | TransportError::Timeout { .. }
        )
    }

    /// Backend-supplied `detail` field.
    ///
    /// FastAPI validation failures carry a list of `{msg, ...}` objects; their
    /// messages are joined with `"; "`.
    pub fn detail(&self) -> Option<String> {
        match self.body()?.get("detail")? {
            Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
            Value::Array(items) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if messages.is_empty() {
                    None
                } else {
                    Some(messages.join("; "))
                }
            }
            _ => None,
        }
    }

    /// Generic `message` field of the response body.
    pub fn body_message(&self) -> Option<String> {
        self.body()?
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
    }

    fn body(&self) -> Option<&Value> {
        match self {
            TransportError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

/// HTTP capability the stores are written against.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> TransportResult<Value>;

    async fn post(&self, path: &str, body: RequestBody) -> TransportResult<Value>;

    async fn put(&self, path: &str, body: Value) -> TransportResult<Value>;

    /// Resolves to `Value::Null` when the backend answers with no body.
    async fn delete(&self, path: &str, query: &[(String, String)]) -> TransportResult<Value>;
}
