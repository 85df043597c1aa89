//! Error taxonomy shared by every store.
//!
//! `Display` is always the human-readable message, so a view can show an error
//! as-is. The same message is written to the store's error slot.

use tempo_core::TransportError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// A required scope was missing. No request was sent.
    #[error("{message}")]
    Precondition { message: String },

    #[error("{message}")]
    NotFound { message: String },

    /// No response was received.
    #[error("{message}")]
    Transport {
        message: String,
        cause: TransportError,
    },

    /// A response was received with a failure status.
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("{message}")]
    MalformedResponse { message: String },
}

impl StoreError {
    pub fn precondition(message: impl Into<String>) -> Self {
        StoreError::Precondition {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StoreError::NotFound {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        StoreError::MalformedResponse {
            message: message.into(),
        }
    }

    /// Normalize a transport failure.
    ///
    /// The message is taken from the backend `detail` field, then its
    /// `message` field, then `fallback`.
    pub fn from_transport(err: TransportError, fallback: &str) -> Self {
        match &err {
            TransportError::Status { status, .. } => {
                let message = err
                    .detail()
                    .or_else(|| err.body_message())
                    .unwrap_or_else(|| fallback.to_string());
                if *status == 404 {
                    StoreError::NotFound { message }
                } else {
                    StoreError::Server {
                        status: *status,
                        message,
                    }
                }
            }
            TransportError::NoResponse { .. } => StoreError::Transport {
                message: format!("{} (no response from server)", fallback),
                cause: err,
            },
            TransportError::Timeout { .. } => StoreError::Transport {
                message: format!("{} (request timed out)", fallback),
                cause: err,
            },
            TransportError::Decode { reason } => StoreError::MalformedResponse {
                message: format!("{}: {}", fallback, reason),
            },
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StoreError::Precondition { message }
            | StoreError::NotFound { message }
            | StoreError::Transport { message, .. }
            | StoreError::Server { message, .. }
            | StoreError::MalformedResponse { message } => message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Server { status, .. } => Some(*status),
            StoreError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, StoreError::Precondition { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(status: u16, body: serde_json::Value) -> TransportError {
        TransportError::Status {
            status,
            body: Some(body),
        }
    }

    #[test]
    fn test_detail_wins_over_message() {
        let err = StoreError::from_transport(
            status(400, json!({"detail": "Name taken", "message": "Bad request"})),
            "Failed to create project",
        );
        assert_eq!(err.to_string(), "Name taken");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_message_used_when_detail_absent() {
        let err = StoreError::from_transport(
            status(500, json!({"message": "Internal error"})),
            "Failed to fetch projects",
        );
        assert_eq!(err.message(), "Internal error");
    }

    #[test]
    fn test_fallback_used_for_bare_status() {
        let err = StoreError::from_transport(
            TransportError::Status {
                status: 502,
                body: None,
            },
            "Failed to delete task",
        );
        assert_eq!(
            err,
            StoreError::Server {
                status: 502,
                message: "Failed to delete task".to_string()
            }
        );
    }

    #[test]
    fn test_404_is_not_found() {
        let err = StoreError::from_transport(
            status(404, json!({"detail": "Project not found"})),
            "Failed to fetch project",
        );
        assert!(err.is_not_found());
        assert_eq!(err.message(), "Project not found");
    }

    #[test]
    fn test_network_failures_are_transport_errors() {
        let err = StoreError::from_transport(
            TransportError::Timeout { after_ms: 10_000 },
            "Failed to fetch sprints",
        );
        assert!(matches!(err, StoreError::Transport { .. }));
        assert_eq!(err.message(), "Failed to fetch sprints (request timed out)");

        let err = StoreError::from_transport(
            TransportError::NoResponse {
                reason: "connection refused".to_string(),
            },
            "Failed to fetch sprints",
        );
        assert_eq!(
            err.message(),
            "Failed to fetch sprints (no response from server)"
        );
    }
}
