//! Transport-level error types.
//!
//! These errors describe failures to deliver a request or read a response.
//! They carry no knowledge of registry semantics; an HTTP error status is not
//! a transport error and is mapped one layer up.

use std::fmt;
use std::time::Duration;

/// Errors that can occur while exchanging a request with the service.
#[derive(Debug)]
pub enum TransportError {
    /// The connection could not be established or was dropped.
    Connection {
        message: String,
        endpoint: Option<String>,
    },

    /// No response arrived within the configured timeout.
    Timeout { duration: Duration },

    /// The request could not be built (bad URL, bad header value, ...).
    InvalidRequest { message: String },

    /// The response body could not be read or was not valid JSON.
    Body { message: String },

    /// The transport itself could not be configured.
    Configuration { message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connection { message, endpoint } => {
                if let Some(endpoint) = endpoint {
                    write!(f, "Connection error to {}: {}", endpoint, message)
                } else {
                    write!(f, "Connection error: {}", message)
                }
            }
            TransportError::Timeout { duration } => {
                write!(f, "Request timed out after {:?}", duration)
            }
            TransportError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            TransportError::Body { message } => write!(f, "Invalid response body: {}", message),
            TransportError::Configuration { message } => {
                write!(f, "Transport configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            endpoint: None,
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a body error
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body {
            message: message.into(),
        }
    }

    /// Whether the failure happened before the service saw the request.
    pub fn is_before_send(&self) -> bool {
        matches!(
            self,
            TransportError::InvalidRequest { .. } | TransportError::Configuration { .. }
        )
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(error: serde_json::Error) -> Self {
        TransportError::body(error.to_string())
    }
}
