//! Error types for registry client operations.
//!
//! Failures fall into three groups: local validation errors raised before any
//! request is sent, remote failures mapped from the service's HTTP status, and
//! transport or serialization problems encountered while talking to the service.

use crate::transport::TransportError;

/// Main error type for registry client operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Local validation failed; no request was sent
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The service rejected a conditional write because the ETag was stale (412)
    #[error("Precondition failed: {message}")]
    PreconditionFailed { message: String },

    /// The resource or job does not exist (404)
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The resource already exists (409)
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The credential was rejected (401)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The service is throttling this client (429)
    #[error("Throttled: {message}")]
    Throttled { message: String },

    /// Any other non-success status returned by the service
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The request could not be delivered or the response could not be read
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Validation errors detected locally before a request is issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required identifier was not supplied
    #[error("Required identifier '{field}' is missing")]
    MissingIdentifier { field: String },

    /// An identifier exceeds the service's length limit
    #[error("Identifier '{field}' exceeds {max} characters")]
    IdentifierTooLong { field: String, max: usize },

    /// An identifier contains a character the service does not accept
    #[error("Identifier '{field}' contains invalid character '{character}'")]
    InvalidIdentifierCharacter { field: String, character: char },

    /// A required argument was empty
    #[error("Required argument '{argument}' is missing")]
    MissingArgument { argument: String },

    /// The connection string is missing a required key
    #[error("Connection string is missing required key '{key}'")]
    MissingConnectionStringKey { key: String },

    /// A connection string segment is not a `Key=Value` pair
    #[error("Malformed connection string segment '{segment}'")]
    MalformedConnectionString { segment: String },

    /// The connection string is scoped to a device, not to the registry
    #[error("Connection string contains device-scoped key '{key}'")]
    DeviceScopedConnectionString { key: String },

    /// The shared access key is not valid base64
    #[error("Shared access key is not valid base64")]
    InvalidSharedAccessKey,

    /// General validation error with custom message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}

/// Errors that can occur while building a client.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No credential was configured
    #[error("Connection string is required but not provided")]
    MissingCredential,

    /// The connection string could not be parsed
    #[error("Invalid connection string: {0}")]
    InvalidCredential(#[from] ValidationError),

    /// The client configuration was rejected
    #[error("Invalid client configuration: {message}")]
    InvalidConfig { message: String },

    /// The transport could not be constructed
    #[error("Failed to build transport: {0}")]
    Transport(#[from] TransportError),
}

impl RegistryError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status and its message to the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized { message },
            404 => Self::NotFound { message },
            409 => Self::Conflict { message },
            412 => Self::PreconditionFailed { message },
            429 => Self::Throttled { message },
            _ => Self::Service { status, message },
        }
    }

    /// HTTP status code for failures reported by the service.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::PreconditionFailed { .. } => Some(412),
            Self::Throttled { .. } => Some(429),
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the service rejected a stale ETag.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }

    /// Whether the target resource or job was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl ValidationError {
    /// Create a missing identifier error
    pub fn missing_identifier(field: impl Into<String>) -> Self {
        Self::MissingIdentifier {
            field: field.into(),
        }
    }

    /// Create a missing argument error
    pub fn missing_argument(argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            argument: argument.into(),
        }
    }

    /// Create a custom validation error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type RegistryResult<T> = Result<T, RegistryError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type BuildResult<T> = Result<T, BuildError>;
