//! Error taxonomy for mail operations.
//!
//! Every backend maps its wire-level failures into [`MailError`] before they
//! cross the provider boundary, so callers can react to a closed set of error
//! kinds instead of provider-specific failures. The [`Retryable`] trait is the
//! single signal the retry layer consults.

use std::time::Duration;

use crate::providers::Capability;

/// Result type alias for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors that can occur during mail operations.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {message}")]
    Auth {
        /// Human-readable failure description.
        message: String,
        /// Underlying cause, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend refused the request due to rate limiting.
    #[error("rate limited: {message}")]
    RateLimit {
        /// Human-readable failure description.
        message: String,
        /// Server-suggested wait before retrying, if the backend provided one.
        retry_after: Option<Duration>,
    },

    /// A requested resource does not exist.
    #[error("{resource_type} not found: {resource_id}")]
    NotFound {
        /// Kind of resource that was requested (e.g. "email", "folder").
        resource_type: String,
        /// Identifier that failed to resolve.
        resource_id: String,
    },

    /// Transport-level failure reaching the backend.
    #[error("network error: {message}")]
    Network {
        /// Human-readable failure description.
        message: String,
        /// Underlying cause, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller-supplied input failed validation before any request was made.
    #[error("validation failed for {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// Backend-specific failure that fits no other kind.
    #[error("{provider} error: {message}")]
    Provider {
        /// Name of the backend that produced the error.
        provider: String,
        /// Human-readable failure description.
        message: String,
        /// Whether the backend considers the failure transient.
        retryable: bool,
    },

    /// The provider does not implement the requested capability.
    #[error("capability not supported: {capability}")]
    Unsupported {
        /// The capability that was requested.
        capability: Capability,
    },
}

/// Closed discriminator for [`MailError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Authentication failure.
    Auth,
    /// Rate limiting.
    RateLimit,
    /// Missing resource.
    NotFound,
    /// Transport failure.
    Network,
    /// Input validation failure.
    Validation,
    /// Backend-specific failure.
    Provider,
    /// Missing capability.
    Unsupported,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Auth => "auth",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Provider => "provider",
            ErrorKind::Unsupported => "unsupported",
        };
        write!(f, "{}", name)
    }
}

impl MailError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MailError::Auth { .. } => ErrorKind::Auth,
            MailError::RateLimit { .. } => ErrorKind::RateLimit,
            MailError::NotFound { .. } => ErrorKind::NotFound,
            MailError::Network { .. } => ErrorKind::Network,
            MailError::Validation { .. } => ErrorKind::Validation,
            MailError::Provider { .. } => ErrorKind::Provider,
            MailError::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    /// Creates an authentication error with no underlying cause.
    pub fn auth(message: impl Into<String>) -> Self {
        MailError::Auth {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a network error with no underlying cause.
    pub fn network(message: impl Into<String>) -> Self {
        MailError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a validation error for the named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MailError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error for the named resource.
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        MailError::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// Signals whether retrying a failed operation could help.
///
/// The default implementation returns `true`: an error is worth retrying
/// unless it is known not to be. Error types with more context override this
/// to fail fast on permanent conditions.
pub trait Retryable {
    /// Returns `true` if the operation that produced this error may succeed
    /// when repeated.
    fn retryable(&self) -> bool {
        true
    }
}

impl Retryable for MailError {
    fn retryable(&self) -> bool {
        match self {
            MailError::Auth { .. } => false,
            MailError::RateLimit { .. } => true,
            MailError::NotFound { .. } => false,
            MailError::Network { .. } => true,
            MailError::Validation { .. } => false,
            MailError::Provider { retryable, .. } => *retryable,
            MailError::Unsupported { .. } => false,
        }
    }
}

impl From<anyhow::Error> for MailError {
    fn from(err: anyhow::Error) -> Self {
        MailError::Network {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}
