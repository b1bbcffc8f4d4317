//! Error types for AWX API operations.
//!
//! Errors are categorized so the client can decide which failures are worth
//! retrying and callers can tell "the object is gone" apart from everything
//! else.

use std::fmt;

/// Result type alias for AWX API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, DNS or timeout problems (transient, retryable).
    Network,
    /// The requested object does not exist (HTTP 404).
    NotFound,
    /// Credentials rejected or insufficient permissions (HTTP 401/403).
    Auth,
    /// The server rejected the payload (HTTP 400).
    Validation,
    /// The server failed while handling the request (HTTP 5xx).
    Server,
    /// The caller cancelled the operation or its deadline passed.
    Cancelled,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Object not found",
            Self::Auth => "Authentication failed",
            Self::Validation => "Request rejected by the server",
            Self::Server => "Server error",
            Self::Cancelled => "Operation cancelled",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the AWX URL and your network connection, then try again",
            Self::NotFound => "Verify the object id or refresh the state",
            Self::Auth => "Check the token or username/password and the user's permissions",
            Self::Validation => "Fix the fields reported by the server",
            Self::Server => "Check the AWX server logs and try again later",
            Self::Cancelled => "Increase --timeout or re-run the command",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the AWX API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The object addressed by the request does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// What was requested, e.g. "job template 7".
        resource: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Detail extracted from the response body.
        message: String,
    },

    /// The request never produced a response.
    #[error("network error: {message}")]
    Network {
        /// Transport error message.
        message: String,
    },

    /// Cancellation was requested before the call was issued.
    #[error("operation cancelled: {reason}")]
    Cancelled {
        /// Why the call was not issued.
        reason: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a not-found error for a resource description.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Http { status, .. } => match status {
                404 => ErrorCategory::NotFound,
                401 | 403 => ErrorCategory::Auth,
                400 | 409 => ErrorCategory::Validation,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Other,
            },
            Error::Network { .. } => ErrorCategory::Network,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
            Error::InvalidResponse(_) | Error::Config(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the server reported the object as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: code,
            },
            other => Self::Network {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
