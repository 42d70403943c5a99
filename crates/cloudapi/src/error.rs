//! Error types for Pulumi Cloud API calls.
//!
//! Errors are categorized so callers can tell a missing entity, a rejected
//! request and a transient outage apart without parsing messages.

use std::fmt;

use reconcile::RemoteError;
use serde::Deserialize;

/// Result type alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable).
    Network,
    /// The entity does not exist.
    NotFound,
    /// The token was rejected or lacks permission.
    Auth,
    /// The service rejected the request.
    Rejected,
    /// The service is overloaded or failing (transient, retryable).
    Unavailable,
    /// A required argument was missing before any call was made.
    Argument,
    /// The response body could not be decoded.
    Format,
    /// The call was cancelled or timed out.
    Cancelled,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Unavailable)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Entity not found",
            Self::Auth => "Authentication failed",
            Self::Rejected => "Request rejected",
            Self::Unavailable => "Service unavailable",
            Self::Argument => "Invalid argument",
            Self::Format => "Invalid response format",
            Self::Cancelled => "Request cancelled",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and try again",
            Self::NotFound => "Verify the organization and entity names",
            Self::Auth => "Check that PULUMI_ACCESS_TOKEN is valid for this organization",
            Self::Rejected => "Check the resource inputs against the service's rules",
            Self::Unavailable => "Wait a moment and try again",
            Self::Argument => "Provide every required field",
            Self::Format => "The service returned something unexpected, try again",
            Self::Cancelled => "Run the operation again with a longer timeout",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport failed before a response arrived.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("{status} API error: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the raw body.
        message: String,
    },

    /// A required argument was empty.
    #[error("{0}")]
    InvalidArgument(String),

    /// Invalid response from the API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The call context was cancelled or its deadline passed.
    #[error("request cancelled: {0}")]
    Cancelled(String),

    /// The service URL or a request path could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Error body returned by the service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    #[serde(default, alias = "code")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

impl Error {
    /// Create an HTTP transport error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Build an API error from a status and response body.
    ///
    /// The body is decoded as an [`ErrorResponse`]; if that fails the raw
    /// body becomes the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(parsed) if !parsed.message.is_empty() => Self::Api {
                status: parsed.status_code.unwrap_or(status),
                message: parsed.message,
            },
            _ => Self::Api {
                status,
                message: body.trim().to_string(),
            },
        }
    }

    /// Reject an empty required argument.
    pub fn require(name: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Err(Self::InvalidArgument(format!("{name} must not be empty")));
        }
        Ok(())
    }

    /// HTTP status code, if the service answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http { .. } => ErrorCategory::Network,
            Self::Api { status, .. } => match status {
                404 => ErrorCategory::NotFound,
                401 | 403 => ErrorCategory::Auth,
                408 | 429 | 500..=599 => ErrorCategory::Unavailable,
                _ => ErrorCategory::Rejected,
            },
            Self::InvalidArgument(_) | Self::InvalidUrl(_) => ErrorCategory::Argument,
            Self::InvalidResponse(_) => ErrorCategory::Format,
            Self::Cancelled(_) => ErrorCategory::Cancelled,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl RemoteError for Error {
    fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    fn is_cancelled(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }

    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Api {
                status: code,
                message: format!("HTTP {code}"),
            },
            ureq::Error::Timeout(which) => Self::Cancelled(format!("timed out ({which})")),
            other => Self::http(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
