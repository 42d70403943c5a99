//! Error types for provider lifecycle operations.
//!
//! Every lifecycle failure maps to one [`ErrorCategory`] so the caller can
//! decide whether to retry, give up, or surface partial state.

use std::fmt;

use crate::resource::Operation;
use crate::value::PropertyMap;

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by a remote client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Categories of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A composite identifier could not be decoded.
    InvalidId,
    /// Inputs or wire data were malformed.
    InvalidInput,
    /// The remote service rejected or failed the call.
    Remote,
    /// A multi-step operation failed after the entity was created.
    Partial,
    /// The operation is not valid for this resource.
    IllegalOperation,
    /// The call was cancelled or ran past its deadline.
    Cancelled,
    /// No resource is registered under the requested type.
    UnknownType,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote)
    }

    /// Whether the engine must record partial state before giving up.
    #[must_use]
    pub fn carries_state(&self) -> bool {
        matches!(self, Self::Partial)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidId => "Malformed resource identifier",
            Self::InvalidInput => "Invalid input",
            Self::Remote => "Remote service error",
            Self::Partial => "Operation partially applied",
            Self::IllegalOperation => "Illegal operation",
            Self::Cancelled => "Operation cancelled",
            Self::UnknownType => "Unknown resource type",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::InvalidId => "Check the id format of the resource being imported",
            Self::InvalidInput => "Fix the resource inputs and try again",
            Self::Remote => "Check the service status and your access token",
            Self::Partial => "Refresh the resource to reconcile recorded state",
            Self::IllegalOperation => "The resource must be replaced instead",
            Self::Cancelled => "Run the operation again with a longer timeout",
            Self::UnknownType => "Run `pulumiservice types` to list supported types",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during provider operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A composite identifier did not match its layout.
    #[error("invalid {kind} id {id:?}: {reason}")]
    InvalidId {
        /// Kind of resource the id belongs to.
        kind: &'static str,
        /// The offending id.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Inputs or wire data were malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A remote call failed.
    #[error("failed to {operation} {resource}: {source}")]
    Remote {
        /// Resource kind.
        resource: &'static str,
        /// Lifecycle operation in progress.
        operation: Operation,
        /// Whether the client judged the failure transient.
        retryable: bool,
        /// Underlying client error.
        #[source]
        source: BoxError,
    },

    /// The entity exists remotely but a later step failed.
    ///
    /// The engine must persist `id`, `state` and `inputs` so the entity is
    /// tracked and can be reconciled.
    #[error("{resource} {id} was partially {operation}d: {source}")]
    PartialFailure {
        /// Resource kind.
        resource: &'static str,
        /// Lifecycle operation in progress.
        operation: Operation,
        /// Identifier of the entity that now exists.
        id: String,
        /// Best-known output state.
        state: PropertyMap,
        /// Inputs to record alongside the state.
        inputs: PropertyMap,
        /// The step that failed.
        #[source]
        source: Box<Error>,
    },

    /// The operation is never valid for this resource.
    #[error("{message}")]
    IllegalOperation {
        /// Resource kind.
        resource: &'static str,
        /// Lifecycle operation that was attempted.
        operation: Operation,
        /// Explanation.
        message: String,
    },

    /// The call context was cancelled or its deadline passed.
    #[error("{resource} {operation} cancelled: {reason}")]
    Cancelled {
        /// Resource kind.
        resource: &'static str,
        /// Lifecycle operation in progress.
        operation: Operation,
        /// Cancellation or deadline reason.
        reason: String,
    },

    /// No resource is registered under this type token.
    #[error("unknown resource type {0:?}")]
    UnknownResourceType(String),

    /// Worker pool setup failed.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl Error {
    /// Create an invalid id error.
    pub fn invalid_id(kind: &'static str, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a client error, mapping cancellation to [`Error::Cancelled`].
    pub fn remote<E: RemoteError>(resource: &'static str, operation: Operation, err: E) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled {
                resource,
                operation,
                reason: err.to_string(),
            };
        }
        Self::Remote {
            resource,
            operation,
            retryable: err.is_retryable(),
            source: Box::new(err),
        }
    }

    /// Reject an operation the resource never supports.
    pub fn illegal(resource: &'static str, operation: Operation, message: impl Into<String>) -> Self {
        Self::IllegalOperation {
            resource,
            operation,
            message: message.into(),
        }
    }

    /// Update called on a resource whose every change forces replacement.
    pub fn update_not_supported(resource: &'static str) -> Self {
        Self::illegal(
            resource,
            Operation::Update,
            "unexpected call to update, expected create to be called instead",
        )
    }

    /// Attach recorded state to a failure that happened after creation.
    #[must_use]
    pub fn partial(
        self,
        operation: Operation,
        id: impl Into<String>,
        state: PropertyMap,
        inputs: PropertyMap,
    ) -> Self {
        let resource = self.resource().unwrap_or("resource");
        Self::PartialFailure {
            resource,
            operation,
            id: id.into(),
            state,
            inputs,
            source: Box::new(self),
        }
    }

    /// Resource kind the error is about, if known.
    pub fn resource(&self) -> Option<&'static str> {
        match self {
            Self::Remote { resource, .. }
            | Self::PartialFailure { resource, .. }
            | Self::IllegalOperation { resource, .. }
            | Self::Cancelled { resource, .. } => Some(*resource),
            Self::InvalidId { kind, .. } => Some(*kind),
            Self::InvalidInput(_) | Self::UnknownResourceType(_) | Self::WorkerPool(_) => None,
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidId { .. } => ErrorCategory::InvalidId,
            Self::InvalidInput(_) | Self::WorkerPool(_) => ErrorCategory::InvalidInput,
            Self::Remote { .. } => ErrorCategory::Remote,
            Self::PartialFailure { .. } => ErrorCategory::Partial,
            Self::IllegalOperation { .. } => ErrorCategory::IllegalOperation,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::UnknownResourceType(_) => ErrorCategory::UnknownType,
        }
    }

    /// Whether this error is worth retrying.
    ///
    /// Only remote failures the client judged transient qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

/// Classification a remote client error must expose.
pub trait RemoteError: std::error::Error + Send + Sync + 'static {
    /// The entity does not exist remotely.
    fn is_not_found(&self) -> bool {
        false
    }

    /// The call was cancelled or timed out.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// The failure is transient.
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Conversions from client results into provider results.
pub trait RemoteResultExt<T> {
    /// Attach resource and operation context to a client failure.
    fn remote(self, resource: &'static str, operation: Operation) -> Result<T>;

    /// Like [`RemoteResultExt::remote`], but a not-found failure is `None`.
    fn or_absent(self, resource: &'static str, operation: Operation) -> Result<Option<T>>;
}

impl<T, E: RemoteError> RemoteResultExt<T> for std::result::Result<T, E> {
    fn remote(self, resource: &'static str, operation: Operation) -> Result<T> {
        self.map_err(|e| Error::remote(resource, operation, e))
    }

    fn or_absent(self, resource: &'static str, operation: Operation) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                log::debug!("{resource} not found during {operation}: {e}");
                Ok(None)
            }
            Err(e) => Err(Error::remote(resource, operation, e)),
        }
    }
}
