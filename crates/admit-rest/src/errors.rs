//! Status errors returned by the update path
//!
//! Taxonomy:
//! - internal faults (unreadable metadata, missing request namespace)
//! - namespace conflicts between the object and the request
//! - invalid objects, carrying every field error found
//! - store-level outcomes (not found, stale resource version)

use admit_meta::{ErrorList, GroupKind, GroupResource};

/// Machine-readable reason attached to a [`StatusError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StatusReason {
    /// Unexpected server-side failure
    InternalError,
    /// Malformed or inconsistent request
    BadRequest,
    /// Object failed validation
    Invalid,
    /// Object does not exist
    NotFound,
    /// Write raced with another write
    Conflict,
    /// Verb not supported for this resource
    MethodNotAllowed,
    /// Nested commit depth exhausted
    LoopDetected,
    /// Request was cancelled or timed out
    Cancelled,
}

/// Terminal error for a single update attempt
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// Internal fault; detail is kept as the error source, never in the message
    #[error("Internal error occurred")]
    Internal(#[source] anyhow::Error),

    /// Object namespace disagrees with the namespace resolved for the request
    #[error(
        "the namespace of the provided object ({object:?}) does not match the namespace sent on the request ({request:?})"
    )]
    NamespaceConflict {
        /// Namespace carried by the object
        object: String,
        /// Namespace expected for the request
        request: String,
    },

    /// Object failed validation
    #[error("{kind} {name:?} is invalid: {errors}")]
    Invalid {
        /// Kind of the rejected object
        kind: GroupKind,
        /// Name of the rejected object
        name: String,
        /// Every field error found, in order
        errors: ErrorList,
    },

    /// Target object does not exist
    #[error("{resource} {name:?} not found")]
    NotFound {
        /// Resource collection
        resource: GroupResource,
        /// Object name
        name: String,
    },

    /// Store rejected the write, typically a stale resource version
    #[error("Operation cannot be fulfilled on {resource} {name:?}: {message}")]
    Conflict {
        /// Resource collection
        resource: GroupResource,
        /// Object name
        name: String,
        /// Store-supplied reason
        message: String,
    },

    /// Request is malformed
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Operation not implemented by the strategy or store
    #[error("method not supported: {0}")]
    MethodNotSupported(String),

    /// Indirect commit re-entered too many times
    #[error("update recursion limit reached at depth {depth}")]
    RecursionLimit {
        /// Depth at which re-entry was refused
        depth: u32,
    },

    /// Request context was cancelled before the work started
    #[error("request cancelled")]
    Cancelled,
}

impl StatusError {
    /// Wrap an unexpected failure
    ///
    /// The detail is logged here and kept only as the error source.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        tracing::error!(error = %err, "internal error during update");
        Self::Internal(err)
    }

    /// Create invalid error
    #[inline]
    #[must_use]
    pub fn invalid(kind: GroupKind, name: impl Into<String>, errors: ErrorList) -> Self {
        Self::Invalid {
            kind,
            name: name.into(),
            errors,
        }
    }

    /// Create not-found error
    #[inline]
    #[must_use]
    pub fn not_found(resource: GroupResource, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            name: name.into(),
        }
    }

    /// Create store conflict error
    #[inline]
    #[must_use]
    pub fn conflict(resource: GroupResource, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Machine-readable reason
    #[must_use]
    pub fn reason(&self) -> StatusReason {
        match self {
            Self::Internal(_) => StatusReason::InternalError,
            Self::NamespaceConflict { .. } | Self::BadRequest(_) => StatusReason::BadRequest,
            Self::Invalid { .. } => StatusReason::Invalid,
            Self::NotFound { .. } => StatusReason::NotFound,
            Self::Conflict { .. } => StatusReason::Conflict,
            Self::MethodNotSupported(_) => StatusReason::MethodNotAllowed,
            Self::RecursionLimit { .. } => StatusReason::LoopDetected,
            Self::Cancelled => StatusReason::Cancelled,
        }
    }

    /// HTTP-style status code
    #[must_use]
    pub fn code(&self) -> u16 {
        match self.reason() {
            StatusReason::InternalError => 500,
            StatusReason::BadRequest => 400,
            StatusReason::Invalid => 422,
            StatusReason::NotFound => 404,
            StatusReason::Conflict => 409,
            StatusReason::MethodNotAllowed => 405,
            StatusReason::LoopDetected => 508,
            StatusReason::Cancelled => 499,
        }
    }

    /// Check if a fresh attempt with a re-fetched prior object could succeed
    ///
    /// Only store conflicts qualify; everything raised by the pipeline is
    /// deterministic for identical inputs.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Field errors carried by an invalid error
    #[must_use]
    pub fn field_errors(&self) -> Option<&ErrorList> {
        match self {
            Self::Invalid { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admit_meta::{FieldError, FieldPath};

    #[test]
    fn internal_hides_detail() {
        let err = StatusError::internal(anyhow::anyhow!("accessor exploded at 0xdeadbeef"));
        assert_eq!(err.to_string(), "Internal error occurred");
        assert_eq!(err.code(), 500);

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("accessor exploded at 0xdeadbeef"));
    }

    #[test]
    fn invalid_carries_errors() {
        let errors: ErrorList = vec![FieldError::required(&FieldPath::new("spec").child("a"), "")].into();
        let err = StatusError::invalid(GroupKind::new("apps", "Widget"), "w1", errors);

        assert_eq!(err.reason(), StatusReason::Invalid);
        assert_eq!(err.code(), 422);
        assert_eq!(err.field_errors().map(ErrorList::len), Some(1));
        assert_eq!(
            err.to_string(),
            "Widget.apps \"w1\" is invalid: spec.a: Required value"
        );
    }

    #[test]
    fn namespace_conflict_is_bad_request() {
        let err = StatusError::NamespaceConflict {
            object: "ns-b".into(),
            request: "ns-a".into(),
        };
        assert_eq!(err.reason(), StatusReason::BadRequest);
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_store_conflict_is_retryable() {
        let conflict = StatusError::conflict(GroupResource::new("", "widgets"), "w1", "stale");
        assert!(conflict.is_retryable());
        assert!(!StatusError::Cancelled.is_retryable());
        assert!(!StatusError::BadRequest("x".into()).is_retryable());
    }
}
