//! Storage error types for the Veracity storage abstraction layer.

use std::fmt;
use veracity_core::GrantStatus;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity that was not found (user, grant, record).
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Attempted to create an entity that collides with an existing one on a
    /// unique key (grant pair, record anchor, user wallet/subject).
    #[error("{entity} already exists for {key}")]
    AlreadyExists {
        /// The kind of entity.
        entity: &'static str,
        /// The unique key that collided.
        key: String,
    },

    /// Attempted a status transition out of a terminal state.
    #[error("Invalid transition for grant {id}: status is {current}, not active")]
    InvalidTransition {
        /// The grant whose transition was rejected.
        id: String,
        /// The stored status at the time of the attempt.
        current: GrantStatus,
    },

    /// An internal storage error occurred.
    #[error("Internal storage error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    /// Creates a new `InvalidTransition` error.
    #[must_use]
    pub fn invalid_transition(id: impl ToString, current: GrantStatus) -> Self {
        Self::InvalidTransition {
            id: id.to_string(),
            current,
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` if this is an invalid transition error.
    #[must_use]
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidTransition { .. } => ErrorCategory::Transition,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Entity not found.
    NotFound,
    /// Unique-key conflict.
    Conflict,
    /// Rejected status transition.
    Transition,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Transition => write!(f, "transition"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
