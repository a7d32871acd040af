use thiserror::Error;

/// Core error types for Veracity domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Invalid grant status: {0}")]
    InvalidGrantStatus(String),

    #[error("Invalid access level: {0}")]
    InvalidAccessLevel(String),

    #[error("Invalid record category: {0}")]
    InvalidRecordCategory(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("UUID error: {0}")]
    UuidError(#[from] uuid::Error),
}

impl CoreError {
    /// Create a new InvalidRole error
    pub fn invalid_role(role: impl Into<String>) -> Self {
        Self::InvalidRole(role.into())
    }

    /// Create a new InvalidGrantStatus error
    pub fn invalid_grant_status(status: impl Into<String>) -> Self {
        Self::InvalidGrantStatus(status.into())
    }

    /// Create a new InvalidAccessLevel error
    pub fn invalid_access_level(level: impl Into<String>) -> Self {
        Self::InvalidAccessLevel(level.into())
    }

    /// Create a new InvalidRecordCategory error
    pub fn invalid_record_category(category: impl Into<String>) -> Self {
        Self::InvalidRecordCategory(category.into())
    }

    /// Create a new InvalidTimestamp error
    pub fn invalid_timestamp(message: impl Into<String>) -> Self {
        Self::InvalidTimestamp(message.into())
    }

    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRole(_)
                | Self::InvalidGrantStatus(_)
                | Self::InvalidAccessLevel(_)
                | Self::InvalidRecordCategory(_)
                | Self::InvalidTimestamp(_)
                | Self::InvalidId(_)
                | Self::JsonError(_)
        )
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRole(_)
            | Self::InvalidGrantStatus(_)
            | Self::InvalidAccessLevel(_)
            | Self::InvalidRecordCategory(_)
            | Self::InvalidTimestamp(_)
            | Self::InvalidId(_) => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::UuidError(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Serialization,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
