use thiserror::Error;
use veracity_core::{GrantId, GrantStatus, RecordId, Role, UserId};
use veracity_storage::StorageError;

/// Errors surfaced by the access services.
///
/// Storage errors are never suppressed; they either map to the domain error
/// they mean (duplicate pair, terminal transition) or pass through annotated
/// with the attempted operation.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User {id} does not have role {expected}")]
    InvalidRole { id: UserId, expected: Role },

    #[error("An active grant already exists for patient {patient_id} and provider {provider_id}")]
    DuplicateGrant {
        patient_id: UserId,
        provider_id: UserId,
    },

    #[error("Grant {id} is already {status}")]
    AlreadyTerminal { id: GrantId, status: GrantStatus },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Record payload is missing its cryptographic anchor")]
    MissingAnchor,

    #[error("A record with anchor {0} already exists")]
    DuplicateAnchor(String),

    #[error("Record {id}: {field} is write-once")]
    ImmutableField { id: RecordId, field: &'static str },

    #[error("Storage error during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
}

impl AccessError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_role(id: UserId, expected: Role) -> Self {
        Self::InvalidRole { id, expected }
    }

    pub fn duplicate_grant(patient_id: UserId, provider_id: UserId) -> Self {
        Self::DuplicateGrant {
            patient_id,
            provider_id,
        }
    }

    pub fn already_terminal(id: GrantId, status: GrantStatus) -> Self {
        Self::AlreadyTerminal { id, status }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn immutable_field(id: RecordId, field: &'static str) -> Self {
        Self::ImmutableField { id, field }
    }

    /// Annotate a storage error with the operation that triggered it.
    pub fn storage(operation: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Storage { operation, source }
    }

    /// Stable machine-readable code for this error, carried on the wire next
    /// to the human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidRole { .. } => "invalid_role",
            Self::DuplicateGrant { .. } => "duplicate_grant",
            Self::AlreadyTerminal { .. } => "already_terminal",
            Self::NotFound { .. } => "not_found",
            Self::MissingAnchor => "missing_anchor",
            Self::DuplicateAnchor(_) => "duplicate_anchor",
            Self::ImmutableField { .. } => "immutable_field",
            Self::Storage { source, .. } => match source {
                StorageError::NotFound { .. } => "not_found",
                StorageError::AlreadyExists { .. } => "conflict",
                StorageError::InvalidTransition { .. } => "conflict",
                StorageError::Internal { .. } => "internal",
            },
        }
    }
}

/// Convenience result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
