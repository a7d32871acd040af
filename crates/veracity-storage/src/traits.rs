//! Storage traits for the Veracity storage abstraction layer.
//!
//! This module defines the contracts all storage backends must implement.
//! Implementations must be thread-safe (`Send + Sync`); every operation is
//! potentially blocking I/O and callers must not hold in-process locks across
//! the await.

use async_trait::async_trait;

use crate::error::StorageError;
use veracity_core::{
    AccessGrant, GrantId, GrantStatus, MedicalRecord, RecordId, Timestamp, User, UserId,
};

/// Durable keyed storage and range queries over access grants.
///
/// The store is where the one dangerous race is closed: `insert` must be
/// atomic with respect to the "at most one Active grant per (patient,
/// provider) pair" invariant, and `update_status` must be a conditional write
/// on the stored status.
///
/// # Example
///
/// ```ignore
/// use veracity_storage::{GrantStore, StorageError};
///
/// async fn latest(store: &dyn GrantStore, patient: UserId, provider: UserId)
///     -> Result<Option<AccessGrant>, StorageError>
/// {
///     store.find_latest_for_pair(patient, provider).await
/// }
/// ```
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Persists a new grant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if an Active grant already exists
    /// for the same (patient, provider) pair. The check and the write are a
    /// single atomic step; two concurrent inserts for the same pair cannot
    /// both succeed.
    async fn insert(&self, grant: AccessGrant) -> Result<AccessGrant, StorageError>;

    /// Reads a grant by id. Returns `None` if absent; errors are reserved for
    /// infrastructure failures.
    async fn find_by_id(&self, id: GrantId) -> Result<Option<AccessGrant>, StorageError>;

    /// All grants where the given user is the patient, ordered by
    /// `granted_at` descending. An empty result is not an error.
    async fn find_by_patient(&self, patient_id: UserId) -> Result<Vec<AccessGrant>, StorageError>;

    /// All grants where the given user is the provider, ordered by
    /// `granted_at` descending.
    async fn find_by_provider(&self, provider_id: UserId)
    -> Result<Vec<AccessGrant>, StorageError>;

    /// The most recent grant for a (patient, provider) pair, if any.
    async fn find_latest_for_pair(
        &self,
        patient_id: UserId,
        provider_id: UserId,
    ) -> Result<Option<AccessGrant>, StorageError>;

    /// Transitions a grant out of Active into a terminal status.
    ///
    /// When `new_status` is Revoked the store stamps `revoked_at = at`. An
    /// optional audit `note` is recorded on the grant's metadata. The status
    /// check and the write are one conditional update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such grant exists.
    /// Returns `StorageError::InvalidTransition` if the stored status is not
    /// Active.
    async fn update_status(
        &self,
        id: GrantId,
        new_status: GrantStatus,
        at: Timestamp,
        note: Option<String>,
    ) -> Result<AccessGrant, StorageError>;

    /// Active grants whose `expires_at` is at or before `now` (sweep input).
    async fn list_expired(&self, now: Timestamp) -> Result<Vec<AccessGrant>, StorageError>;

    /// Administrative purge. Not used by lifecycle transitions, only by
    /// retention/compliance cleanup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such grant exists.
    async fn delete(&self, id: GrantId) -> Result<(), StorageError>;
}

/// Storage for immutable medical records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the record's anchor already
    /// exists anywhere in the store (anchors are globally unique, across
    /// patients).
    async fn insert(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError>;

    /// Reads a record by id. Returns `None` if absent.
    async fn find_by_id(&self, id: RecordId) -> Result<Option<MedicalRecord>, StorageError>;

    /// All records for a patient, ordered by `record_date` descending.
    async fn find_by_patient(&self, patient_id: UserId)
    -> Result<Vec<MedicalRecord>, StorageError>;

    /// Whether any record carries the given anchor.
    async fn anchor_exists(&self, anchor: &str) -> Result<bool, StorageError>;

    /// Replaces a stored record (metadata amendments). The anchor index is
    /// keyed by the record's existing anchor; callers never change it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn update(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError>;
}

/// Storage for the user directory.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the subject or wallet address
    /// is already taken.
    async fn insert(&self, user: User) -> Result<User, StorageError>;

    /// Reads a user by id. Returns `None` if absent.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Looks a user up by wallet address.
    async fn find_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, StorageError>;

    /// All users, ordered by `created_at` descending.
    async fn list(&self) -> Result<Vec<User>, StorageError>;

    /// Replaces a stored user (profile updates).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn update(&self, user: User) -> Result<User, StorageError>;

    /// Removes a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn delete(&self, id: UserId) -> Result<(), StorageError>;
}

// Ensure traits are object-safe by using them as trait objects
#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that GrantStore is object-safe
    fn _assert_grant_store_object_safe(_: &dyn GrantStore) {}

    // Compile-time test that RecordStore is object-safe
    fn _assert_record_store_object_safe(_: &dyn RecordStore) {}

    // Compile-time test that UserStore is object-safe
    fn _assert_user_store_object_safe(_: &dyn UserStore) {}
}
