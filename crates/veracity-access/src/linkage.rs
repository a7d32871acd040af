use std::sync::Arc;

use veracity_core::{MedicalRecord, RecordDraft, RecordId, RecordPatch, UserId, now_utc};
use veracity_storage::{RecordStore, StorageError, UserStore};

use crate::error::{AccessError, Result};

/// Validates and attaches medical records to patients.
///
/// Records are immutable at their core: the cryptographic anchor and the
/// encrypted-data hash are write-once, and only the surrounding metadata may
/// be corrected after ingestion.
#[derive(Clone)]
pub struct RecordLinkage {
    records: Arc<dyn RecordStore>,
    users: Arc<dyn UserStore>,
}

impl RecordLinkage {
    pub fn new(records: Arc<dyn RecordStore>, users: Arc<dyn UserStore>) -> Self {
        Self { records, users }
    }

    /// Ingest a record for a patient.
    ///
    /// The anchor must be present and globally unique; the uniqueness check is
    /// also enforced atomically at the store, so a concurrent ingest with the
    /// same anchor cannot slip through between check and write.
    pub async fn ingest(&self, patient_id: UserId, draft: RecordDraft) -> Result<MedicalRecord> {
        if draft.anchor.trim().is_empty() {
            return Err(AccessError::MissingAnchor);
        }
        if draft.encrypted_data_hash.trim().is_empty() {
            return Err(AccessError::validation("encryptedDataHash is required"));
        }
        if draft.title.trim().is_empty() {
            return Err(AccessError::validation("title is required"));
        }

        self.users
            .find_by_id(patient_id)
            .await
            .map_err(AccessError::storage("user lookup"))?
            .ok_or_else(|| AccessError::not_found("user", patient_id))?;

        if self
            .records
            .anchor_exists(&draft.anchor)
            .await
            .map_err(AccessError::storage("anchor lookup"))?
        {
            return Err(AccessError::DuplicateAnchor(draft.anchor));
        }

        let record = MedicalRecord::from_draft(patient_id, draft, now_utc());
        let anchor = record.anchor.clone();
        let stored = match self.records.insert(record).await {
            Ok(stored) => stored,
            // lost the race against a concurrent ingest with the same anchor
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AccessError::DuplicateAnchor(anchor));
            }
            Err(e) => return Err(AccessError::storage("record insert")(e)),
        };

        tracing::info!(
            record_id = %stored.id,
            patient_id = %stored.patient_id,
            category = %stored.category,
            "Medical record ingested"
        );
        Ok(stored)
    }

    /// Amend a record's mutable fields.
    ///
    /// Fails with `ImmutableField` if the patch tries to alter the anchor or
    /// the encrypted-data hash; otherwise applies the patch and refreshes
    /// `updated_at`.
    pub async fn amend_metadata(
        &self,
        record_id: RecordId,
        patch: RecordPatch,
    ) -> Result<MedicalRecord> {
        if patch.anchor.is_some() {
            return Err(AccessError::immutable_field(record_id, "anchor"));
        }
        if patch.encrypted_data_hash.is_some() {
            return Err(AccessError::immutable_field(record_id, "encryptedDataHash"));
        }

        let mut record = self
            .records
            .find_by_id(record_id)
            .await
            .map_err(AccessError::storage("record lookup"))?
            .ok_or_else(|| AccessError::not_found("record", record_id))?;

        record.apply_patch(patch);
        self.records
            .update(record)
            .await
            .map_err(AccessError::storage("record update"))
    }
}
