use crate::grant::RecordCategory;
use crate::id::{RecordId, UserId};
use crate::time::{Timestamp, now_utc};
use serde::{Deserialize, Serialize};

/// A medication entry within a record's structured metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration: Option<String>,
}

/// Structured clinical metadata. All fields are corrections-friendly: they may
/// be amended after ingestion, unlike the anchor and data hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub clinician: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub facility: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnoses: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub procedures: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub medications: Vec<Medication>,
}

/// A file attached to a record, referenced by hash and off-chain locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_type: Option<String>,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub locator: Option<String>,
}

/// Immutable clinical entry anchored to a blockchain transaction.
///
/// `anchor` and `encrypted_data_hash` are write-once; the linkage service
/// rejects any amendment that touches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: RecordId,
    pub patient_id: UserId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub record_date: Timestamp,
    pub category: RecordCategory,
    pub anchor: String,
    pub encrypted_data_hash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_locator: Option<String>,
    #[serde(default)]
    pub metadata: RecordMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attachments: Vec<Attachment>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MedicalRecord {
    /// Materialize a draft into a stored record. Timestamps are set here so
    /// `created_at == updated_at` at ingestion.
    pub fn from_draft(patient_id: UserId, draft: RecordDraft, now: Timestamp) -> Self {
        Self {
            id: RecordId::generate(),
            patient_id,
            title: draft.title,
            description: draft.description,
            record_date: draft.record_date,
            category: draft.category,
            anchor: draft.anchor,
            encrypted_data_hash: draft.encrypted_data_hash,
            content_locator: draft.content_locator,
            metadata: draft.metadata,
            attachments: draft.attachments,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a metadata patch; the caller has already verified the patch does
    /// not touch immutable fields. Refreshes `updated_at`.
    pub fn apply_patch(&mut self, patch: RecordPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(record_date) = patch.record_date {
            self.record_date = record_date;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(locator) = patch.content_locator {
            self.content_locator = Some(locator);
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = metadata;
        }
        if let Some(attachments) = patch.attachments {
            self.attachments = attachments;
        }
        self.updated_at = now_utc();
    }
}

/// Ingestion payload for a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    pub record_date: Timestamp,
    pub category: RecordCategory,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub encrypted_data_hash: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_locator: Option<String>,
    #[serde(default)]
    pub metadata: RecordMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attachments: Vec<Attachment>,
}

/// Amendment to a stored record. Anchor and data hash are deliberately absent
/// from the mutable fields; attempts to set them arrive via `anchor`/
/// `encrypted_data_hash` and are rejected by the linkage service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub record_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<RecordCategory>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_locator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<RecordMetadata>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub attachments: Option<Vec<Attachment>>,
    // rejected if present; kept in the wire type so the attempt is visible
    // to the service instead of silently dropped at deserialization
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub encrypted_data_hash: Option<String>,
}

impl RecordPatch {
    /// Whether the patch tries to alter a write-once field.
    pub fn touches_immutable(&self) -> bool {
        self.anchor.is_some() || self.encrypted_data_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn draft(anchor: &str) -> RecordDraft {
        RecordDraft {
            title: "Annual checkup".into(),
            description: None,
            record_date: Timestamp::new(datetime!(2024-02-10 00:00:00 UTC)),
            category: RecordCategory::General,
            anchor: anchor.into(),
            encrypted_data_hash: "0xhash".into(),
            content_locator: None,
            metadata: RecordMetadata::default(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_from_draft_sets_timestamps() {
        let now = Timestamp::new(datetime!(2024-03-01 12:00:00 UTC));
        let record = MedicalRecord::from_draft(UserId::generate(), draft("0xabc"), now);
        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
        assert_eq!(record.anchor, "0xabc");
    }

    #[test]
    fn test_apply_patch_moves_updated_at_only() {
        let now = Timestamp::new(datetime!(2024-03-01 12:00:00 UTC));
        let mut record = MedicalRecord::from_draft(UserId::generate(), draft("0xabc"), now);
        std::thread::sleep(std::time::Duration::from_millis(1));

        record.apply_patch(RecordPatch {
            description: Some("Corrected description".into()),
            ..Default::default()
        });

        assert_eq!(record.description.as_deref(), Some("Corrected description"));
        assert_eq!(record.created_at, now);
        assert!(record.updated_at > now);
        // immutables untouched
        assert_eq!(record.anchor, "0xabc");
        assert_eq!(record.encrypted_data_hash, "0xhash");
    }

    #[test]
    fn test_patch_immutable_detection() {
        let clean = RecordPatch {
            title: Some("New title".into()),
            ..Default::default()
        };
        assert!(!clean.touches_immutable());

        let dirty = RecordPatch {
            anchor: Some("0xother".into()),
            ..Default::default()
        };
        assert!(dirty.touches_immutable());

        let dirty_hash = RecordPatch {
            encrypted_data_hash: Some("0xother".into()),
            ..Default::default()
        };
        assert!(dirty_hash.touches_immutable());
    }

    #[test]
    fn test_record_wire_format() {
        let now = Timestamp::new(datetime!(2024-03-01 12:00:00 UTC));
        let record = MedicalRecord::from_draft(UserId::generate(), draft("0xabc"), now);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["patientId"].is_string());
        assert_eq!(json["category"], "general");
        assert_eq!(json["encryptedDataHash"], "0xhash");
        assert!(json.get("attachments").is_none());
    }

    #[test]
    fn test_draft_deserializes_without_anchor() {
        // missing anchor must deserialize (to empty) so the service can
        // report MissingAnchor instead of a bare 422
        let draft: RecordDraft = serde_json::from_value(serde_json::json!({
            "title": "Labs",
            "recordDate": "2024-02-10T00:00:00Z",
            "category": "lab",
            "encryptedDataHash": "0xhash",
        }))
        .unwrap();
        assert!(draft.anchor.is_empty());
    }
}
