use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use veracity_core::{MedicalRecord, RecordId, UserId};
use veracity_storage::{RecordStore, StorageError};

/// In-memory record store. The anchor index enforces global anchor
/// uniqueness; claiming an index entry is the atomic step on insert.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: DashMap<RecordId, MedicalRecord>,
    anchors: DashMap<String, RecordId>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError> {
        match self.anchors.entry(record.anchor.clone()) {
            Entry::Occupied(_) => {
                return Err(StorageError::already_exists(
                    "record",
                    format!("anchor {}", record.anchor),
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(record.id);
            }
        }
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<MedicalRecord>, StorageError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_patient(
        &self,
        patient_id: UserId,
    ) -> Result<Vec<MedicalRecord>, StorageError> {
        let mut matching: Vec<MedicalRecord> = self
            .records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .map(|r| r.value().clone())
            .collect();
        matching.sort_by(|a, b| b.record_date.cmp(&a.record_date));
        Ok(matching)
    }

    async fn anchor_exists(&self, anchor: &str) -> Result<bool, StorageError> {
        Ok(self.anchors.contains_key(anchor))
    }

    async fn update(&self, record: MedicalRecord) -> Result<MedicalRecord, StorageError> {
        let mut entry = self
            .records
            .get_mut(&record.id)
            .ok_or_else(|| StorageError::not_found("record", record.id))?;
        *entry = record.clone();
        Ok(record)
    }
}
