use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use veracity_core::{AccessGrant, GrantId, GrantStatus, Timestamp, UserId};
use veracity_storage::{GrantStore, StorageError};

/// In-memory grant store.
///
/// The `active_pairs` index maps each (patient, provider) pair to the id of
/// its currently Active grant. Claiming an entry in that index is the atomic
/// step that serializes concurrent `insert` calls for the same pair;
/// `update_status` releases the entry when a grant leaves Active.
#[derive(Debug, Default)]
pub struct MemoryGrantStore {
    grants: DashMap<GrantId, AccessGrant>,
    active_pairs: DashMap<(UserId, UserId), GrantId>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.grants.len()
    }

    /// Claim the pair index slot for a new grant. Fails if the slot is held
    /// by a grant that is still Active; a stale entry (grant gone or already
    /// terminal) is reclaimed.
    fn claim_pair(&self, grant: &AccessGrant) -> Result<(), StorageError> {
        let pair = (grant.patient_id, grant.provider_id);
        match self.active_pairs.entry(pair) {
            Entry::Vacant(slot) => {
                slot.insert(grant.id);
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                let holder = *slot.get();
                let still_active = self
                    .grants
                    .get(&holder)
                    .map(|g| g.status == GrantStatus::Active)
                    .unwrap_or(false);
                if still_active {
                    return Err(StorageError::already_exists(
                        "grant",
                        format!("pair {}/{}", grant.patient_id, grant.provider_id),
                    ));
                }
                slot.insert(grant.id);
                Ok(())
            }
        }
    }

    fn release_pair(&self, grant_id: GrantId, pair: (UserId, UserId)) {
        self.active_pairs.remove_if(&pair, |_, held| *held == grant_id);
    }

    fn sorted_desc(mut grants: Vec<AccessGrant>) -> Vec<AccessGrant> {
        grants.sort_by(|a, b| b.granted_at.cmp(&a.granted_at));
        grants
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn insert(&self, grant: AccessGrant) -> Result<AccessGrant, StorageError> {
        self.claim_pair(&grant)?;
        self.grants.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn find_by_id(&self, id: GrantId) -> Result<Option<AccessGrant>, StorageError> {
        Ok(self.grants.get(&id).map(|g| g.value().clone()))
    }

    async fn find_by_patient(&self, patient_id: UserId) -> Result<Vec<AccessGrant>, StorageError> {
        let matching = self
            .grants
            .iter()
            .filter(|g| g.patient_id == patient_id)
            .map(|g| g.value().clone())
            .collect();
        Ok(Self::sorted_desc(matching))
    }

    async fn find_by_provider(
        &self,
        provider_id: UserId,
    ) -> Result<Vec<AccessGrant>, StorageError> {
        let matching = self
            .grants
            .iter()
            .filter(|g| g.provider_id == provider_id)
            .map(|g| g.value().clone())
            .collect();
        Ok(Self::sorted_desc(matching))
    }

    async fn find_latest_for_pair(
        &self,
        patient_id: UserId,
        provider_id: UserId,
    ) -> Result<Option<AccessGrant>, StorageError> {
        let latest = self
            .grants
            .iter()
            .filter(|g| g.patient_id == patient_id && g.provider_id == provider_id)
            .map(|g| g.value().clone())
            .max_by_key(|g| g.granted_at);
        Ok(latest)
    }

    async fn update_status(
        &self,
        id: GrantId,
        new_status: GrantStatus,
        at: Timestamp,
        note: Option<String>,
    ) -> Result<AccessGrant, StorageError> {
        let updated = {
            let mut entry = self
                .grants
                .get_mut(&id)
                .ok_or_else(|| StorageError::not_found("grant", id))?;
            if entry.status != GrantStatus::Active {
                return Err(StorageError::invalid_transition(id, entry.status));
            }
            entry.status = new_status;
            if new_status == GrantStatus::Revoked {
                entry.revoked_at = Some(at);
            }
            if let Some(note) = note {
                entry.metadata.notes = Some(note);
            }
            entry.value().clone()
        };
        self.release_pair(id, (updated.patient_id, updated.provider_id));
        Ok(updated)
    }

    async fn list_expired(&self, now: Timestamp) -> Result<Vec<AccessGrant>, StorageError> {
        let expired = self
            .grants
            .iter()
            .filter(|g| g.status == GrantStatus::Active && g.expires_at <= now)
            .map(|g| g.value().clone())
            .collect();
        Ok(expired)
    }

    async fn delete(&self, id: GrantId) -> Result<(), StorageError> {
        let (_, removed) = self
            .grants
            .remove(&id)
            .ok_or_else(|| StorageError::not_found("grant", id))?;
        self.release_pair(id, (removed.patient_id, removed.provider_id));
        Ok(())
    }
}
