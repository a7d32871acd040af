use std::sync::Arc;

use serde::Serialize;
use veracity_core::{
    AccessGrant, GrantId, GrantStatus, MedicalRecord, RecordCategory, RecordId, Timestamp, UserId,
};
use veracity_storage::{GrantStore, RecordStore};

use crate::error::{AccessError, Result};

/// A grant paired with its effective status as of a query instant. This is
/// what read paths return, so callers never see a stale stored status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantView {
    #[serde(flatten)]
    pub grant: AccessGrant,
    pub effective_status: GrantStatus,
}

impl GrantView {
    pub fn at(grant: AccessGrant, now: Timestamp) -> Self {
        let effective_status = grant.effective_status(now);
        Self {
            grant,
            effective_status,
        }
    }
}

/// Answers current-access questions without mutating stored status, tolerating
/// the gap between an expiry deadline passing and the next sweep.
#[derive(Clone)]
pub struct AccessQuery {
    grants: Arc<dyn GrantStore>,
    records: Arc<dyn RecordStore>,
}

impl AccessQuery {
    pub fn new(grants: Arc<dyn GrantStore>, records: Arc<dyn RecordStore>) -> Self {
        Self { grants, records }
    }

    /// Whether the provider may currently see the patient's records of the
    /// given category. Uses the most recent grant for the pair; a grant past
    /// its deadline answers false even if the sweep has not run.
    pub async fn has_access(
        &self,
        patient_id: UserId,
        provider_id: UserId,
        category: RecordCategory,
        now: Timestamp,
    ) -> Result<bool> {
        let grant = match self.latest_for_pair(patient_id, provider_id).await? {
            Some(grant) => grant,
            None => return Ok(false),
        };
        if grant.effective_status(now) != GrantStatus::Active {
            return Ok(false);
        }
        Ok(grant.allows_category(category))
    }

    /// The subset of the patient's records the provider may currently see.
    ///
    /// A single grant fetch decides the scope; the records are then filtered
    /// by category. No access means an empty result, not an error.
    pub async fn visible_records(
        &self,
        patient_id: UserId,
        provider_id: UserId,
        now: Timestamp,
    ) -> Result<Vec<MedicalRecord>> {
        let grant = match self.latest_for_pair(patient_id, provider_id).await? {
            Some(grant) => grant,
            None => return Ok(Vec::new()),
        };
        if grant.effective_status(now) != GrantStatus::Active {
            return Ok(Vec::new());
        }

        let records = self
            .records
            .find_by_patient(patient_id)
            .await
            .map_err(AccessError::storage("record scan"))?;
        Ok(records
            .into_iter()
            .filter(|record| grant.allows_category(record.category))
            .collect())
    }

    /// The most recent grant for a pair together with its effective status.
    pub async fn grant_for_pair(
        &self,
        patient_id: UserId,
        provider_id: UserId,
        now: Timestamp,
    ) -> Result<Option<GrantView>> {
        Ok(self
            .latest_for_pair(patient_id, provider_id)
            .await?
            .map(|grant| GrantView::at(grant, now)))
    }

    /// A single grant by id, with effective status.
    pub async fn find_grant(&self, id: GrantId, now: Timestamp) -> Result<Option<GrantView>> {
        let grant = self
            .grants
            .find_by_id(id)
            .await
            .map_err(AccessError::storage("grant lookup"))?;
        Ok(grant.map(|g| GrantView::at(g, now)))
    }

    /// All grants where the user is the patient, newest first.
    pub async fn grants_for_patient(
        &self,
        patient_id: UserId,
        now: Timestamp,
    ) -> Result<Vec<GrantView>> {
        let grants = self
            .grants
            .find_by_patient(patient_id)
            .await
            .map_err(AccessError::storage("grant scan"))?;
        Ok(grants.into_iter().map(|g| GrantView::at(g, now)).collect())
    }

    /// All grants where the user is the provider, newest first.
    pub async fn grants_for_provider(
        &self,
        provider_id: UserId,
        now: Timestamp,
    ) -> Result<Vec<GrantView>> {
        let grants = self
            .grants
            .find_by_provider(provider_id)
            .await
            .map_err(AccessError::storage("grant scan"))?;
        Ok(grants.into_iter().map(|g| GrantView::at(g, now)).collect())
    }

    /// A patient's own records, unfiltered. This is the owner's view; the
    /// provider view goes through `visible_records`.
    pub async fn records_for_patient(&self, patient_id: UserId) -> Result<Vec<MedicalRecord>> {
        self.records
            .find_by_patient(patient_id)
            .await
            .map_err(AccessError::storage("record scan"))
    }

    /// A single record by id.
    pub async fn find_record(&self, id: RecordId) -> Result<Option<MedicalRecord>> {
        self.records
            .find_by_id(id)
            .await
            .map_err(AccessError::storage("record lookup"))
    }

    async fn latest_for_pair(
        &self,
        patient_id: UserId,
        provider_id: UserId,
    ) -> Result<Option<AccessGrant>> {
        self.grants
            .find_latest_for_pair(patient_id, provider_id)
            .await
            .map_err(AccessError::storage("grant lookup"))
    }
}
