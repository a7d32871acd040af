use crate::error::CoreError;
use crate::id::{GrantId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored status of an access grant.
///
/// Transitions are monotonic: `Active` may move to `Expired` or `Revoked`,
/// both of which are terminal. The sweep is the only writer of `Expired`;
/// readers derive the momentary state via [`AccessGrant::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    #[default]
    Active,
    Expired,
    Revoked,
}

impl GrantStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GrantStatus::Expired | GrantStatus::Revoked)
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantStatus::Active => write!(f, "active"),
            GrantStatus::Expired => write!(f, "expired"),
            GrantStatus::Revoked => write!(f, "revoked"),
        }
    }
}

impl FromStr for GrantStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GrantStatus::Active),
            "expired" => Ok(GrantStatus::Expired),
            "revoked" => Ok(GrantStatus::Revoked),
            other => Err(CoreError::invalid_grant_status(other)),
        }
    }
}

/// Scope of a grant. `Full` implies visibility of every record category
/// regardless of the grant's `record_types` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Full,
    #[default]
    ReadOnly,
    Limited,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Full => write!(f, "full"),
            AccessLevel::ReadOnly => write!(f, "readonly"),
            AccessLevel::Limited => write!(f, "limited"),
        }
    }
}

impl FromStr for AccessLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(AccessLevel::Full),
            "readonly" => Ok(AccessLevel::ReadOnly),
            "limited" => Ok(AccessLevel::Limited),
            other => Err(CoreError::invalid_access_level(other)),
        }
    }
}

/// Clinical category of a medical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordCategory {
    General,
    Lab,
    Prescription,
    Imaging,
    Vaccination,
    Other,
}

impl RecordCategory {
    pub const ALL: [RecordCategory; 6] = [
        RecordCategory::General,
        RecordCategory::Lab,
        RecordCategory::Prescription,
        RecordCategory::Imaging,
        RecordCategory::Vaccination,
        RecordCategory::Other,
    ];
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordCategory::General => write!(f, "general"),
            RecordCategory::Lab => write!(f, "lab"),
            RecordCategory::Prescription => write!(f, "prescription"),
            RecordCategory::Imaging => write!(f, "imaging"),
            RecordCategory::Vaccination => write!(f, "vaccination"),
            RecordCategory::Other => write!(f, "other"),
        }
    }
}

impl FromStr for RecordCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(RecordCategory::General),
            "lab" => Ok(RecordCategory::Lab),
            "prescription" => Ok(RecordCategory::Prescription),
            "imaging" => Ok(RecordCategory::Imaging),
            "vaccination" => Ok(RecordCategory::Vaccination),
            "other" => Ok(RecordCategory::Other),
            other => Err(CoreError::invalid_record_category(other)),
        }
    }
}

/// Free-text audit trail attached to a grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub granted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

impl GrantMetadata {
    pub fn is_empty(&self) -> bool {
        self.granted_by.is_none() && self.reason.is_none() && self.notes.is_none()
    }
}

/// Authorization for a medical provider to view a patient's records under a
/// scope and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub id: GrantId,
    pub patient_id: UserId,
    pub provider_id: UserId,
    pub status: GrantStatus,
    pub access_level: AccessLevel,
    pub record_types: Vec<RecordCategory>,
    pub granted_at: Timestamp,
    pub expires_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub revoked_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub blockchain_tx: Option<String>,
    #[serde(skip_serializing_if = "GrantMetadata::is_empty", default)]
    pub metadata: GrantMetadata,
}

impl AccessGrant {
    pub fn new(
        patient_id: UserId,
        provider_id: UserId,
        access_level: AccessLevel,
        record_types: Vec<RecordCategory>,
        granted_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            id: GrantId::generate(),
            patient_id,
            provider_id,
            status: GrantStatus::Active,
            access_level,
            record_types,
            granted_at,
            expires_at,
            revoked_at: None,
            blockchain_tx: None,
            metadata: GrantMetadata::default(),
        }
    }

    pub fn with_blockchain_tx(mut self, tx: impl Into<String>) -> Self {
        self.blockchain_tx = Some(tx.into());
        self
    }

    pub fn with_metadata(mut self, metadata: GrantMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The access state as of `now`, independent of whether the expiry sweep
    /// has run. The boundary is inclusive: at exactly `expires_at` the grant
    /// is already expired.
    pub fn effective_status(&self, now: Timestamp) -> GrantStatus {
        match self.status {
            GrantStatus::Revoked => GrantStatus::Revoked,
            GrantStatus::Expired => GrantStatus::Expired,
            GrantStatus::Active => {
                if self.expires_at <= now {
                    GrantStatus::Expired
                } else {
                    GrantStatus::Active
                }
            }
        }
    }

    /// Whether the grant's scope covers a record category. `Full` access
    /// implies every category; otherwise the category must be listed.
    pub fn allows_category(&self, category: RecordCategory) -> bool {
        self.access_level == AccessLevel::Full || self.record_types.contains(&category)
    }

    /// Whether the expiry deadline has passed as of `now` (stored status
    /// notwithstanding).
    pub fn is_past_deadline(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// Input to grant creation. `ttl_seconds` is validated by the lifecycle
/// manager, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub patient_id: UserId,
    pub provider_id: UserId,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(default)]
    pub record_types: Vec<RecordCategory>,
    pub ttl_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub blockchain_tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub granted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
}
