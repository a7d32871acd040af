use std::sync::Arc;

use time::Duration;
use veracity_core::{
    AccessGrant, GrantId, GrantMetadata, GrantRequest, GrantStatus, Role, Timestamp, UserId,
    now_utc,
};
use veracity_storage::{GrantStore, StorageError, UserStore};

use crate::error::{AccessError, Result};

/// Upper bound on grant ttl: one hundred years, far past any clinical use but
/// safely inside timestamp arithmetic.
pub const MAX_TTL_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// The grant state machine: `Active -> {Expired, Revoked}`, both terminal.
///
/// All validation happens before the store is touched; a failed validation
/// never reaches storage, and nothing here retries a failed write.
#[derive(Clone)]
pub struct GrantLifecycle {
    grants: Arc<dyn GrantStore>,
    users: Arc<dyn UserStore>,
}

impl GrantLifecycle {
    pub fn new(grants: Arc<dyn GrantStore>, users: Arc<dyn UserStore>) -> Self {
        Self { grants, users }
    }

    /// Create an Active grant for a (patient, provider) pair.
    ///
    /// Validates the ttl, both parties' roles, and pair uniqueness. A prior
    /// grant that is past its deadline but not yet swept is finalized here so
    /// re-granting does not have to wait for the periodic sweep.
    pub async fn grant_access(&self, request: GrantRequest) -> Result<AccessGrant> {
        let now = now_utc();
        self.grant_access_at(request, now).await
    }

    /// `grant_access` with an explicit clock, for deterministic tests.
    pub async fn grant_access_at(
        &self,
        request: GrantRequest,
        now: Timestamp,
    ) -> Result<AccessGrant> {
        if request.ttl_seconds <= 0 {
            return Err(AccessError::validation("ttlSeconds must be positive"));
        }
        if request.ttl_seconds > MAX_TTL_SECONDS {
            return Err(AccessError::validation(format!(
                "ttlSeconds must be at most {MAX_TTL_SECONDS}"
            )));
        }
        if request.patient_id == request.provider_id {
            return Err(AccessError::validation(
                "patientId and providerId must differ",
            ));
        }

        self.require_role(request.patient_id, Role::Patient).await?;
        self.require_role(request.provider_id, Role::MedicalCenter)
            .await?;

        if let Some(latest) = self
            .grants
            .find_latest_for_pair(request.patient_id, request.provider_id)
            .await
            .map_err(AccessError::storage("grant lookup"))?
        {
            match latest.effective_status(now) {
                GrantStatus::Active => {
                    return Err(AccessError::duplicate_grant(
                        request.patient_id,
                        request.provider_id,
                    ));
                }
                GrantStatus::Expired if latest.status == GrantStatus::Active => {
                    // overdue but unswept; finalize so the pair slot frees up
                    match self
                        .grants
                        .update_status(latest.id, GrantStatus::Expired, now, None)
                        .await
                    {
                        Ok(_) => {}
                        // a concurrent sweep or revoke got there first
                        Err(StorageError::InvalidTransition { .. }) => {}
                        Err(e) => return Err(AccessError::storage("grant expiry")(e)),
                    }
                }
                _ => {}
            }
        }

        let expires_at = now.saturating_add(Duration::seconds(request.ttl_seconds));
        let mut grant = AccessGrant::new(
            request.patient_id,
            request.provider_id,
            request.access_level,
            request.record_types,
            now,
            expires_at,
        )
        .with_metadata(GrantMetadata {
            granted_by: request.granted_by,
            reason: request.reason,
            notes: None,
        });
        if let Some(tx) = request.blockchain_tx {
            grant = grant.with_blockchain_tx(tx);
        }

        let stored = match self.grants.insert(grant).await {
            Ok(stored) => stored,
            // lost the race against a concurrent grant for the same pair
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AccessError::duplicate_grant(
                    request.patient_id,
                    request.provider_id,
                ));
            }
            Err(e) => return Err(AccessError::storage("grant insert")(e)),
        };

        tracing::info!(
            grant_id = %stored.id,
            patient_id = %stored.patient_id,
            provider_id = %stored.provider_id,
            expires_at = %stored.expires_at,
            "Access grant created"
        );
        Ok(stored)
    }

    /// Revoke an Active grant, stamping `revoked_at` and recording the actor
    /// on the grant's metadata.
    pub async fn revoke(&self, grant_id: GrantId, actor_id: UserId) -> Result<AccessGrant> {
        let now = now_utc();
        self.revoke_at(grant_id, actor_id, now).await
    }

    /// `revoke` with an explicit clock, for deterministic tests.
    pub async fn revoke_at(
        &self,
        grant_id: GrantId,
        actor_id: UserId,
        now: Timestamp,
    ) -> Result<AccessGrant> {
        let note = format!("revoked by {actor_id}");
        let revoked = match self
            .grants
            .update_status(grant_id, GrantStatus::Revoked, now, Some(note))
            .await
        {
            Ok(revoked) => revoked,
            Err(StorageError::NotFound { .. }) => {
                return Err(AccessError::not_found("grant", grant_id));
            }
            Err(StorageError::InvalidTransition { current, .. }) => {
                return Err(AccessError::already_terminal(grant_id, current));
            }
            Err(e) => return Err(AccessError::storage("grant revoke")(e)),
        };

        tracing::info!(
            grant_id = %revoked.id,
            actor_id = %actor_id,
            "Access grant revoked"
        );
        Ok(revoked)
    }

    /// Transition every Active grant whose deadline has passed to Expired.
    ///
    /// Idempotent: a second run over the same instant finds nothing left to
    /// do. Individual failures (a grant revoked mid-sweep, a flaky write) are
    /// logged and skipped; a crash mid-sweep just leaves some grants Active
    /// until the next run, masked for readers by `effective_status`.
    pub async fn sweep_expired(&self, now: Timestamp) -> Result<usize> {
        let due = self
            .grants
            .list_expired(now)
            .await
            .map_err(AccessError::storage("expiry scan"))?;

        let mut transitioned = 0;
        for grant in due {
            match self
                .grants
                .update_status(grant.id, GrantStatus::Expired, now, None)
                .await
            {
                Ok(_) => transitioned += 1,
                Err(StorageError::InvalidTransition { .. }) | Err(StorageError::NotFound { .. }) => {
                    tracing::debug!(grant_id = %grant.id, "Grant left Active state mid-sweep, skipping");
                }
                Err(e) => {
                    tracing::warn!(grant_id = %grant.id, error = %e, "Failed to expire grant");
                }
            }
        }

        if transitioned > 0 {
            tracing::info!(transitioned, "Expiry sweep completed");
        }
        Ok(transitioned)
    }

    /// Administrative purge of a grant record. Retention cleanup only; normal
    /// lifecycle transitions never remove records.
    pub async fn purge(&self, grant_id: GrantId) -> Result<()> {
        match self.grants.delete(grant_id).await {
            Ok(()) => {
                tracing::info!(grant_id = %grant_id, "Access grant purged");
                Ok(())
            }
            Err(StorageError::NotFound { .. }) => Err(AccessError::not_found("grant", grant_id)),
            Err(e) => Err(AccessError::storage("grant purge")(e)),
        }
    }

    async fn require_role(&self, id: UserId, expected: Role) -> Result<()> {
        let user = self
            .users
            .find_by_id(id)
            .await
            .map_err(AccessError::storage("user lookup"))?
            .ok_or_else(|| AccessError::not_found("user", id))?;
        if user.role != expected {
            return Err(AccessError::invalid_role(id, expected));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use veracity_core::{AccessLevel, RecordCategory, User};
    use veracity_db_memory::{MemoryGrantStore, MemoryUserStore};

    struct Fixture {
        lifecycle: GrantLifecycle,
        grants: Arc<MemoryGrantStore>,
        patient: UserId,
        provider: UserId,
        admin: UserId,
    }

    async fn fixture() -> Fixture {
        let grants = Arc::new(MemoryGrantStore::new());
        let users = Arc::new(MemoryUserStore::new());

        let patient = users
            .insert(User::new("auth0|alice", "0xa11ce", Role::Patient))
            .await
            .unwrap()
            .id;
        let provider = users
            .insert(User::new("auth0|clinic", "0xc11n1c", Role::MedicalCenter))
            .await
            .unwrap()
            .id;
        let admin = users
            .insert(User::new("auth0|root", "0xadmin", Role::Admin))
            .await
            .unwrap()
            .id;

        Fixture {
            lifecycle: GrantLifecycle::new(grants.clone(), users),
            grants,
            patient,
            provider,
            admin,
        }
    }

    fn request(patient: UserId, provider: UserId, ttl: i64) -> GrantRequest {
        GrantRequest {
            patient_id: patient,
            provider_id: provider,
            access_level: AccessLevel::ReadOnly,
            record_types: vec![RecordCategory::Lab],
            ttl_seconds: ttl,
            blockchain_tx: None,
            granted_by: None,
            reason: None,
        }
    }

    fn t0() -> Timestamp {
        Timestamp::new(datetime!(2024-03-01 00:00:00 UTC))
    }

    fn t0_plus(seconds: i64) -> Timestamp {
        t0().saturating_add(Duration::seconds(seconds))
    }

    #[tokio::test]
    async fn test_grant_access_happy_path() {
        let fx = fixture().await;
        let grant = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();

        assert_eq!(grant.status, GrantStatus::Active);
        assert_eq!(grant.granted_at, t0());
        assert_eq!(grant.expires_at, t0_plus(3600));
        assert!(grant.expires_at > grant.granted_at);
    }

    #[tokio::test]
    async fn test_grant_access_rejects_zero_and_negative_ttl() {
        let fx = fixture().await;

        let err = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 0), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation(_)));

        let err = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, -5), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation(_)));

        // a failed validation never reaches the store
        assert_eq!(fx.grants.count(), 0);
    }

    #[tokio::test]
    async fn test_grant_access_rejects_oversized_ttl() {
        let fx = fixture().await;
        let err = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, MAX_TTL_SECONDS + 1), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation(_)));
    }

    #[tokio::test]
    async fn test_grant_access_requires_provider_role() {
        let fx = fixture().await;

        // an admin is not a medical center
        let err = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.admin, 3600), t0())
            .await
            .unwrap_err();
        assert!(
            matches!(err, AccessError::InvalidRole { expected: Role::MedicalCenter, .. })
        );

        let err = fx
            .lifecycle
            .grant_access_at(request(fx.provider, fx.provider, 3600), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation(_)));

        let unknown = UserId::generate();
        let err = fx
            .lifecycle
            .grant_access_at(request(fx.patient, unknown, 3600), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound { entity: "user", .. }));
    }

    #[tokio::test]
    async fn test_grant_access_requires_patient_role() {
        let fx = fixture().await;
        let err = fx
            .lifecycle
            .grant_access_at(request(fx.admin, fx.provider, 3600), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidRole { expected: Role::Patient, .. }));
    }

    #[tokio::test]
    async fn test_duplicate_active_grant_rejected() {
        let fx = fixture().await;
        fx.lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();

        let err = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 7200), t0_plus(10))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::DuplicateGrant { .. }));
    }

    #[tokio::test]
    async fn test_regrant_after_revocation() {
        let fx = fixture().await;
        let first = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();
        fx.lifecycle
            .revoke_at(first.id, fx.patient, t0_plus(60))
            .await
            .unwrap();

        let second = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0_plus(120))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, GrantStatus::Active);
    }

    #[tokio::test]
    async fn test_regrant_after_deadline_without_sweep() {
        let fx = fixture().await;
        let first = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();

        // the sweep never ran, but the deadline has passed: the new grant
        // must go through and the old one gets finalized as Expired
        let second = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0_plus(3600))
            .await
            .unwrap();
        assert_eq!(second.status, GrantStatus::Active);

        let old = fx.grants.find_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(old.status, GrantStatus::Expired);
    }

    #[tokio::test]
    async fn test_revoke_stamps_actor_and_time() {
        let fx = fixture().await;
        let grant = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();

        let revoked = fx
            .lifecycle
            .revoke_at(grant.id, fx.patient, t0_plus(60))
            .await
            .unwrap();
        assert_eq!(revoked.status, GrantStatus::Revoked);
        assert_eq!(revoked.revoked_at, Some(t0_plus(60)));
        assert_eq!(
            revoked.metadata.notes.as_deref(),
            Some(format!("revoked by {}", fx.patient).as_str())
        );
    }

    #[tokio::test]
    async fn test_revoke_twice_second_is_already_terminal() {
        let fx = fixture().await;
        let grant = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();

        let first = fx
            .lifecycle
            .revoke_at(grant.id, fx.patient, t0_plus(60))
            .await
            .unwrap();
        let err = fx
            .lifecycle
            .revoke_at(grant.id, fx.patient, t0_plus(120))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccessError::AlreadyTerminal { status: GrantStatus::Revoked, .. }
        ));

        // the second call changed nothing
        let stored = fx.grants.find_by_id(grant.id).await.unwrap().unwrap();
        assert_eq!(stored.revoked_at, first.revoked_at);
    }

    #[tokio::test]
    async fn test_revoke_unknown_grant() {
        let fx = fixture().await;
        let err = fx
            .lifecycle
            .revoke_at(GrantId::generate(), fx.patient, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotFound { entity: "grant", .. }));
    }

    #[tokio::test]
    async fn test_sweep_transitions_due_grants_and_is_idempotent() {
        let fx = fixture().await;
        let grant = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();

        // nothing due before the deadline
        assert_eq!(fx.lifecycle.sweep_expired(t0_plus(3599)).await.unwrap(), 0);

        // due exactly at the deadline
        assert_eq!(fx.lifecycle.sweep_expired(t0_plus(3600)).await.unwrap(), 1);
        let stored = fx.grants.find_by_id(grant.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GrantStatus::Expired);

        // running again over the same instant changes nothing
        assert_eq!(fx.lifecycle.sweep_expired(t0_plus(3600)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_never_touches_revoked() {
        let fx = fixture().await;
        let grant = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();
        fx.lifecycle
            .revoke_at(grant.id, fx.patient, t0_plus(10))
            .await
            .unwrap();

        assert_eq!(fx.lifecycle.sweep_expired(t0_plus(7200)).await.unwrap(), 0);
        let stored = fx.grants.find_by_id(grant.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GrantStatus::Revoked);
    }

    #[tokio::test]
    async fn test_purge_removes_grant() {
        let fx = fixture().await;
        let grant = fx
            .lifecycle
            .grant_access_at(request(fx.patient, fx.provider, 3600), t0())
            .await
            .unwrap();

        fx.lifecycle.purge(grant.id).await.unwrap();
        assert!(fx.grants.find_by_id(grant.id).await.unwrap().is_none());

        let err = fx.lifecycle.purge(grant.id).await.unwrap_err();
        assert!(matches!(err, AccessError::NotFound { .. }));
    }
}
