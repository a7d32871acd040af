use std::time::Duration;

use veracity_core::now_utc;

use crate::lifecycle::GrantLifecycle;

/// Periodic driver for [`GrantLifecycle::sweep_expired`].
///
/// Expiry is time-triggered, not access-triggered: a grant must end up
/// Expired even if nobody queries it, so the sweep runs on a fixed interval.
/// Readers are already covered in the gap by `effective_status`.
#[derive(Clone)]
pub struct ExpirySweeper {
    lifecycle: GrantLifecycle,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(lifecycle: GrantLifecycle, interval: Duration) -> Self {
        Self {
            lifecycle,
            interval,
        }
    }

    /// Start the background sweep task. Sweep failures are logged and the
    /// loop keeps running; the next tick retries naturally since the sweep is
    /// idempotent. Abort the returned handle on shutdown.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // the first tick fires immediately; that clears any backlog left
            // over from downtime before settling into the cadence
            loop {
                interval.tick().await;

                match self.lifecycle.sweep_expired(now_utc()).await {
                    Ok(transitioned) if transitioned > 0 => {
                        tracing::debug!(transitioned, "Expiry sweep tick");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Expiry sweep failed");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::macros::datetime;
    use veracity_core::{
        AccessLevel, GrantRequest, GrantStatus, Role, Timestamp, User,
    };
    use veracity_db_memory::{MemoryGrantStore, MemoryUserStore};
    use veracity_storage::{GrantStore, UserStore};

    async fn seeded() -> (GrantLifecycle, Arc<MemoryGrantStore>, veracity_core::GrantId) {
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

        let lifecycle = GrantLifecycle::new(grants.clone(), users);
        let t0 = Timestamp::new(datetime!(2020-01-01 00:00:00 UTC));
        let grant = lifecycle
            .grant_access_at(
                GrantRequest {
                    patient_id: patient,
                    provider_id: provider,
                    access_level: AccessLevel::ReadOnly,
                    record_types: Vec::new(),
                    ttl_seconds: 1,
                    blockchain_tx: None,
                    granted_by: None,
                    reason: None,
                },
                t0,
            )
            .await
            .unwrap();
        (lifecycle, grants, grant.id)
    }

    #[tokio::test]
    async fn test_sweeper_expires_overdue_grant() {
        let (lifecycle, grants, grant_id) = seeded().await;
        // granted in 2020 with a 1s ttl: overdue the moment the sweeper looks
        let handle = ExpirySweeper::new(lifecycle, Duration::from_millis(10)).start();

        // wait for the first tick to land
        let mut expired = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let stored = grants.find_by_id(grant_id).await.unwrap().unwrap();
            if stored.status == GrantStatus::Expired {
                expired = true;
                break;
            }
        }
        handle.abort();
        assert!(expired, "sweeper never expired the overdue grant");
    }

    #[tokio::test]
    async fn test_sweeper_handle_aborts_cleanly() {
        let (lifecycle, _grants, _id) = seeded().await;
        let handle = ExpirySweeper::new(lifecycle, Duration::from_secs(3600)).start();
        handle.abort();
        let joined = handle.await;
        assert!(joined.unwrap_err().is_cancelled());
    }
}
