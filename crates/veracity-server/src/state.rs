use std::sync::Arc;

use veracity_access::{AccessQuery, GrantLifecycle, RecordLinkage};
use veracity_db_memory::{MemoryGrantStore, MemoryRecordStore, MemoryUserStore};
use veracity_storage::{GrantStore, RecordStore, UserStore};

/// Shared application state: explicitly constructed store handles and the
/// services wired over them. No ambient singletons; tests build their own.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub lifecycle: GrantLifecycle,
    pub query: AccessQuery,
    pub linkage: RecordLinkage,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        grants: Arc<dyn GrantStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            lifecycle: GrantLifecycle::new(grants.clone(), users.clone()),
            query: AccessQuery::new(grants, records.clone()),
            linkage: RecordLinkage::new(records, users.clone()),
            users,
        }
    }

    /// State backed by fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryGrantStore::new()),
            Arc::new(MemoryRecordStore::new()),
        )
    }
}
