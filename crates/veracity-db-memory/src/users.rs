use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use veracity_core::{User, UserId};
use veracity_storage::{StorageError, UserStore};

/// In-memory user directory. Wallet addresses and identity subjects are each
/// globally unique, enforced via secondary index maps.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<UserId, User>,
    wallets: DashMap<String, UserId>,
    subjects: DashMap<String, UserId>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    fn claim(
        index: &DashMap<String, UserId>,
        key: &str,
        id: UserId,
        entity_key: &str,
    ) -> Result<(), StorageError> {
        match index.entry(key.to_string()) {
            Entry::Occupied(_) => Err(StorageError::already_exists(
                "user",
                format!("{entity_key} {key}"),
            )),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StorageError> {
        Self::claim(&self.wallets, &user.wallet_address, user.id, "wallet")?;
        if let Err(e) = Self::claim(&self.subjects, &user.subject, user.id, "subject") {
            // roll the wallet claim back so a half-inserted user leaves no trace
            self.wallets.remove(&user.wallet_address);
            return Err(e);
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_by_wallet(&self, wallet_address: &str) -> Result<Option<User>, StorageError> {
        let id = match self.wallets.get(wallet_address) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn list(&self) -> Result<Vec<User>, StorageError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update(&self, user: User) -> Result<User, StorageError> {
        let mut entry = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| StorageError::not_found("user", user.id))?;
        *entry = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<(), StorageError> {
        let (_, removed) = self
            .users
            .remove(&id)
            .ok_or_else(|| StorageError::not_found("user", id))?;
        self.wallets.remove(&removed.wallet_address);
        self.subjects.remove(&removed.subject);
        Ok(())
    }
}
