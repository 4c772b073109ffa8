//! Persistence seam for player state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{lock_unpoisoned, MissionCompletion, OwnedCreature, UserAccount, UserCommit, UserId};
use crate::error::StorageError;

/// Storage for accounts and the two append logs.
///
/// `commit` must apply a [`UserCommit`] completely or not at all.
pub trait LedgerStore: Send + Sync {
    fn create_account(&self, account: UserAccount) -> Result<(), StorageError>;

    fn load_account(&self, user: UserId) -> Result<Option<UserAccount>, StorageError>;

    /// Allocate the inventory id for a new owned-creature record.
    fn next_inventory_id(&self) -> Result<u64, StorageError>;

    fn owned_creatures(&self, user: UserId) -> Result<Vec<OwnedCreature>, StorageError>;

    fn mission_completions(&self, user: UserId) -> Result<Vec<MissionCompletion>, StorageError>;

    fn commit(&self, commit: UserCommit) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<UserId, UserAccount>,
    owned: Vec<OwnedCreature>,
    completions: Vec<MissionCompletion>,
}

/// Process-local store backing the default server.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    inventory_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn create_account(&self, account: UserAccount) -> Result<(), StorageError> {
        let mut tables = lock_unpoisoned(&self.tables);
        if tables.accounts.contains_key(&account.id) {
            return Err(StorageError::DuplicateAccount(account.id));
        }
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    fn load_account(&self, user: UserId) -> Result<Option<UserAccount>, StorageError> {
        Ok(lock_unpoisoned(&self.tables).accounts.get(&user).cloned())
    }

    fn next_inventory_id(&self) -> Result<u64, StorageError> {
        Ok(self.inventory_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn owned_creatures(&self, user: UserId) -> Result<Vec<OwnedCreature>, StorageError> {
        Ok(lock_unpoisoned(&self.tables)
            .owned
            .iter()
            .filter(|o| o.owner == user)
            .cloned()
            .collect())
    }

    fn mission_completions(&self, user: UserId) -> Result<Vec<MissionCompletion>, StorageError> {
        Ok(lock_unpoisoned(&self.tables)
            .completions
            .iter()
            .filter(|c| c.user == user)
            .cloned()
            .collect())
    }

    fn commit(&self, commit: UserCommit) -> Result<(), StorageError> {
        let mut tables = lock_unpoisoned(&self.tables);
        let user = commit.account.id;
        if !tables.accounts.contains_key(&user) {
            return Err(StorageError::UnknownAccount(user));
        }
        // (user, mission) is unique: validate before touching anything
        let mut seen: HashSet<_> = tables
            .completions
            .iter()
            .filter(|c| c.user == user)
            .map(|c| c.mission_id)
            .collect();
        for completion in &commit.completions {
            if completion.user != user || !seen.insert(completion.mission_id) {
                return Err(StorageError::DuplicateCompletion {
                    user: completion.user,
                    mission: completion.mission_id,
                });
            }
        }
        tables.accounts.insert(user, commit.account);
        tables.owned.extend(commit.owned);
        tables.completions.extend(commit.completions);
        Ok(())
    }
}
