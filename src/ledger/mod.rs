//! User ledger: balances, counters and the append-only player records.
//!
//! Every mutation of a player's state goes through [`Ledger::transact`], which
//! serializes requests for that player and commits the staged changes in one
//! [`LedgerStore::commit`] call. Different players never wait on each other.

pub mod endpoints;
pub mod store;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::catalog::{CreatureId, MissionId};
use crate::error::GachaError;
use crate::gacha::pity::PityState;
pub use store::{LedgerStore, MemoryStore};

pub type UserId = u64;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(e) => e.into_inner(),
    }
}

/// A player's balances and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct UserAccount {
    pub id: UserId,
    pub coins: u64,
    pub clicks: u64,
    pub pulls: u64,
    /// Seconds of play reported by the client.
    pub time_spent: u64,
    #[serde(flatten)]
    pub pity: PityState,
}

impl UserAccount {
    pub fn new(id: UserId, coins: u64) -> Self {
        UserAccount {
            id,
            coins,
            clicks: 0,
            pulls: 0,
            time_spent: 0,
            pity: PityState::default(),
        }
    }
}

/// One creature obtained from a draw. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct OwnedCreature {
    pub inventory_id: u64,
    pub owner: UserId,
    pub creature_id: CreatureId,
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct MissionCompletion {
    pub user: UserId,
    pub mission_id: MissionId,
    pub completed_at: DateTime<Utc>,
}

/// Everything one transaction writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCommit {
    pub account: UserAccount,
    pub owned: Vec<OwnedCreature>,
    pub completions: Vec<MissionCompletion>,
}

/// Staged changes for one player. Dropping it without committing discards them.
pub struct Transaction<'a> {
    store: &'a dyn LedgerStore,
    account: UserAccount,
    owned: Vec<OwnedCreature>,
    completions: Vec<MissionCompletion>,
}

impl<'a> Transaction<'a> {
    pub fn account(&self) -> &UserAccount {
        &self.account
    }

    pub fn account_mut(&mut self) -> &mut UserAccount {
        &mut self.account
    }

    /// Stage an owned-creature record for this player.
    pub fn add_owned(&mut self, creature_id: CreatureId) -> Result<&OwnedCreature, GachaError> {
        let inventory_id = self.store.next_inventory_id()?;
        self.owned.push(OwnedCreature {
            inventory_id,
            owner: self.account.id,
            creature_id,
            obtained_at: Utc::now(),
        });
        Ok(&self.owned[self.owned.len() - 1])
    }

    /// Missions already completed, including ones staged in this transaction.
    pub fn completed_missions(&self) -> Result<BTreeSet<MissionId>, GachaError> {
        let mut done: BTreeSet<MissionId> = self
            .store
            .mission_completions(self.account.id)?
            .into_iter()
            .map(|c| c.mission_id)
            .collect();
        done.extend(self.completions.iter().map(|c| c.mission_id));
        Ok(done)
    }

    pub fn complete_mission(&mut self, mission_id: MissionId) {
        self.completions.push(MissionCompletion {
            user: self.account.id,
            mission_id,
            completed_at: Utc::now(),
        });
    }

    fn into_commit(self) -> UserCommit {
        UserCommit {
            account: self.account,
            owned: self.owned,
            completions: self.completions,
        }
    }
}

pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new(Arc::new(MemoryStore::new()))
    }
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Ledger {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn open_account(&self, user: UserId, coins: u64) -> Result<UserAccount, GachaError> {
        let account = UserAccount::new(user, coins);
        self.store.create_account(account.clone())?;
        Ok(account)
    }

    /// Current committed state of a player. Unknown players are unauthorized.
    pub fn account(&self, user: UserId) -> Result<UserAccount, GachaError> {
        self.store
            .load_account(user)?
            .ok_or(GachaError::Unauthorized)
    }

    fn user_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = lock_unpoisoned(&self.locks);
        Arc::clone(locks.entry(user).or_default())
    }

    /// Run `f` against a staged copy of the player's state and commit it if `f` succeeds.
    /// Concurrent calls for the same player run one after another.
    pub fn transact<T, F>(&self, user: UserId, f: F) -> Result<T, GachaError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, GachaError>,
    {
        self.transact_with(user, f, |_| {})
    }

    /// Like [`Ledger::transact`], then run `committed` while the player's lock is still held.
    pub fn transact_with<T, F, C>(&self, user: UserId, f: F, committed: C) -> Result<T, GachaError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, GachaError>,
        C: FnOnce(&T),
    {
        // unknown ids never get a lock entry; accounts are never removed
        self.account(user)?;
        let lock = self.user_lock(user);
        let _guard = lock_unpoisoned(&*lock);
        let account = self.account(user)?;
        let mut tx = Transaction {
            store: self.store.as_ref(),
            account,
            owned: Vec::new(),
            completions: Vec::new(),
        };
        let value = f(&mut tx)?;
        self.store.commit(tx.into_commit())?;
        committed(&value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn failed_closure_commits_nothing() {
        let ledger = Ledger::default();
        ledger.open_account(1, 100).unwrap();
        let result: Result<(), GachaError> = ledger.transact(1, |tx| {
            tx.account_mut().coins = 0;
            tx.add_owned(3)?;
            Err(GachaError::EmptyCatalog)
        });
        assert_eq!(result, Err(GachaError::EmptyCatalog));
        assert_eq!(ledger.account(1).unwrap().coins, 100);
        assert!(ledger.store().owned_creatures(1).unwrap().is_empty());
    }

    #[test]
    fn unknown_player_is_unauthorized() {
        let ledger = Ledger::default();
        let result = ledger.transact(9, |_| Ok(()));
        assert_eq!(result, Err(GachaError::Unauthorized));
    }

    #[test]
    fn unknown_players_leave_no_lock_behind() {
        let ledger = Ledger::default();
        for user in 1_000..11_000 {
            let result = ledger.transact(user, |_| Ok(()));
            assert_eq!(result, Err(GachaError::Unauthorized));
        }
        assert!(lock_unpoisoned(&ledger.locks).is_empty());

        ledger.open_account(1, 0).unwrap();
        ledger.transact(1, |_| Ok(())).unwrap();
        ledger.transact(1, |_| Ok(())).unwrap();
        assert_eq!(lock_unpoisoned(&ledger.locks).len(), 1);
    }

    #[test]
    fn same_player_updates_are_serialized() {
        let ledger = Arc::new(Ledger::default());
        ledger.open_account(1, 0).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..250 {
                        ledger
                            .transact(1, |tx| {
                                tx.account_mut().clicks += 1;
                                Ok(())
                            })
                            .expect("transact");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread panicked");
        }
        assert_eq!(ledger.account(1).unwrap().clicks, 2000);
    }

    #[test]
    fn staged_completions_count_as_completed() {
        let ledger = Ledger::default();
        ledger.open_account(1, 0).unwrap();
        ledger
            .transact(1, |tx| {
                tx.complete_mission(4);
                assert!(tx.completed_missions()?.contains(&4));
                Ok(())
            })
            .unwrap();
        assert_eq!(ledger.store().mission_completions(1).unwrap().len(), 1);
    }
}
