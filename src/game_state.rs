//! Server-wide state and the player operations built on top of the core.
//!
//! Lock order is always catalog first, then the player's ledger lock. The
//! shared RNG is only held long enough to hand out a sub-seed.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::{RngCore, SeedableRng};
use rand_pcg::Lcg64Xsh32;
use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::catalog::{
    Catalog, CatalogSnapshot, Creature, CreatureDraft, CreatureId, Mission, MissionDraft,
    MissionId, Rarity,
};
use crate::config::GameConfig;
use crate::error::GachaError;
use crate::gacha::{self, DrawOutcome, DrawPool, DrawRate, PullPlan, PullType};
use crate::journal::audit::{self, AuditReport};
use crate::journal::persistence::FileWriter;
use crate::journal::{ActionLog, ActionPayload};
use crate::ledger::{lock_unpoisoned, Ledger, LedgerStore, MemoryStore, UserAccount, UserId};
use crate::missions;

pub type SharedGameState = Arc<GameState>;

/// What a committed pull produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PullReport {
    pub pull_type: Option<PullType>,
    pub outcomes: Vec<DrawOutcome>,
    pub account: UserAccount,
}

/// What a committed click produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct ClickReport {
    pub total_clicks: u64,
    pub coins: u64,
    /// Periodic bonus plus mission rewards for this click.
    pub coins_earned: u64,
    pub click_bonus: u64,
    pub mission_reward: u64,
    pub missions_newly_completed: Vec<MissionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct RarityCount {
    pub rarity: Rarity,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Profile {
    #[serde(flatten)]
    pub account: UserAccount,
    pub completed_missions: Vec<MissionId>,
    pub collection: Vec<RarityCount>,
}

/// An owned creature joined with its catalog entry. Catalog fields are empty
/// when the creature has since been deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct InventoryEntry {
    pub inventory_id: u64,
    pub creature_id: CreatureId,
    pub name: Option<String>,
    pub rarity: Option<Rarity>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub obtained_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Inventory {
    pub entries: Vec<InventoryEntry>,
    pub total: usize,
    /// Counts over the whole inventory, regardless of the filter.
    pub counts: Vec<RarityCount>,
}

fn read_unpoisoned<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(g) => g,
        Err(e) => e.into_inner(),
    }
}

fn write_unpoisoned<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(g) => g,
        Err(e) => e.into_inner(),
    }
}

fn rarity_counts<I: IntoIterator<Item = Rarity>>(rarities: I) -> Vec<RarityCount> {
    let mut counts: Vec<RarityCount> = Rarity::all()
        .into_iter()
        .map(|rarity| RarityCount { rarity, count: 0 })
        .collect();
    for rarity in rarities {
        if let Some(slot) = counts.iter_mut().find(|c| c.rarity == rarity) {
            slot.count += 1;
        }
    }
    counts
}

pub struct GameState {
    config: GameConfig,
    catalog: RwLock<Catalog>,
    ledger: Ledger,
    action_log: ActionLog,
    rng: Mutex<Lcg64Xsh32>,
}

impl GameState {
    /// Fresh server state with the stock catalog and an in-memory ledger.
    pub fn new(config: GameConfig) -> Self {
        Self::with_parts(config, Catalog::with_defaults(), Arc::new(MemoryStore::new()))
    }

    pub fn with_parts(config: GameConfig, catalog: Catalog, store: Arc<dyn LedgerStore>) -> Self {
        let rng = match config.seed {
            Some(seed) => gacha::rng_from_seed(seed),
            None => Lcg64Xsh32::from_entropy(),
        };
        let mut action_log = ActionLog::new();
        if let Some(path) = &config.journal_path {
            match FileWriter::new(PathBuf::from(path)) {
                Ok(writer) => {
                    log::info!("journaling actions to {}", path);
                    action_log.set_writer(Some(writer));
                }
                Err(e) => log::error!("cannot open journal file {}: {}", path, e),
            }
        }
        GameState {
            config,
            catalog: RwLock::new(catalog),
            ledger: Ledger::new(store),
            action_log,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.action_log
    }

    /// Read access to the catalog.
    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        read_unpoisoned(&self.catalog)
    }

    pub fn register_player(
        &self,
        user: UserId,
        coins: Option<u64>,
    ) -> Result<UserAccount, GachaError> {
        let coins = coins.unwrap_or(self.config.starting_coins);
        let account = self.ledger.open_account(user, coins)?;
        self.action_log.append(
            "RegisterPlayer",
            ActionPayload::RegisterPlayer {
                player: user,
                coins,
            },
        );
        log::info!("registered player {} with {} coins", user, coins);
        Ok(account)
    }

    /// Reseed the shared generator. Later pulls become reproducible from here.
    pub fn set_seed(&self, seed: u64) {
        *lock_unpoisoned(&self.rng) = gacha::rng_from_seed(seed);
        self.action_log
            .append("SetSeed", ActionPayload::SetSeed { seed });
    }

    fn derive_subseed(&self) -> u64 {
        lock_unpoisoned(&self.rng).next_u64()
    }

    pub fn plan_for(&self, pull_type: PullType) -> PullPlan {
        match pull_type {
            PullType::Single => self.config.single_plan(),
            PullType::Multi => self.config.multi_plan(),
        }
    }

    /// Spend coins on a single or multi pull.
    pub fn perform_draw(
        &self,
        user: UserId,
        pull_type: PullType,
    ) -> Result<PullReport, GachaError> {
        let mut report = self.perform_pull(user, self.plan_for(pull_type))?;
        report.pull_type = Some(pull_type);
        Ok(report)
    }

    /// Run a batch of `plan.count` draws for `plan.cost` coins as one transaction.
    pub fn perform_pull(&self, user: UserId, plan: PullPlan) -> Result<PullReport, GachaError> {
        let catalog = self.catalog();
        let pool = DrawPool::from_catalog(&catalog)?;
        let subseed = self.derive_subseed();
        let rules = self.config.pity;
        self.ledger.transact_with(
            user,
            |tx| {
                let pity_before = tx.account().pity;
                let mut rng = gacha::rng_from_seed(subseed);
                let batch = gacha::run_batch(
                    &pool,
                    &rules,
                    &plan,
                    tx.account().coins,
                    pity_before,
                    &mut rng,
                )?;
                for outcome in &batch.outcomes {
                    tx.add_owned(outcome.creature_id)?;
                }
                let account = tx.account_mut();
                account.coins = batch.balance;
                account.pity = batch.pity;
                account.pulls = account.pulls.saturating_add(u64::from(plan.count));
                Ok((pity_before, account.clone(), batch.outcomes))
            },
            |(pity_before, account, outcomes)| {
                self.action_log.append(
                    "Pull",
                    ActionPayload::Pull {
                        player: user,
                        plan,
                        subseed,
                        pity_before: *pity_before,
                        pity_after: account.pity,
                        coins_after: account.coins,
                        outcomes: outcomes.clone(),
                    },
                );
            },
        )
        .map(|(_, account, outcomes)| {
            log::debug!(
                "player {} pulled {} for {} coins",
                user,
                outcomes.len(),
                plan.cost
            );
            PullReport {
                pull_type: None,
                outcomes,
                account,
            }
        })
    }

    /// Count one click, pay the periodic bonus and any newly reached missions.
    pub fn register_click(&self, user: UserId) -> Result<ClickReport, GachaError> {
        let catalog = self.catalog();
        self.ledger.transact_with(
            user,
            |tx| {
                let total_clicks = tx.account().clicks.saturating_add(1);
                tx.account_mut().clicks = total_clicks;
                let click_bonus = self.config.click_bonus(total_clicks);

                let completed = tx.completed_missions()?;
                let evaluation =
                    missions::evaluate(total_clicks, catalog.active_missions(), &completed);
                for mission_id in &evaluation.newly_completed {
                    tx.complete_mission(*mission_id);
                }

                let coins_earned = click_bonus.saturating_add(evaluation.total_reward);
                let account = tx.account_mut();
                account.coins = account.coins.saturating_add(coins_earned);
                Ok(ClickReport {
                    total_clicks,
                    coins: account.coins,
                    coins_earned,
                    click_bonus,
                    mission_reward: evaluation.total_reward,
                    missions_newly_completed: evaluation.newly_completed,
                })
            },
            |report| {
                self.action_log.append(
                    "Click",
                    ActionPayload::Click {
                        player: user,
                        total_clicks: report.total_clicks,
                        coins_earned: report.coins_earned,
                        missions: report.missions_newly_completed.clone(),
                    },
                );
            },
        )
    }

    /// Add reported play time to the player's total.
    pub fn record_time(&self, user: UserId, seconds: u64) -> Result<UserAccount, GachaError> {
        self.ledger.transact_with(
            user,
            |tx| {
                let account = tx.account_mut();
                account.time_spent = account.time_spent.saturating_add(seconds);
                Ok(account.clone())
            },
            |account| {
                self.action_log.append(
                    "TimeSpent",
                    ActionPayload::TimeSpent {
                        player: user,
                        seconds,
                        total: account.time_spent,
                    },
                );
            },
        )
    }

    pub fn profile(&self, user: UserId) -> Result<Profile, GachaError> {
        let account = self.ledger.account(user)?;
        let store = self.ledger.store();
        let mut completed_missions: Vec<MissionId> = store
            .mission_completions(user)?
            .into_iter()
            .map(|c| c.mission_id)
            .collect();
        completed_missions.sort_unstable();
        let owned = store.owned_creatures(user)?;
        let catalog = self.catalog();
        let collection = rarity_counts(
            owned
                .iter()
                .filter_map(|o| catalog.creature(o.creature_id).map(|c| c.rarity)),
        );
        Ok(Profile {
            account,
            completed_missions,
            collection,
        })
    }

    /// The player's owned creatures, newest first, optionally limited to one rarity.
    pub fn inventory(&self, user: UserId, rarity: Option<Rarity>) -> Result<Inventory, GachaError> {
        self.ledger.account(user)?;
        let owned = self.ledger.store().owned_creatures(user)?;
        let catalog = self.catalog();
        let mut all: Vec<InventoryEntry> = owned
            .into_iter()
            .map(|o| {
                let creature = catalog.creature(o.creature_id);
                InventoryEntry {
                    inventory_id: o.inventory_id,
                    creature_id: o.creature_id,
                    name: creature.map(|c| c.name.clone()),
                    rarity: creature.map(|c| c.rarity),
                    description: creature.and_then(|c| c.description.clone()),
                    image: creature.and_then(|c| c.image.clone()),
                    obtained_at: o.obtained_at,
                }
            })
            .collect();
        all.sort_by(|a, b| b.inventory_id.cmp(&a.inventory_id));
        let counts = rarity_counts(all.iter().filter_map(|e| e.rarity));
        let entries: Vec<InventoryEntry> = match rarity {
            Some(wanted) => all.into_iter().filter(|e| e.rarity == Some(wanted)).collect(),
            None => all,
        };
        Ok(Inventory {
            total: entries.len(),
            entries,
            counts,
        })
    }

    /// Normalized chances of the current draw pool.
    pub fn rates(&self) -> Result<Vec<DrawRate>, GachaError> {
        let catalog = self.catalog();
        Ok(DrawPool::from_catalog(&catalog)?.rates())
    }

    fn edit_catalog<T, F>(&self, actor: &str, f: F) -> Result<T, GachaError>
    where
        F: FnOnce(&mut Catalog) -> Result<(T, String), GachaError>,
    {
        let (value, change) = {
            let mut catalog = write_unpoisoned(&self.catalog);
            f(&mut *catalog)?
        };
        log::info!("catalog change by {}: {}", actor, change);
        self.action_log.append_with_actor(
            "CatalogChange",
            ActionPayload::CatalogChange { change },
            Some(actor.to_string()),
        );
        Ok(value)
    }

    pub fn add_creature(&self, draft: CreatureDraft) -> Result<Creature, GachaError> {
        self.edit_catalog("admin", |catalog| {
            let id = catalog.add_creature(draft)?;
            let creature = catalog
                .creature(id)
                .cloned()
                .ok_or(GachaError::UnknownCreature(id))?;
            let change = format!("added creature {} '{}'", id, creature.name);
            Ok((creature, change))
        })
    }

    pub fn update_creature(
        &self,
        id: CreatureId,
        draft: CreatureDraft,
    ) -> Result<Creature, GachaError> {
        self.edit_catalog("admin", |catalog| {
            let creature = catalog.update_creature(id, draft)?.clone();
            Ok((creature, format!("updated creature {}", id)))
        })
    }

    pub fn remove_creature(&self, id: CreatureId) -> Result<Creature, GachaError> {
        self.edit_catalog("admin", |catalog| {
            let creature = catalog.remove_creature(id)?;
            Ok((creature, format!("removed creature {}", id)))
        })
    }

    pub fn add_mission(&self, draft: MissionDraft) -> Result<Mission, GachaError> {
        self.edit_catalog("admin", |catalog| {
            let id = catalog.add_mission(draft)?;
            let mission = catalog
                .mission(id)
                .cloned()
                .ok_or(GachaError::UnknownMission(id))?;
            let change = format!("added mission {} '{}'", id, mission.name);
            Ok((mission, change))
        })
    }

    pub fn update_mission(
        &self,
        id: MissionId,
        draft: MissionDraft,
    ) -> Result<Mission, GachaError> {
        self.edit_catalog("admin", |catalog| {
            let mission = catalog.update_mission(id, draft)?.clone();
            Ok((mission, format!("updated mission {}", id)))
        })
    }

    pub fn remove_mission(&self, id: MissionId) -> Result<Mission, GachaError> {
        self.edit_catalog("admin", |catalog| {
            let mission = catalog.remove_mission(id)?;
            Ok((mission, format!("removed mission {}", id)))
        })
    }

    pub fn export_catalog(&self) -> CatalogSnapshot {
        self.catalog().export()
    }

    /// Append a snapshot's entries. Returns how many creatures and missions were added.
    pub fn import_catalog(&self, snapshot: CatalogSnapshot) -> Result<(usize, usize), GachaError> {
        self.edit_catalog("admin", |catalog| {
            let (creatures, missions) = catalog.import(snapshot)?;
            let change = format!("imported {} creatures and {} missions", creatures, missions);
            Ok(((creatures, missions), change))
        })
    }

    /// Replay every journaled pull against the current catalog.
    pub fn audit(&self) -> AuditReport {
        let entries = self.action_log.entries();
        let catalog = self.catalog();
        audit::audit_pulls(&entries, &catalog, &self.config.pity)
    }

    /// Flush the journal file, if one is configured.
    pub fn shutdown(&self) {
        self.action_log.shutdown();
    }
}
