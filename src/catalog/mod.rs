//! Catalog store: the drawable creatures and the click missions.
//!
//! Entries are keyed by ascending ids in `BTreeMap`s, which gives the draw
//! engine its fixed walk order for free. Only admin collaborators mutate the
//! catalog; the core only reads it.

mod defaults;
pub mod endpoints;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::error::GachaError;

pub type CreatureId = u32;
pub type MissionId = u32;

/// Rarity tiers, ordered by ascending scarcity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn all() -> [Rarity; 4] {
        [
            Rarity::Common,
            Rarity::Rare,
            Rarity::Epic,
            Rarity::Legendary,
        ]
    }

    pub fn is_epic_or_better(self) -> bool {
        matches!(self, Rarity::Epic | Rarity::Legendary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::all()
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown rarity '{s}'"))
    }
}

/// A drawable catalog entry. `weight` is a raw relative weight, normalized at draw time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub rarity: Rarity,
    pub weight: f64,
    pub active: bool,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Admin input for creating, editing or importing a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct CreatureDraft {
    pub name: String,
    pub rarity: Rarity,
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Mission {
    pub id: MissionId,
    pub name: String,
    pub description: String,
    /// Cumulative click count that completes the mission.
    pub target: u64,
    pub reward: u64,
    pub order: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct MissionDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub target: u64,
    pub reward: u64,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// JSON exchange format for catalog import/export. Ids are not carried over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub creatures: Vec<CreatureDraft>,
    #[serde(default)]
    pub missions: Vec<MissionDraft>,
}

impl CreatureDraft {
    fn validate(&self) -> Result<(), GachaError> {
        if self.name.trim().is_empty() {
            return Err(GachaError::InvalidCatalogEntry(
                "creature name must not be empty".to_string(),
            ));
        }
        // zero is tolerated so an operator can park a creature; the draw engine skips it
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(GachaError::InvalidCatalogEntry(format!(
                "creature '{}' has invalid weight {}",
                self.name, self.weight
            )));
        }
        Ok(())
    }

    fn into_creature(self, id: CreatureId) -> Creature {
        Creature {
            id,
            name: self.name,
            rarity: self.rarity,
            weight: self.weight,
            active: self.active,
            description: self.description,
            image: self.image,
        }
    }
}

impl MissionDraft {
    fn validate(&self) -> Result<(), GachaError> {
        if self.name.trim().is_empty() {
            return Err(GachaError::InvalidCatalogEntry(
                "mission name must not be empty".to_string(),
            ));
        }
        if self.target == 0 {
            return Err(GachaError::InvalidCatalogEntry(format!(
                "mission '{}' needs a target of at least one click",
                self.name
            )));
        }
        Ok(())
    }

    fn into_mission(self, id: MissionId) -> Mission {
        Mission {
            id,
            name: self.name,
            description: self.description,
            target: self.target,
            reward: self.reward,
            order: self.order,
            active: self.active,
        }
    }
}

/// The Catalog: every creature and mission known to the game.
#[derive(Debug, Clone)]
pub struct Catalog {
    creatures: BTreeMap<CreatureId, Creature>,
    missions: BTreeMap<MissionId, Mission>,
    next_creature_id: CreatureId,
    next_mission_id: MissionId,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            creatures: BTreeMap::new(),
            missions: BTreeMap::new(),
            next_creature_id: 1,
            next_mission_id: 1,
        }
    }

    /// The stock sea-life catalog installed on a fresh server.
    pub fn with_defaults() -> Self {
        let mut catalog = Catalog::new();
        for draft in defaults::creatures() {
            catalog.insert_creature(draft);
        }
        for draft in defaults::missions() {
            catalog.insert_mission(draft);
        }
        catalog
    }

    fn insert_creature(&mut self, draft: CreatureDraft) -> CreatureId {
        let id = self.next_creature_id;
        self.next_creature_id += 1;
        self.creatures.insert(id, draft.into_creature(id));
        id
    }

    fn insert_mission(&mut self, draft: MissionDraft) -> MissionId {
        let id = self.next_mission_id;
        self.next_mission_id += 1;
        self.missions.insert(id, draft.into_mission(id));
        id
    }

    /// Add a creature. Returns its new id.
    pub fn add_creature(&mut self, draft: CreatureDraft) -> Result<CreatureId, GachaError> {
        draft.validate()?;
        Ok(self.insert_creature(draft))
    }

    pub fn update_creature(
        &mut self,
        id: CreatureId,
        draft: CreatureDraft,
    ) -> Result<&Creature, GachaError> {
        draft.validate()?;
        let slot = self
            .creatures
            .get_mut(&id)
            .ok_or(GachaError::UnknownCreature(id))?;
        *slot = draft.into_creature(id);
        Ok(&*slot)
    }

    /// Delete a creature. Owned records keep referencing the id.
    pub fn remove_creature(&mut self, id: CreatureId) -> Result<Creature, GachaError> {
        self.creatures
            .remove(&id)
            .ok_or(GachaError::UnknownCreature(id))
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    /// All creatures in ascending id order.
    pub fn creatures(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values()
    }

    /// Active creatures in the fixed draw order.
    pub fn active_creatures(&self) -> Vec<&Creature> {
        self.creatures.values().filter(|c| c.active).collect()
    }

    pub fn add_mission(&mut self, draft: MissionDraft) -> Result<MissionId, GachaError> {
        draft.validate()?;
        Ok(self.insert_mission(draft))
    }

    pub fn update_mission(
        &mut self,
        id: MissionId,
        draft: MissionDraft,
    ) -> Result<&Mission, GachaError> {
        draft.validate()?;
        let slot = self
            .missions
            .get_mut(&id)
            .ok_or(GachaError::UnknownMission(id))?;
        *slot = draft.into_mission(id);
        Ok(&*slot)
    }

    pub fn remove_mission(&mut self, id: MissionId) -> Result<Mission, GachaError> {
        self.missions
            .remove(&id)
            .ok_or(GachaError::UnknownMission(id))
    }

    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(&id)
    }

    /// Missions in display order (lower `order` first, then id).
    pub fn missions(&self) -> Vec<&Mission> {
        let mut missions: Vec<&Mission> = self.missions.values().collect();
        missions.sort_by_key(|m| (m.order, m.id));
        missions
    }

    pub fn active_missions(&self) -> Vec<&Mission> {
        self.missions().into_iter().filter(|m| m.active).collect()
    }

    pub fn export(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            creatures: self
                .creatures
                .values()
                .map(|c| CreatureDraft {
                    name: c.name.clone(),
                    rarity: c.rarity,
                    weight: c.weight,
                    active: c.active,
                    description: c.description.clone(),
                    image: c.image.clone(),
                })
                .collect(),
            missions: self
                .missions()
                .into_iter()
                .map(|m| MissionDraft {
                    name: m.name.clone(),
                    description: m.description.clone(),
                    target: m.target,
                    reward: m.reward,
                    order: m.order,
                    active: m.active,
                })
                .collect(),
        }
    }

    /// Append every entry of `snapshot` with fresh ids.
    /// Nothing is added unless all entries validate.
    pub fn import(&mut self, snapshot: CatalogSnapshot) -> Result<(usize, usize), GachaError> {
        for draft in &snapshot.creatures {
            draft.validate()?;
        }
        for draft in &snapshot.missions {
            draft.validate()?;
        }
        let counts = (snapshot.creatures.len(), snapshot.missions.len());
        for draft in snapshot.creatures {
            self.insert_creature(draft);
        }
        for draft in snapshot.missions {
            self.insert_mission(draft);
        }
        Ok(counts)
    }
}
