//! Pity ledger: the two per-user counters that force a minimum rarity.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::catalog::Rarity;

/// Counter values at which the next draw is forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", default)]
pub struct PityRules {
    /// `pity_counter` value that forces an epic (the 10th pull without one).
    pub epic_after: u32,
    /// `legendary_pity` value that forces a legendary (the 80th pull without one).
    pub legendary_after: u32,
}

impl Default for PityRules {
    fn default() -> Self {
        PityRules {
            epic_after: 9,
            legendary_after: 79,
        }
    }
}

/// A user's pity counters. Only the draw engine moves them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct PityState {
    /// Pulls since the last epic-or-better outcome.
    pub pity_counter: u32,
    /// Pulls since the last legendary outcome.
    pub legendary_pity: u32,
}

impl PityState {
    pub fn new(pity_counter: u32, legendary_pity: u32) -> Self {
        PityState {
            pity_counter,
            legendary_pity,
        }
    }

    /// Which rarity, if any, the next draw must yield. Legendary pity wins over epic pity.
    /// A tier with no active creature cannot be forced and stays pending.
    pub fn forced_rarity(
        &self,
        rules: &PityRules,
        has_legendary: bool,
        has_epic: bool,
    ) -> Option<Rarity> {
        if self.legendary_pity >= rules.legendary_after && has_legendary {
            return Some(Rarity::Legendary);
        }
        if self.pity_counter >= rules.epic_after && has_epic {
            return Some(Rarity::Epic);
        }
        None
    }

    /// Reset after a pity-forced outcome. Counters are not incremented for forced draws.
    pub fn record_forced(&mut self, rarity: Rarity) {
        self.pity_counter = 0;
        if rarity == Rarity::Legendary {
            self.legendary_pity = 0;
        }
    }

    /// Advance after a weighted draw, then reset on epic/legendary results.
    pub fn record_natural(&mut self, rarity: Rarity) {
        self.pity_counter = self.pity_counter.saturating_add(1);
        self.legendary_pity = self.legendary_pity.saturating_add(1);
        if rarity.is_epic_or_better() {
            self.pity_counter = 0;
        }
        if rarity == Rarity::Legendary {
            self.legendary_pity = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legendary_pity_takes_priority() {
        let state = PityState::new(9, 79);
        assert_eq!(
            state.forced_rarity(&PityRules::default(), true, true),
            Some(Rarity::Legendary)
        );
    }

    #[test]
    fn missing_tier_leaves_pity_pending() {
        let state = PityState::new(12, 79);
        assert_eq!(
            state.forced_rarity(&PityRules::default(), false, true),
            Some(Rarity::Epic)
        );
        assert_eq!(state.forced_rarity(&PityRules::default(), false, false), None);
    }

    #[test]
    fn below_thresholds_nothing_is_forced() {
        let state = PityState::new(8, 78);
        assert_eq!(state.forced_rarity(&PityRules::default(), true, true), None);
    }

    #[test]
    fn natural_draws_count_up_and_reset() {
        let mut state = PityState::new(3, 40);
        state.record_natural(Rarity::Rare);
        assert_eq!(state, PityState::new(4, 41));
        state.record_natural(Rarity::Epic);
        assert_eq!(state, PityState::new(0, 42));
        state.record_natural(Rarity::Legendary);
        assert_eq!(state, PityState::new(0, 0));
    }

    #[test]
    fn forced_epic_keeps_legendary_window() {
        let mut state = PityState::new(9, 30);
        state.record_forced(Rarity::Epic);
        assert_eq!(state, PityState::new(0, 30));
        let mut state = PityState::new(9, 79);
        state.record_forced(Rarity::Legendary);
        assert_eq!(state, PityState::default());
    }
}
