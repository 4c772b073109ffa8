//! Game tunables, read from the `gacha` table of Rocket's configuration.
//!
//! ```toml
//! [default.gacha]
//! single_cost = 5
//! multi_cost = 50
//!
//! [release.gacha]
//! admin_token = "a long random secret"
//! ```
//!
//! Admin routes refuse every request until `admin_token` is set.
//!
//! Every key can also be set through `ROCKET_GACHA`, e.g.
//! `ROCKET_GACHA='{seed=42}'`.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::gacha::pity::PityRules;
use crate::gacha::PullPlan;

/// Token shipped in the debug profile of `Rocket.toml`.
pub const SAMPLE_ADMIN_TOKEN: &str = "change-me";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", default)]
pub struct GameConfig {
    pub single_cost: u64,
    pub single_count: u32,
    pub multi_cost: u64,
    pub multi_count: u32,
    /// Every n-th click pays `click_bonus_amount`. Zero disables the bonus.
    pub click_bonus_every: u64,
    pub click_bonus_amount: u64,
    pub pity: PityRules,
    /// Fixed RNG seed. Entropy is used when unset.
    pub seed: Option<u64>,
    /// JSON-lines file the action journal is appended to.
    pub journal_path: Option<String>,
    /// Value expected in `X-Admin-Token`. Admin routes are closed when unset.
    pub admin_token: Option<String>,
    /// Coins granted to newly registered players.
    pub starting_coins: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            single_cost: 5,
            single_count: 1,
            multi_cost: 50,
            multi_count: 10,
            click_bonus_every: 5,
            click_bonus_amount: 1000,
            pity: PityRules::default(),
            seed: None,
            journal_path: None,
            admin_token: None,
            starting_coins: 0,
        }
    }
}

impl GameConfig {
    /// Read the `gacha` table from a figment, falling back to defaults when absent.
    pub fn from_figment(figment: &rocket::figment::Figment) -> Self {
        match figment.extract_inner::<GameConfig>("gacha") {
            Ok(config) => config,
            Err(e) => {
                if !e.missing() {
                    log::warn!("invalid [gacha] configuration, using defaults: {}", e);
                }
                GameConfig::default()
            }
        }
    }

    /// Whether `candidate` is the configured admin token. Comparison time does not depend
    /// on where the first mismatching byte is.
    pub fn admin_token_matches(&self, candidate: &str) -> bool {
        match self.admin_token.as_deref() {
            Some(expected) if !expected.is_empty() => {
                expected.len() == candidate.len()
                    && expected
                        .bytes()
                        .zip(candidate.bytes())
                        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
                        == 0
            }
            _ => false,
        }
    }

    /// A startup warning for an admin token that is missing or left at the sample value.
    pub fn admin_token_warning(&self) -> Option<&'static str> {
        match self.admin_token.as_deref() {
            None | Some("") => Some("no gacha.admin_token configured, admin routes are disabled"),
            Some(SAMPLE_ADMIN_TOKEN) => {
                Some("gacha.admin_token is the sample value, set a secret before going live")
            }
            Some(_) => None,
        }
    }

    pub fn single_plan(&self) -> PullPlan {
        PullPlan {
            cost: self.single_cost,
            count: self.single_count,
        }
    }

    pub fn multi_plan(&self) -> PullPlan {
        PullPlan {
            cost: self.multi_cost,
            count: self.multi_count,
        }
    }

    /// Bonus earned by the click that brings the total to `total_clicks`.
    pub fn click_bonus(&self, total_clicks: u64) -> u64 {
        if self.click_bonus_every > 0 && total_clicks % self.click_bonus_every == 0 {
            self.click_bonus_amount
        } else {
            0
        }
    }
}
