//! Replay journaled pulls and check they reproduce.

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use super::{ActionEntry, ActionPayload};
use crate::catalog::Catalog;
use crate::gacha::pity::PityRules;
use crate::gacha::{self, DrawPool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct AuditMismatch {
    pub seq: u64,
    pub player: u64,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct AuditReport {
    pub pulls_checked: usize,
    pub mismatches: Vec<AuditMismatch>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Re-run every pull entry with its sub-seed and starting pity against `catalog`.
///
/// Pulls made before a catalog edit are expected to diverge if the edit
/// touched the draw pool.
pub fn audit_pulls(entries: &[ActionEntry], catalog: &Catalog, rules: &PityRules) -> AuditReport {
    let mut report = AuditReport::default();
    let pool = DrawPool::from_catalog(catalog);
    for entry in entries {
        let ActionPayload::Pull {
            player,
            plan,
            subseed,
            pity_before,
            pity_after,
            outcomes,
            ..
        } = &entry.payload
        else {
            continue;
        };
        report.pulls_checked += 1;
        let mut mismatch = |detail: String| {
            report.mismatches.push(AuditMismatch {
                seq: entry.seq,
                player: *player,
                detail,
            })
        };
        let pool = match &pool {
            Ok(pool) => pool,
            Err(e) => {
                mismatch(format!("catalog cannot be drawn from: {e}"));
                continue;
            }
        };
        let mut rng = gacha::rng_from_seed(*subseed);
        let mut pity = *pity_before;
        let mut replayed = Vec::with_capacity(plan.count as usize);
        for _ in 0..plan.count {
            let (outcome, next) = gacha::draw(pool, rules, pity, &mut rng);
            pity = next;
            replayed.push(outcome);
        }
        let drawn: Vec<_> = outcomes.iter().map(|o| (o.creature_id, o.pity)).collect();
        let expected: Vec<_> = replayed.iter().map(|o| (o.creature_id, o.pity)).collect();
        if drawn != expected {
            mismatch(format!("journaled {drawn:?}, replay drew {expected:?}"));
        } else if pity != *pity_after {
            mismatch(format!(
                "journaled pity {pity_after:?}, replay ended at {pity:?}"
            ));
        }
    }
    report
}
