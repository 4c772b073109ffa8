//! Draw engine: weighted creature selection with pity guarantees.
//!
//! The engine is pure. It takes the pity state and balance by value and hands
//! back the updated values, so a failed batch never leaves anything behind.
//! Persisting the result is the ledger's job.

pub mod endpoints;
pub mod pity;

use rand::{Rng, SeedableRng};
use rand_pcg::Lcg64Xsh32;
use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::catalog::{Catalog, Creature, CreatureId, Rarity};
use crate::error::GachaError;
use pity::{PityRules, PityState};

/// Source of randomness for draws. Any `rand::Rng` qualifies; tests can script one.
pub trait DrawSource {
    /// A uniform real in `[0, upper)`. `upper` is always positive and finite.
    fn uniform(&mut self, upper: f64) -> f64;
    /// A uniform index in `[0, len)`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: Rng> DrawSource for R {
    fn uniform(&mut self, upper: f64) -> f64 {
        self.gen_range(0.0..upper)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }
}

/// Build the PCG generator used for draws from a 64-bit seed.
pub fn rng_from_seed(seed: u64) -> Lcg64Xsh32 {
    let mut seed_bytes: [u8; 16] = [0u8; 16];
    // fill with two copies of the u64
    seed_bytes[0..8].copy_from_slice(&seed.to_le_bytes());
    seed_bytes[8..16].copy_from_slice(&seed.to_le_bytes());
    Lcg64Xsh32::from_seed(seed_bytes)
}

/// One drawn creature, in the order it was drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct DrawOutcome {
    pub creature_id: CreatureId,
    pub name: String,
    pub rarity: Rarity,
    /// True when the pity guarantee picked this creature.
    pub pity: bool,
}

impl DrawOutcome {
    fn new(creature: &Creature, pity: bool) -> Self {
        DrawOutcome {
            creature_id: creature.id,
            name: creature.name.clone(),
            rarity: creature.rarity,
            pity,
        }
    }
}

/// Normalized chance of a creature on a weighted (non-pity) draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct DrawRate {
    pub creature_id: CreatureId,
    pub name: String,
    pub rarity: Rarity,
    pub probability: f64,
}

/// The active catalog prepared for drawing.
#[derive(Debug, Clone)]
pub struct DrawPool<'c> {
    /// Active creatures with positive weight, ascending id.
    weighted: Vec<&'c Creature>,
    total_weight: f64,
    epics: Vec<&'c Creature>,
    legendaries: Vec<&'c Creature>,
}

impl<'c> DrawPool<'c> {
    /// Prepare a pool from creatures given in the fixed draw order. Inactive entries are skipped.
    pub fn new<I>(creatures: I) -> Result<Self, GachaError>
    where
        I: IntoIterator<Item = &'c Creature>,
    {
        let active: Vec<&'c Creature> = creatures.into_iter().filter(|c| c.active).collect();
        if active.is_empty() {
            return Err(GachaError::EmptyCatalog);
        }
        let weighted: Vec<&'c Creature> =
            active.iter().copied().filter(|c| c.weight > 0.0).collect();
        let total_weight: f64 = weighted.iter().map(|c| c.weight).sum();
        if weighted.is_empty() || total_weight <= 0.0 {
            return Err(GachaError::NonPositiveWeightTotal);
        }
        // each weight is finite, but enough large ones still sum to infinity
        if !total_weight.is_finite() {
            return Err(GachaError::WeightTotalOverflow);
        }
        let of_rarity = |rarity: Rarity| -> Vec<&'c Creature> {
            active
                .iter()
                .copied()
                .filter(|c| c.rarity == rarity)
                .collect()
        };
        Ok(DrawPool {
            epics: of_rarity(Rarity::Epic),
            legendaries: of_rarity(Rarity::Legendary),
            weighted,
            total_weight,
        })
    }

    pub fn from_catalog(catalog: &'c Catalog) -> Result<Self, GachaError> {
        Self::new(catalog.creatures())
    }

    pub fn rates(&self) -> Vec<DrawRate> {
        self.weighted
            .iter()
            .map(|c| DrawRate {
                creature_id: c.id,
                name: c.name.clone(),
                rarity: c.rarity,
                probability: c.weight / self.total_weight,
            })
            .collect()
    }

    fn forced_candidates(&self, rarity: Rarity) -> &[&'c Creature] {
        match rarity {
            Rarity::Legendary => self.legendaries.as_slice(),
            Rarity::Epic => self.epics.as_slice(),
            Rarity::Common | Rarity::Rare => &[],
        }
    }

    /// Cumulative walk: first creature whose running sum exceeds `r`.
    fn weighted_pick<S: DrawSource + ?Sized>(&self, source: &mut S) -> &'c Creature {
        let r = source.uniform(self.total_weight);
        let mut running = 0.0;
        for &creature in &self.weighted {
            running += creature.weight;
            if r < running {
                return creature;
            }
        }
        // rounding left r at or past the last boundary
        self.weighted[self.weighted.len() - 1]
    }
}

/// Draw a single creature and return the outcome together with the updated pity state.
pub fn draw<S: DrawSource + ?Sized>(
    pool: &DrawPool<'_>,
    rules: &PityRules,
    pity: PityState,
    source: &mut S,
) -> (DrawOutcome, PityState) {
    let mut next = pity;
    let forced = pity.forced_rarity(
        rules,
        !pool.legendaries.is_empty(),
        !pool.epics.is_empty(),
    );
    let outcome = match forced {
        Some(rarity) => {
            let candidates = pool.forced_candidates(rarity);
            let creature = candidates[source.pick(candidates.len())];
            next.record_forced(rarity);
            DrawOutcome::new(creature, true)
        }
        None => {
            let creature = pool.weighted_pick(source);
            next.record_natural(creature.rarity);
            DrawOutcome::new(creature, false)
        }
    };
    (outcome, next)
}

/// Cost and size of one pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct PullPlan {
    /// Charged once for the whole batch.
    pub cost: u64,
    pub count: u32,
}

/// The two pull sizes offered to players.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum PullType {
    #[default]
    Single,
    Multi,
}

impl PullType {
    pub fn as_str(self) -> &'static str {
        match self {
            PullType::Single => "single",
            PullType::Multi => "multi",
        }
    }
}

/// Result of a batch, ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub outcomes: Vec<DrawOutcome>,
    pub pity: PityState,
    pub balance: u64,
}

/// Run `plan.count` sequential draws. Each draw sees the pity state left by the previous one.
pub fn run_batch<S: DrawSource + ?Sized>(
    pool: &DrawPool<'_>,
    rules: &PityRules,
    plan: &PullPlan,
    balance: u64,
    pity: PityState,
    source: &mut S,
) -> Result<BatchResult, GachaError> {
    if plan.count == 0 {
        return Err(GachaError::EmptyBatch);
    }
    let balance = balance
        .checked_sub(plan.cost)
        .ok_or(GachaError::InsufficientFunds {
            required: plan.cost,
            available: balance,
        })?;
    let mut pity = pity;
    let mut outcomes = Vec::with_capacity(plan.count as usize);
    for _ in 0..plan.count {
        let (outcome, next) = draw(pool, rules, pity, source);
        pity = next;
        outcomes.push(outcome);
    }
    Ok(BatchResult {
        outcomes,
        pity,
        balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CreatureDraft;
    use std::collections::HashMap;

    /// Replays fixed values; `pick` always returns the first candidate.
    struct Scripted {
        values: Vec<f64>,
        next: usize,
    }

    impl Scripted {
        fn new(values: &[f64]) -> Self {
            Scripted {
                values: values.to_vec(),
                next: 0,
            }
        }
    }

    impl DrawSource for Scripted {
        fn uniform(&mut self, _upper: f64) -> f64 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }

        fn pick(&mut self, _len: usize) -> usize {
            0
        }
    }

    fn catalog(weights: &[(Rarity, f64)]) -> Catalog {
        let mut catalog = Catalog::new();
        for (i, (rarity, weight)) in weights.iter().enumerate() {
            catalog
                .add_creature(CreatureDraft {
                    name: format!("{rarity}-{i}"),
                    rarity: *rarity,
                    weight: *weight,
                    active: true,
                    description: None,
                    image: None,
                })
                .unwrap();
        }
        catalog
    }

    fn standard() -> Catalog {
        catalog(&[
            (Rarity::Common, 0.79),
            (Rarity::Rare, 0.15),
            (Rarity::Epic, 0.05),
            (Rarity::Legendary, 0.01),
        ])
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let catalog = Catalog::new();
        assert_eq!(
            DrawPool::from_catalog(&catalog).unwrap_err(),
            GachaError::EmptyCatalog
        );
    }

    #[test]
    fn zero_weights_are_rejected() {
        let catalog = catalog(&[(Rarity::Common, 0.0), (Rarity::Epic, 0.0)]);
        assert_eq!(
            DrawPool::from_catalog(&catalog).unwrap_err(),
            GachaError::NonPositiveWeightTotal
        );
    }

    #[test]
    fn weights_summing_past_f64_max_are_rejected() {
        let huge = catalog(&[(Rarity::Common, 1e308), (Rarity::Rare, 1e308)]);
        assert_eq!(
            DrawPool::from_catalog(&huge).unwrap_err(),
            GachaError::WeightTotalOverflow
        );
        // large but summable weights still draw
        let large = catalog(&[(Rarity::Common, 8e307), (Rarity::Rare, 8e307)]);
        let pool = DrawPool::from_catalog(&large).unwrap();
        let (outcome, _) = draw(
            &pool,
            &PityRules::default(),
            PityState::default(),
            &mut rng_from_seed(4),
        );
        assert!(!outcome.pity);
        assert!((pool.rates()[0].probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn boundary_value_belongs_to_the_next_creature() {
        let catalog = catalog(&[(Rarity::Common, 1.0), (Rarity::Rare, 1.0)]);
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let rules = PityRules::default();
        let (first, _) = draw(&pool, &rules, PityState::default(), &mut Scripted::new(&[0.999]));
        assert_eq!(first.rarity, Rarity::Common);
        let (second, _) = draw(&pool, &rules, PityState::default(), &mut Scripted::new(&[1.0]));
        assert_eq!(second.rarity, Rarity::Rare);
    }

    #[test]
    fn walk_overflow_falls_back_to_last_creature() {
        let catalog = catalog(&[(Rarity::Common, 1.0), (Rarity::Rare, 1.0)]);
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let (outcome, _) = draw(
            &pool,
            &PityRules::default(),
            PityState::default(),
            &mut Scripted::new(&[2.0]),
        );
        assert_eq!(outcome.rarity, Rarity::Rare);
        assert!(!outcome.pity);
    }

    #[test]
    fn zero_weight_creature_is_never_walked_but_can_be_forced() {
        let catalog = catalog(&[(Rarity::Common, 1.0), (Rarity::Epic, 0.0)]);
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let rules = PityRules::default();
        let (natural, _) = draw(&pool, &rules, PityState::default(), &mut Scripted::new(&[0.99]));
        assert_eq!(natural.rarity, Rarity::Common);
        let (forced, pity) = draw(&pool, &rules, PityState::new(9, 0), &mut Scripted::new(&[0.0]));
        assert_eq!(forced.rarity, Rarity::Epic);
        assert!(forced.pity);
        assert_eq!(pity, PityState::new(0, 0));
    }

    #[test]
    fn forced_epic_resets_counter() {
        let catalog = standard();
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let plan = PullPlan { cost: 5, count: 1 };
        let result = run_batch(
            &pool,
            &PityRules::default(),
            &plan,
            5,
            PityState::new(9, 0),
            &mut rng_from_seed(1),
        )
        .unwrap();
        assert_eq!(result.outcomes[0].rarity, Rarity::Epic);
        assert!(result.outcomes[0].pity);
        assert_eq!(result.pity.pity_counter, 0);
        assert_eq!(result.balance, 0);
    }

    #[test]
    fn forced_legendary_resets_both_counters() {
        let catalog = standard();
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let plan = PullPlan { cost: 5, count: 1 };
        let result = run_batch(
            &pool,
            &PityRules::default(),
            &plan,
            100,
            PityState::new(4, 79),
            &mut rng_from_seed(2),
        )
        .unwrap();
        assert_eq!(result.outcomes[0].rarity, Rarity::Legendary);
        assert!(result.outcomes[0].pity);
        assert_eq!(result.pity, PityState::default());
    }

    #[test]
    fn batch_threads_pity_through_each_draw() {
        let catalog = standard();
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        // always the common creature on weighted draws
        let mut source = Scripted::new(&[0.0]);
        let plan = PullPlan { cost: 50, count: 10 };
        let result = run_batch(
            &pool,
            &PityRules::default(),
            &plan,
            50,
            PityState::default(),
            &mut source,
        )
        .unwrap();
        let pity_flags: Vec<bool> = result.outcomes.iter().map(|o| o.pity).collect();
        assert_eq!(pity_flags.iter().filter(|p| **p).count(), 1);
        assert!(pity_flags[9]);
        assert_eq!(result.outcomes[9].rarity, Rarity::Epic);
        assert_eq!(result.pity, PityState::new(0, 9));
    }

    #[test]
    fn insufficient_funds_and_empty_batch_fail_cleanly() {
        let catalog = standard();
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let rules = PityRules::default();
        let err = run_batch(
            &pool,
            &rules,
            &PullPlan { cost: 50, count: 10 },
            49,
            PityState::default(),
            &mut rng_from_seed(3),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GachaError::InsufficientFunds {
                required: 50,
                available: 49
            }
        );
        let err = run_batch(
            &pool,
            &rules,
            &PullPlan { cost: 0, count: 0 },
            10,
            PityState::default(),
            &mut rng_from_seed(3),
        )
        .unwrap_err();
        assert_eq!(err, GachaError::EmptyBatch);
    }

    #[test]
    fn frequencies_converge_to_normalized_weights() {
        let catalog = standard();
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let rules = PityRules {
            epic_after: u32::MAX,
            legendary_after: u32::MAX,
        };
        let mut rng = rng_from_seed(0xC0FFEE);
        let draws = 200_000;
        let mut counts: HashMap<Rarity, u32> = HashMap::new();
        let mut pity = PityState::default();
        for _ in 0..draws {
            let (outcome, next) = draw(&pool, &rules, pity, &mut rng);
            pity = next;
            *counts.entry(outcome.rarity).or_default() += 1;
        }
        for rate in pool.rates() {
            let observed = f64::from(counts.get(&rate.rarity).copied().unwrap_or(0)) / draws as f64;
            assert!(
                (observed - rate.probability).abs() < 0.01,
                "{} observed {observed} expected {}",
                rate.rarity,
                rate.probability
            );
        }
    }

    #[test]
    fn rates_are_normalized() {
        let catalog = catalog(&[(Rarity::Common, 3.0), (Rarity::Rare, 1.0), (Rarity::Epic, 0.0)]);
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let rates = pool.rates();
        assert_eq!(rates.len(), 2);
        assert!((rates[0].probability - 0.75).abs() < 1e-12);
        assert!((rates[1].probability - 0.25).abs() < 1e-12);
    }

    #[test]
    fn forced_picks_spread_evenly_over_the_tier() {
        let catalog = catalog(&[
            (Rarity::Common, 1.0),
            (Rarity::Epic, 0.05),
            (Rarity::Epic, 0.01),
            (Rarity::Epic, 0.0),
            (Rarity::Epic, 0.2),
            (Rarity::Legendary, 0.001),
            (Rarity::Legendary, 0.0),
        ]);
        let pool = DrawPool::from_catalog(&catalog).unwrap();
        let rules = PityRules::default();
        let mut rng = rng_from_seed(0xF15);
        let draws = 40_000u32;
        let mut epics: HashMap<CreatureId, u32> = HashMap::new();
        let mut legendaries: HashMap<CreatureId, u32> = HashMap::new();
        for _ in 0..draws {
            let (epic, _) = draw(&pool, &rules, PityState::new(9, 0), &mut rng);
            assert!(epic.pity);
            *epics.entry(epic.creature_id).or_default() += 1;
            let (legendary, _) = draw(&pool, &rules, PityState::new(0, 79), &mut rng);
            assert!(legendary.pity);
            *legendaries.entry(legendary.creature_id).or_default() += 1;
        }
        // weights play no part once pity forces the tier
        assert_eq!(epics.len(), 4);
        for (id, count) in &epics {
            let share = f64::from(*count) / f64::from(draws);
            assert!((share - 0.25).abs() < 0.02, "epic {id} share {share}");
        }
        assert_eq!(legendaries.len(), 2);
        for (id, count) in &legendaries {
            let share = f64::from(*count) / f64::from(draws);
            assert!((share - 0.5).abs() < 0.02, "legendary {id} share {share}");
        }
    }
}
