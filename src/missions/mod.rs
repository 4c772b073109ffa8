//! Mission evaluator: click thresholds that pay out once per player.

use std::collections::BTreeSet;

use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::JsonSchema;

use crate::catalog::{Mission, MissionId};

/// Missions unlocked by one evaluation and what they pay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct MissionEvaluation {
    pub newly_completed: Vec<MissionId>,
    pub total_reward: u64,
}

impl MissionEvaluation {
    pub fn is_empty(&self) -> bool {
        self.newly_completed.is_empty()
    }
}

/// Complete every active mission whose target `clicks` has reached and that is not in `completed`.
/// Results follow the iteration order of `missions`; the reward total does not depend on it.
pub fn evaluate<'a, I>(
    clicks: u64,
    missions: I,
    completed: &BTreeSet<MissionId>,
) -> MissionEvaluation
where
    I: IntoIterator<Item = &'a Mission>,
{
    let mut evaluation = MissionEvaluation::default();
    for mission in missions {
        if !mission.active || completed.contains(&mission.id) || clicks < mission.target {
            continue;
        }
        evaluation.newly_completed.push(mission.id);
        evaluation.total_reward = evaluation.total_reward.saturating_add(mission.reward);
    }
    evaluation
}
