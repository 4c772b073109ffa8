use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::State;
use rocket_okapi::{openapi, JsonSchema};

use super::{DrawOutcome, DrawRate, PullType};
use crate::error::GachaError;
use crate::game_state::SharedGameState;
use crate::identity::PlayerId;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct PullRequest {
    #[serde(rename = "type", default)]
    pub pull_type: PullType,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct PullResponse {
    pub success: bool,
    pub pull_type: PullType,
    /// Drawn creatures in draw order.
    pub outcomes: Vec<DrawOutcome>,
    /// First outcome of a single pull, for clients that only show one card.
    pub creature: Option<DrawOutcome>,
    pub coins: u64,
    pub pity_counter: u32,
    pub legendary_pity: u32,
    pub pulls: u64,
}

/// Spend coins on a single (`{"type":"single"}`) or ten-creature (`{"type":"multi"}`) pull.
#[openapi]
#[post("/gacha/pull", format = "json", data = "<request>")]
pub async fn pull(
    player: PlayerId,
    request: Json<PullRequest>,
    game_state: &State<SharedGameState>,
) -> Result<Json<PullResponse>, GachaError> {
    let pull_type = request.into_inner().pull_type;
    let report = game_state.perform_draw(player.0, pull_type)?;
    let creature = match pull_type {
        PullType::Single => report.outcomes.first().cloned(),
        PullType::Multi => None,
    };
    Ok(Json(PullResponse {
        success: true,
        pull_type,
        creature,
        coins: report.account.coins,
        pity_counter: report.account.pity.pity_counter,
        legendary_pity: report.account.pity.legendary_pity,
        pulls: report.account.pulls,
        outcomes: report.outcomes,
    }))
}

/// Chance of each creature on a draw that pity does not force.
#[openapi]
#[get("/gacha/rates")]
pub async fn rates(game_state: &State<SharedGameState>) -> Result<Json<Vec<DrawRate>>, GachaError> {
    Ok(Json(game_state.rates()?))
}
