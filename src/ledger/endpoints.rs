use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::State;
use rocket_okapi::{openapi, JsonSchema};

use super::UserAccount;
use crate::catalog::Rarity;
use crate::error::GachaError;
use crate::game_state::{ClickReport, Inventory, Profile, SharedGameState};
use crate::identity::PlayerId;

/// Count one click for the calling player.
#[openapi]
#[post("/click")]
pub async fn click(
    player: PlayerId,
    game_state: &State<SharedGameState>,
) -> Result<Json<ClickReport>, GachaError> {
    Ok(Json(game_state.register_click(player.0)?))
}

#[openapi]
#[get("/player")]
pub async fn get_profile(
    player: PlayerId,
    game_state: &State<SharedGameState>,
) -> Result<Json<Profile>, GachaError> {
    Ok(Json(game_state.profile(player.0)?))
}

/// Owned creatures, newest first. Optionally filter by ?rarity= (common, rare, epic, legendary).
#[openapi]
#[get("/player/inventory?<rarity>")]
pub async fn get_inventory(
    player: PlayerId,
    rarity: Option<String>,
    game_state: &State<SharedGameState>,
) -> Result<Json<Inventory>, GachaError> {
    let rarity = match rarity.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<Rarity>().map_err(GachaError::InvalidRequest)?),
    };
    Ok(Json(game_state.inventory(player.0, rarity)?))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct TimeReport {
    pub seconds: u64,
}

/// Add client-reported play time.
#[openapi]
#[post("/player/time", format = "json", data = "<report>")]
pub async fn add_time(
    player: PlayerId,
    report: Json<TimeReport>,
    game_state: &State<SharedGameState>,
) -> Result<Json<UserAccount>, GachaError> {
    Ok(Json(game_state.record_time(player.0, report.seconds)?))
}
