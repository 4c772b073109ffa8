use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::State;
use rocket_okapi::{openapi, JsonSchema};

use super::{CatalogSnapshot, Creature, CreatureDraft, CreatureId, Mission, MissionDraft, MissionId};
use crate::error::GachaError;
use crate::game_state::SharedGameState;
use crate::identity::Admin;
use crate::ledger::{UserAccount, UserId};
use crate::status_messages::{new_status, Status};

/// Every creature in the catalog, ascending id. Pass ?active=true for drawable ones only.
#[openapi]
#[get("/catalog/creatures?<active>")]
pub async fn list_creatures(
    active: Option<bool>,
    game_state: &State<SharedGameState>,
) -> Json<Vec<Creature>> {
    let catalog = game_state.catalog();
    let creatures = catalog
        .creatures()
        .filter(|c| active.map_or(true, |wanted| c.active == wanted))
        .cloned()
        .collect();
    Json(creatures)
}

/// Missions in display order.
#[openapi]
#[get("/catalog/missions")]
pub async fn list_missions(game_state: &State<SharedGameState>) -> Json<Vec<Mission>> {
    let catalog = game_state.catalog();
    Json(catalog.missions().into_iter().cloned().collect())
}

#[openapi]
#[post("/admin/creatures", format = "json", data = "<draft>")]
pub async fn create_creature(
    _admin: Admin,
    draft: Json<CreatureDraft>,
    game_state: &State<SharedGameState>,
) -> Result<Created<Json<Creature>>, GachaError> {
    let creature = game_state.add_creature(draft.into_inner())?;
    Ok(Created::new(format!("/catalog/creatures/{}", creature.id)).body(Json(creature)))
}

#[openapi]
#[put("/admin/creatures/<id>", format = "json", data = "<draft>")]
pub async fn update_creature(
    _admin: Admin,
    id: CreatureId,
    draft: Json<CreatureDraft>,
    game_state: &State<SharedGameState>,
) -> Result<Json<Creature>, GachaError> {
    Ok(Json(game_state.update_creature(id, draft.into_inner())?))
}

/// Remove a creature. Players keep the copies they already own.
#[openapi]
#[delete("/admin/creatures/<id>")]
pub async fn delete_creature(
    _admin: Admin,
    id: CreatureId,
    game_state: &State<SharedGameState>,
) -> Result<Json<Creature>, GachaError> {
    Ok(Json(game_state.remove_creature(id)?))
}

#[openapi]
#[post("/admin/missions", format = "json", data = "<draft>")]
pub async fn create_mission(
    _admin: Admin,
    draft: Json<MissionDraft>,
    game_state: &State<SharedGameState>,
) -> Result<Created<Json<Mission>>, GachaError> {
    let mission = game_state.add_mission(draft.into_inner())?;
    Ok(Created::new(format!("/catalog/missions/{}", mission.id)).body(Json(mission)))
}

#[openapi]
#[put("/admin/missions/<id>", format = "json", data = "<draft>")]
pub async fn update_mission(
    _admin: Admin,
    id: MissionId,
    draft: Json<MissionDraft>,
    game_state: &State<SharedGameState>,
) -> Result<Json<Mission>, GachaError> {
    Ok(Json(game_state.update_mission(id, draft.into_inner())?))
}

#[openapi]
#[delete("/admin/missions/<id>")]
pub async fn delete_mission(
    _admin: Admin,
    id: MissionId,
    game_state: &State<SharedGameState>,
) -> Result<Json<Mission>, GachaError> {
    Ok(Json(game_state.remove_mission(id)?))
}

#[openapi]
#[get("/admin/catalog/export")]
pub async fn export_catalog(
    _admin: Admin,
    game_state: &State<SharedGameState>,
) -> Json<CatalogSnapshot> {
    Json(game_state.export_catalog())
}

/// Append the creatures and missions of an exported catalog.
/// Nothing is added if any entry is invalid.
#[openapi]
#[post("/admin/catalog/import", format = "json", data = "<snapshot>")]
pub async fn import_catalog(
    _admin: Admin,
    snapshot: Json<CatalogSnapshot>,
    game_state: &State<SharedGameState>,
) -> Result<Json<Status>, GachaError> {
    let (creatures, missions) = game_state.import_catalog(snapshot.into_inner())?;
    Ok(new_status(format!(
        "imported {} creatures and {} missions",
        creatures, missions
    )))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct NewPlayer {
    pub id: UserId,
    /// Defaults to the configured starting balance.
    #[serde(default)]
    pub coins: Option<u64>,
}

/// Register a player id issued by the account system.
#[openapi]
#[post("/admin/players", format = "json", data = "<player>")]
pub async fn register_player(
    _admin: Admin,
    player: Json<NewPlayer>,
    game_state: &State<SharedGameState>,
) -> Result<Created<Json<UserAccount>>, GachaError> {
    let account = game_state.register_player(player.id, player.coins)?;
    Ok(Created::new("/player").body(Json(account)))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct SeedRequest {
    pub seed: u64,
}

/// Reseed the draw generator so later pulls are reproducible.
#[openapi]
#[post("/admin/seed", format = "json", data = "<seed_req>")]
pub async fn set_seed(
    _admin: Admin,
    seed_req: Json<SeedRequest>,
    game_state: &State<SharedGameState>,
) -> Json<Status> {
    game_state.set_seed(seed_req.seed);
    new_status(format!("seed set to {}", seed_req.seed))
}
