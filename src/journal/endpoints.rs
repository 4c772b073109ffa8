use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;

use super::audit::AuditReport;
use super::ActionEntry;
use crate::game_state::SharedGameState;
use crate::identity::Admin;

#[derive(rocket::serde::Serialize, rocket::serde::Deserialize, rocket_okapi::JsonSchema, Debug)]
#[serde(crate = "rocket::serde")]
pub struct ActionLogResponse {
    pub entries: Vec<ActionEntry>,
    pub next_seq: Option<u64>,
    pub limit: usize,
}

/// Page through the journal. `since` is a millisecond timestamp and `player` keeps one
/// player's actions.
#[openapi]
#[get("/actions/log?<from_seq>&<limit>&<action_type>&<since>&<player>")]
pub async fn list_actions_log(
    _admin: Admin,
    from_seq: Option<u64>,
    limit: Option<usize>,
    action_type: Option<String>,
    since: Option<u128>,
    player: Option<u64>,
    game_state: &State<SharedGameState>,
) -> Json<ActionLogResponse> {
    let max = limit.unwrap_or(1000);
    let mut filtered: Vec<ActionEntry> = game_state
        .action_log()
        .entries()
        .into_iter()
        .filter(|e| from_seq.map_or(true, |f| e.seq >= f))
        .filter(|e| action_type.as_ref().map_or(true, |at| e.action_type == *at))
        .filter(|e| match since {
            Some(s) => e.timestamp.parse::<u128>().map_or(false, |ts| ts >= s),
            None => true,
        })
        .filter(|e| player.map_or(true, |p| e.payload.player() == Some(p)))
        .collect();
    let has_more = filtered.len() > max;
    filtered.truncate(max);
    let next_seq = if has_more {
        filtered.last().map(|e| e.seq + 1)
    } else {
        None
    };
    Json(ActionLogResponse {
        entries: filtered,
        next_seq,
        limit: max,
    })
}

/// Re-run every journaled pull and report the ones that do not reproduce.
#[openapi]
#[get("/actions/audit")]
pub async fn audit_actions(
    _admin: Admin,
    game_state: &State<SharedGameState>,
) -> Json<AuditReport> {
    Json(game_state.audit())
}
