//! # Sea Life Gacha
//!
//! Backend for a clicker + gacha game: players click to earn coins, finish
//! click missions for bonus coins and spend coins on randomized draws of sea
//! creatures.
//!
//! ## Overview
//!
//! The draw engine ([`gacha`]) picks creatures by weight and enforces two
//! pity guarantees (an epic within 10 pulls, a legendary within 80). All
//! player state lives in the [`ledger`], which applies each pull or click as
//! one all-or-nothing transaction per player. Every committed action is
//! journaled ([`journal`]) with enough detail to replay and audit pulls.
//!
//! ## Architecture
//!
//! The API is built using the Rocket web framework with OpenAPI documentation
//! support. A single [`game_state::GameState`] is shared between requests; it
//! locks per player rather than globally so different players never wait on
//! each other.

// Rocket makes this a bit tricky to support
#![allow(clippy::module_name_repetitions)]
#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::fairing::AdHoc;
use rocket::http::Status as HttpStatus;
use rocket::serde::json::Json;
use rocket::Request;
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};

pub mod catalog;
pub mod config;
pub mod error;
pub mod gacha;
pub mod game_state;
pub mod identity;
pub mod journal;
pub mod ledger;
pub mod missions;
pub mod status_messages;

use crate::config::GameConfig;
use crate::game_state::{GameState, SharedGameState};
use crate::status_messages::Status;

/// Initializes the Rocket web server with the stock catalog, an in-memory
/// ledger and the `[gacha]` configuration table.
///
/// # Example
///
/// ```no_run
/// use sea_life_gacha::rocket_initialize;
///
/// #[rocket::main]
/// async fn main() {
///     rocket_initialize().launch().await.expect("Failed to launch rocket");
/// }
/// ```
pub fn rocket_initialize() -> rocket::Rocket<rocket::Build> {
    let rocket = rocket::build();
    let config = GameConfig::from_figment(rocket.figment());
    mount(rocket, Arc::new(GameState::new(config)))
}

/// Same routes as [`rocket_initialize`], serving an already built game state.
pub fn rocket_with_state(game_state: SharedGameState) -> rocket::Rocket<rocket::Build> {
    mount(rocket::build(), game_state)
}

fn mount(
    rocket: rocket::Rocket<rocket::Build>,
    game_state: SharedGameState,
) -> rocket::Rocket<rocket::Build> {
    use crate::catalog::endpoints::*;
    use crate::gacha::endpoints::*;
    use crate::journal::endpoints::*;
    use crate::ledger::endpoints::*;

    #[allow(clippy::no_effect_underscore_binding)]
    let _ = env_logger::try_init();

    log::info!(
        "catalog has {} creatures, seed {}",
        game_state.catalog().creatures().count(),
        game_state
            .config()
            .seed
            .map_or_else(|| "from entropy".to_string(), |s| s.to_string())
    );
    if let Some(warning) = game_state.config().admin_token_warning() {
        log::warn!("{}", warning);
    }

    rocket
        .mount(
            "/",
            openapi_get_routes![
                pull,
                rates,
                click,
                get_profile,
                get_inventory,
                add_time,
                list_creatures,
                list_missions,
                create_creature,
                update_creature,
                delete_creature,
                create_mission,
                update_mission,
                delete_mission,
                export_catalog,
                import_catalog,
                register_player,
                set_seed,
                list_actions_log,
                audit_actions
            ],
        )
        .mount("/swagger", make_swagger_ui(&get_docs()))
        .register("/", catchers![default_catcher])
        .manage(game_state)
        .attach(AdHoc::on_shutdown("journal-flush", |rocket| {
            Box::pin(async move {
                if let Some(game_state) = rocket.state::<SharedGameState>() {
                    game_state.shutdown();
                }
            })
        }))
}

/// JSON body for failures Rocket raises before a handler runs (bad headers, malformed bodies).
#[catch(default)]
fn default_catcher(status: HttpStatus, request: &Request<'_>) -> (HttpStatus, Json<Status>) {
    let reason = match status.code {
        401 => "Unauthorized",
        404 => "NotFound",
        400 | 415 | 422 => "InvalidRequest",
        _ => "Error",
    };
    log::debug!("{} {} failed with {}", request.method(), request.uri(), status);
    (
        status,
        Json(Status {
            success: false,
            reason: Some(reason.to_string()),
            message: status.reason_lossy().to_string(),
        }),
    )
}

fn get_docs() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/openapi.json".to_string(),
        ..Default::default()
    }
}
