//! Request guards resolving who is calling.
//!
//! The core never authenticates anyone: handlers receive the player id as a
//! plain value, and admin routes require the [`Admin`] capability first.

use okapi::openapi3::{Object, Parameter, ParameterValue};
use rocket::http::Status as HttpStatus;
use rocket::request::{FromRequest, Outcome, Request};
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};

use crate::error::GachaError;
use crate::game_state::SharedGameState;
use crate::ledger::UserId;

pub const PLAYER_HEADER: &str = "X-Player-Id";
pub const ADMIN_HEADER: &str = "X-Admin-Token";

/// The calling player, taken from the `X-Player-Id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerId(pub UserId);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PlayerId {
    type Error = GachaError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request
            .headers()
            .get_one(PLAYER_HEADER)
            .and_then(|raw| raw.trim().parse::<UserId>().ok())
        {
            Some(id) => Outcome::Success(PlayerId(id)),
            None => Outcome::Error((HttpStatus::Unauthorized, GachaError::Unauthorized)),
        }
    }
}

/// Capability to edit the catalog and manage players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admin;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = GachaError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(game_state) = request.rocket().state::<SharedGameState>() else {
            log::error!("admin check without managed game state");
            return Outcome::Error((HttpStatus::InternalServerError, GachaError::Unauthorized));
        };
        match request.headers().get_one(ADMIN_HEADER) {
            Some(token) if game_state.config().admin_token_matches(token) => {
                Outcome::Success(Admin)
            }
            Some(_) => {
                log::warn!("rejected admin token on {}", request.uri());
                Outcome::Error((HttpStatus::Unauthorized, GachaError::Unauthorized))
            }
            None => Outcome::Error((HttpStatus::Unauthorized, GachaError::Unauthorized)),
        }
    }
}

fn header_parameter(
    name: &str,
    description: &str,
    schema: schemars::schema::SchemaObject,
) -> RequestHeaderInput {
    RequestHeaderInput::Parameter(Parameter {
        name: name.to_owned(),
        location: "header".to_owned(),
        description: Some(description.to_owned()),
        required: true,
        deprecated: false,
        allow_empty_value: false,
        value: ParameterValue::Schema {
            style: None,
            explode: None,
            allow_reserved: false,
            schema,
            example: None,
            examples: None,
        },
        extensions: Object::default(),
    })
}

impl<'r> OpenApiFromRequest<'r> for PlayerId {
    fn from_request_input(
        gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        let schema = gen.json_schema::<UserId>();
        Ok(header_parameter(
            PLAYER_HEADER,
            "Id of the registered player making the request.",
            schema,
        ))
    }
}

impl<'r> OpenApiFromRequest<'r> for Admin {
    fn from_request_input(
        gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        let schema = gen.json_schema::<String>();
        Ok(header_parameter(
            ADMIN_HEADER,
            "Admin token from the server configuration.",
            schema,
        ))
    }
}
