//! JSON status payloads and the HTTP mapping of [`GachaError`].

use okapi::openapi3::Responses;
use rocket::http::Status as HttpStatus;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket_okapi::gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::util::add_schema_response;
use rocket_okapi::JsonSchema;

use crate::error::{GachaError, StorageError};

/// Body of every non-data response: `{success, reason, message}`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(crate = "rocket::serde")]
pub struct Status {
    pub success: bool,
    pub reason: Option<String>,
    pub message: String,
}

pub fn new_status(message: impl Into<String>) -> Json<Status> {
    Json(Status {
        success: true,
        reason: None,
        message: message.into(),
    })
}

impl GachaError {
    pub fn http_status(&self) -> HttpStatus {
        match self {
            GachaError::InsufficientFunds { .. } => HttpStatus::BadRequest,
            GachaError::EmptyCatalog
            | GachaError::NonPositiveWeightTotal
            | GachaError::WeightTotalOverflow => HttpStatus::ServiceUnavailable,
            GachaError::Unauthorized => HttpStatus::Unauthorized,
            GachaError::EmptyBatch
            | GachaError::InvalidCatalogEntry(_)
            | GachaError::InvalidRequest(_) => HttpStatus::UnprocessableEntity,
            GachaError::UnknownCreature(_) | GachaError::UnknownMission(_) => HttpStatus::NotFound,
            GachaError::Storage(StorageError::DuplicateAccount(_)) => HttpStatus::Conflict,
            GachaError::Storage(_) => HttpStatus::InternalServerError,
        }
    }

    /// The failure payload sent to clients.
    pub fn to_status(&self) -> Status {
        let message = match self {
            GachaError::Storage(StorageError::DuplicateAccount(id)) => {
                format!("player {} is already registered", id)
            }
            GachaError::Storage(_) => {
                "the game could not save your progress, try again".to_string()
            }
            other => other.to_string(),
        };
        Status {
            success: false,
            reason: Some(self.reason().to_string()),
            message,
        }
    }
}

impl<'r> Responder<'r, 'static> for GachaError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.http_status();
        match &self {
            GachaError::Storage(e) => log::error!("{} {}: {}", request.method(), request.uri(), e),
            GachaError::EmptyCatalog
            | GachaError::NonPositiveWeightTotal
            | GachaError::WeightTotalOverflow => {
                log::warn!(
                    "{} {}: catalog misconfigured: {}",
                    request.method(),
                    request.uri(),
                    self
                )
            }
            _ => log::debug!("{} {}: {}", request.method(), request.uri(), self),
        }
        (status, Json(self.to_status())).respond_to(request)
    }
}

impl OpenApiResponderInner for GachaError {
    fn responses(gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        let schema = gen.json_schema::<Status>();
        for code in [400, 401, 404, 422, 500, 503] {
            add_schema_response(&mut responses, code, "application/json", schema.clone())?;
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_details_are_not_sent_to_clients() {
        let err = GachaError::from(StorageError::Unavailable("disk /var/db is full".to_string()));
        let status = err.to_status();
        assert_eq!(status.reason.as_deref(), Some("StorageFailure"));
        assert!(!status.message.contains("/var/db"));
        assert_eq!(err.http_status(), HttpStatus::InternalServerError);
    }

    #[test]
    fn funds_error_carries_reason_and_amounts() {
        let err = GachaError::InsufficientFunds {
            required: 50,
            available: 12,
        };
        let status = err.to_status();
        assert!(!status.success);
        assert_eq!(status.reason.as_deref(), Some("InsufficientFunds"));
        assert!(status.message.contains("50"));
        assert_eq!(err.http_status(), HttpStatus::BadRequest);
    }

    #[test]
    fn catalog_misconfiguration_is_unavailable() {
        for err in [
            GachaError::EmptyCatalog,
            GachaError::NonPositiveWeightTotal,
            GachaError::WeightTotalOverflow,
        ] {
            assert_eq!(err.http_status(), HttpStatus::ServiceUnavailable);
            assert_eq!(err.to_status().reason.as_deref(), Some(err.reason()));
        }
    }
}
