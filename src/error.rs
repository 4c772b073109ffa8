//! Error types shared by the draw engine, the ledger and the HTTP layer.

use thiserror::Error;

use crate::catalog::{CreatureId, MissionId};
use crate::ledger::UserId;

/// Failures raised by a [`crate::ledger::LedgerStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("account {0} does not exist")]
    UnknownAccount(UserId),

    #[error("account {0} already exists")]
    DuplicateAccount(UserId),

    #[error("mission {mission} already completed by {user}")]
    DuplicateCompletion { user: UserId, mission: MissionId },
}

/// Everything the core can refuse to do.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GachaError {
    #[error("not enough coins: need {required}, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("no active creatures in the catalog")]
    EmptyCatalog,

    #[error("active creatures have no positive weight to draw from")]
    NonPositiveWeightTotal,

    #[error("active creature weights are too large to sum")]
    WeightTotalOverflow,

    #[error("a pull must draw at least one creature")]
    EmptyBatch,

    #[error("no active player session")]
    Unauthorized,

    #[error("creature {0} not found")]
    UnknownCreature(CreatureId),

    #[error("mission {0} not found")]
    UnknownMission(MissionId),

    #[error("invalid catalog entry: {0}")]
    InvalidCatalogEntry(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GachaError {
    /// Stable machine-readable code used in error payloads.
    pub fn reason(&self) -> &'static str {
        match self {
            GachaError::InsufficientFunds { .. } => "InsufficientFunds",
            GachaError::EmptyCatalog => "EmptyCatalog",
            GachaError::NonPositiveWeightTotal => "NonPositiveWeightTotal",
            GachaError::WeightTotalOverflow => "WeightTotalOverflow",
            GachaError::EmptyBatch => "EmptyBatch",
            GachaError::Unauthorized => "Unauthorized",
            GachaError::UnknownCreature(_) => "UnknownCreature",
            GachaError::UnknownMission(_) => "UnknownMission",
            GachaError::InvalidCatalogEntry(_) => "InvalidCatalogEntry",
            GachaError::InvalidRequest(_) => "InvalidRequest",
            GachaError::Storage(StorageError::DuplicateAccount(_)) => "DuplicatePlayer",
            // storage details stay in the server log
            GachaError::Storage(_) => "StorageFailure",
        }
    }
}
