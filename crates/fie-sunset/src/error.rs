// error.rs — Error types for the sunset workflow.

use fie_types::{ErrorClass, Timestamp};
use thiserror::Error;

use crate::stage::SunsetStage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SunsetError {
    #[error("sunset not due until {due_at}")]
    TooEarly { due_at: Timestamp },

    #[error("estate is already sunset")]
    AlreadySunset,

    #[error("sunset has not been initiated")]
    NotYetSunset,

    #[error(
        "archive inputs differ in length: {assets} assets, {uris} URIs, {hashes} content hashes"
    )]
    LengthMismatch {
        assets: usize,
        uris: usize,
        hashes: usize,
    },

    #[error("assets are already archived")]
    AlreadyArchived,

    #[error("assets must be archived before the IP transition")]
    AssetsNotArchived,

    #[error("IP has already been transitioned")]
    AlreadyTransitioned,

    #[error("IP must be transitioned before clustering")]
    IpNotTransitioned,

    #[error("legacy is already clustered")]
    AlreadyClustered,

    #[error("legacy must be clustered before completion")]
    NotClustered,

    #[error("sunset is already complete")]
    AlreadyCompleted,

    /// A stage change that is not a single step forward. Unreachable when the
    /// stage preconditions hold; callers must abort.
    #[error("invariant violation: sunset stage cannot move from {from} to {to}")]
    InvariantViolation { from: SunsetStage, to: SunsetStage },
}

impl SunsetError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SunsetError::LengthMismatch { .. } => ErrorClass::Configuration,
            SunsetError::InvariantViolation { .. } => ErrorClass::InvariantViolation,
            _ => ErrorClass::Precondition,
        }
    }
}
