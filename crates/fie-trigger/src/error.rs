// error.rs — Error types for the trigger state machine.

use fie_types::{ErrorClass, Identity, Timestamp};
use thiserror::Error;

use crate::config::TriggerMode;

/// Errors returned by [`TriggerMechanism`](crate::TriggerMechanism) calls.
///
/// A rejected call never changes the estate's trigger state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("invalid trigger configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("estate is already triggered")]
    AlreadyTriggered,

    #[error("no trigger configured for this estate")]
    NotConfigured,

    #[error("operation requires {expected} mode but estate is configured for {actual}")]
    WrongMode {
        expected: TriggerMode,
        actual: TriggerMode,
    },

    #[error("'{caller}' is not the principal of this estate")]
    NotPrincipal { caller: Identity },

    #[error("'{signer}' is not a registered quorum signer")]
    NotAuthorizedSigner { signer: Identity },

    #[error("'{signer}' has already signed")]
    DuplicateSignature { signer: Identity },

    #[error("'{oracle}' is not a registered oracle")]
    NotAuthorizedOracle { oracle: Identity },

    #[error("'{oracle}' has already submitted a verdict")]
    DuplicateVerdict { oracle: Identity },

    #[error("deadman switch not yet due (due at {due_at})")]
    TooEarly { due_at: Timestamp },
}

impl TriggerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TriggerError::InvalidConfig { .. } => ErrorClass::Configuration,
            TriggerError::NotPrincipal { .. }
            | TriggerError::NotAuthorizedSigner { .. }
            | TriggerError::NotAuthorizedOracle { .. } => ErrorClass::Authorization,
            TriggerError::AlreadyTriggered
            | TriggerError::NotConfigured
            | TriggerError::WrongMode { .. }
            | TriggerError::DuplicateSignature { .. }
            | TriggerError::DuplicateVerdict { .. }
            | TriggerError::TooEarly { .. } => ErrorClass::Precondition,
        }
    }
}
