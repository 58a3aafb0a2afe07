// error.rs — Error types for estate orchestration.

use fie_audit::AuditError;
use fie_execution::ExecutionError;
use fie_sunset::SunsetError;
use fie_trigger::TriggerError;
use fie_types::{ErrorClass, Identity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstateError {
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Sunset(#[from] SunsetError),

    /// No estate has been configured for this principal.
    #[error("no estate for principal {0}")]
    UnknownEstate(Identity),

    /// Sunset calls need a trigger timestamp to count from.
    #[error("estate {0} has not been triggered")]
    NotTriggered(Identity),

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("audit log error: {0}")]
    Audit(#[from] AuditError),

    /// A notification dispatch failed (non-fatal).
    #[error("notification error: {0}")]
    NotificationError(String),
}

impl EstateError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EstateError::Trigger(e) => e.class(),
            EstateError::Execution(e) => e.class(),
            EstateError::Sunset(e) => e.class(),
            EstateError::UnknownEstate(_) | EstateError::NotTriggered(_) => ErrorClass::Precondition,
            EstateError::IoError { .. }
            | EstateError::InvalidConfig { .. }
            | EstateError::SerializationError(_)
            | EstateError::Audit(_)
            | EstateError::NotificationError(_) => ErrorClass::Configuration,
        }
    }
}
