// error.rs — Error types for the execution agent.
//
// Low confidence and resolver failures are *not* errors: they are recorded
// as unauthorized actions. These variants are for calls that are rejected
// outright and leave no record.

use fie_types::{ErrorClass, Timestamp};
use thiserror::Error;

use crate::agent::ExecutionPhase;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("estate has not been triggered")]
    NotTriggered,

    #[error("execution is already active")]
    AlreadyActive,

    #[error("execution is not active (phase: {phase})")]
    NotActive { phase: ExecutionPhase },

    #[error("invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("action category '{category}' is prohibited")]
    ProhibitedAction { category: String },

    #[error("sunset horizon not reached until {due_at}")]
    SunsetNotDue { due_at: Timestamp },

    #[error("execution period ended at {ended_at}")]
    ExecutionPeriodEnded { ended_at: Timestamp },
}

impl ExecutionError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ExecutionError::InvalidParameters { .. } => ErrorClass::Configuration,
            ExecutionError::ProhibitedAction { .. } => ErrorClass::Authorization,
            ExecutionError::NotTriggered
            | ExecutionError::AlreadyActive
            | ExecutionError::NotActive { .. }
            | ExecutionError::SunsetNotDue { .. }
            | ExecutionError::ExecutionPeriodEnded { .. } => ErrorClass::Precondition,
        }
    }
}
