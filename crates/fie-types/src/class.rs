// class.rs — The error taxonomy shared by every state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of a rejected call.
///
/// Every class except `InvariantViolation` is recoverable and leaves the
/// estate untouched. `InvariantViolation` means a transition was attempted
/// that the preconditions should have made impossible; callers abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Invalid or conflicting configuration; retry with valid parameters.
    Configuration,
    /// Wrong stage for this call; complete the prerequisite first.
    Precondition,
    /// Caller is not registered for this call.
    Authorization,
    /// The corpus resolver could not produce a usable answer.
    Resolution,
    InvariantViolation,
}

impl ErrorClass {
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorClass::InvariantViolation)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorClass::Configuration => "configuration",
            ErrorClass::Precondition => "precondition",
            ErrorClass::Authorization => "authorization",
            ErrorClass::Resolution => "resolution",
            ErrorClass::InvariantViolation => "invariant_violation",
        };
        f.write_str(name)
    }
}
