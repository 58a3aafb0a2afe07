//! # fie-sunset
//!
//! The mandatory wind-down of an estate into a public legacy.
//!
//! Twenty years ([`SUNSET_DURATION`]) after the trigger, an estate is driven
//! through five irreversible stages: initiate → archive assets → transition
//! IP → cluster legacy → complete. [`SunsetState::emergency_sunset`] lets any
//! caller start the sequence so an unresponsive operator cannot block it.

pub mod error;
pub mod protocol;
pub mod stage;

pub use error::SunsetError;
pub use protocol::{is_sunset_due, sunset_due_at, ArchivedAsset, SunsetState, SUNSET_DURATION};
pub use stage::{PostSunsetLicense, SunsetStage};
