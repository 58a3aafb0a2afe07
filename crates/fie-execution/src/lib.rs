//! # fie-execution
//!
//! The execution agent of a triggered estate.
//!
//! Once the trigger has fired, [`ExecutionState`] interprets requests
//! against the principal's frozen corpus through a [`CorpusResolver`] and
//! authorizes only those scoring at least [`CONFIDENCE_THRESHOLD`]. Every
//! evaluated request is appended to the action log as an [`ActionRecord`],
//! authorized or not. Licensing goes through an [`AssetRegistry`]: an
//! authorized license is recorded as pending, and
//! [`ExecutionState::settle_pending`] makes the registry call afterwards so
//! the caller can persist the record first.
//!
//! Execution ends when the sunset horizon is reached; from then on
//! [`ExecutionState::activate_sunset`] hands the estate to `fie-sunset`.

pub mod agent;
pub mod error;
pub mod record;
pub mod registry;
pub mod resolver;

pub use agent::{
    ExecutionContext, ExecutionPhase, ExecutionState, LicenseTerms, CONFIDENCE_THRESHOLD,
    MAX_ROYALTY_BPS, PROHIBITED_ACTION_TYPES,
};
pub use error::ExecutionError;
pub use record::{ActionKind, ActionOutcome, ActionRecord, SideEffect};
pub use registry::{
    AssetRegistry, InMemoryRegistry, IssuedLicense, LicenseId, LoggingRegistry, MintedAsset,
    RegistryError,
};
pub use resolver::{CorpusRef, CorpusResolver, Resolution, ResolveError, StaticResolver};
