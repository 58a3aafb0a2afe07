//! # fie-trigger
//!
//! Decides whether an estate has become *triggered*, and when.
//!
//! Exactly one activation mode is configured per estate:
//!
//! - **Deadman**: the principal checks in periodically; anyone may fire
//!   the switch once the interval lapses without a check-in.
//! - **Quorum**: M distinct registered signers must sign.
//! - **Oracle**: a strict majority of registered oracles must report a
//!   positive verdict, either directly or through a verified certificate
//!   proof.
//!
//! ## Key invariants
//!
//! - The trigger timestamp exists iff the estate is triggered, is set
//!   exactly once, and never changes afterwards.
//! - Configuration is principal-only and frozen once triggered.
//! - Rejected calls leave the state unchanged.

pub mod anchor;
pub mod config;
pub mod error;
pub mod mechanism;

pub use anchor::{creator_commitment, CertificateProof, CertificateVerifier, PublicInputs};
pub use config::{DeadmanConfig, OracleConfig, QuorumConfig, TriggerConfig, TriggerMode, TriggerParams};
pub use error::TriggerError;
pub use mechanism::{TriggerMechanism, TriggerProgress, TriggerState};
