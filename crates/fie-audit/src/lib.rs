//! # fie-audit
//!
//! Append-only audit trail for Finite Intent Executor estates.
//!
//! Every accepted state change (trigger configuration, check-ins, signatures,
//! oracle verdicts, the trigger itself, each executed action and every sunset
//! stage) is recorded as an [`AuditEvent`] in a JSONL log. Each line carries
//! the SHA-256 of the previous line, so deletions, insertions and edits are
//! detectable with [`AuditLog::verify_chain`].
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use fie_audit::{AuditAction, AuditEvent, AuditLog};
//!
//! let mut log = AuditLog::open("/tmp/audit.jsonl").unwrap();
//! let mut event = AuditEvent::new("alice", "alice", AuditAction::CheckIn, Utc::now());
//! log.append(&mut event).unwrap();
//! ```

pub mod error;
pub mod event;
pub mod hasher;
pub mod log;

pub use error::AuditError;
pub use event::{AuditAction, AuditEvent};
pub use log::AuditLog;
