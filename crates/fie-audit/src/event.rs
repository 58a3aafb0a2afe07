// event.rs — Audit event data model.
//
// One AuditEvent per accepted state change. The timestamp is supplied by the
// caller (the executor's shared clock), never read here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of state change this event records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TriggerConfigured,
    CheckIn,
    SignatureAccepted,
    OracleVerdict,
    Triggered,
    ExecutionActivated,
    /// An action was evaluated; `metadata.authorized` says whether it passed the gate.
    ActionRecorded,
    /// The registry answered a pending license; `metadata` holds the settled record.
    LicenseSettled,
    SunsetRequested,
    SunsetInitiated,
    EmergencySunset,
    AssetsArchived,
    IpTransitioned,
    /// Archived assets were handed to the registry's public domain.
    PublicDomainReleased,
    LegacyClustered,
    SunsetCompleted,
}

/// A single audit event, one line in the JSONL audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,

    pub timestamp: DateTime<Utc>,

    /// Who made the call (principal, signer, oracle, or any caller).
    pub actor: String,

    /// The estate the call applied to.
    pub principal: String,

    pub action: AuditAction,

    /// SHA-256 of the call's salient input (e.g. the goal description).
    pub input_hash: Option<String>,

    /// Hash of the previous line in the log. `None` for the first event.
    pub previous_hash: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    pub fn new(
        actor: impl Into<String>,
        principal: impl Into<String>,
        action: AuditAction,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp,
            actor: actor.into(),
            principal: principal.into(),
            action,
            input_hash: None,
            previous_hash: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_input_hash(mut self, hash: impl Into<String>) -> Self {
        self.input_hash = Some(hash.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}
