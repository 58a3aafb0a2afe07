// record.rs — ActionRecord: one entry in an estate's execution audit trail.
//
// Every evaluated action produces exactly one record, authorized or not.
// Records are only ever appended; the log is exposed read-only. The single
// exception is an authorized license, which is recorded as pending before
// the registry is called and settled once with the registry's answer.

use fie_types::{Amount, AssetId, Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::registry::LicenseId;

/// What the agent was asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Free-form action category with no registry side effect.
    General { action_type: String },
    IssueLicense {
        asset_id: AssetId,
        licensee: Identity,
        royalty_bps: u16,
        duration_secs: u64,
    },
    FundProject { recipient: Identity, amount: Amount },
    DistributeRevenue { recipient: Identity, amount: Amount },
}

impl ActionKind {
    pub fn action_type(&self) -> &str {
        match self {
            ActionKind::General { action_type } => action_type,
            ActionKind::IssueLicense { .. } => "issue_license",
            ActionKind::FundProject { .. } => "fund_project",
            ActionKind::DistributeRevenue { .. } => "distribute_revenue",
        }
    }
}

/// Why an action was or was not authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Authorized,
    /// The resolver answered, below the threshold.
    LowConfidence,
    /// The resolver could not be asked or answered nonsense.
    ResolutionFailed { reason: String },
}

/// Result of the side effect an authorized action performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SideEffect {
    /// Authorized and recorded; the registry has not been called yet.
    LicensePending,
    LicenseIssued { license_id: LicenseId },
    Disbursed { recipient: Identity, amount: Amount },
    /// The registry call failed; the authorization itself still stands.
    RegistryFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub action: ActionKind,
    pub description: String,
    pub confidence_score: u8,
    pub citation_refs: Vec<String>,
    pub timestamp: Timestamp,
    pub authorized: bool,
    pub outcome: ActionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effect: Option<SideEffect>,
}

impl ActionRecord {
    pub(crate) fn new(
        action: ActionKind,
        description: String,
        confidence_score: u8,
        citation_refs: Vec<String>,
        outcome: ActionOutcome,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            action,
            description,
            confidence_score,
            citation_refs,
            timestamp,
            authorized: outcome == ActionOutcome::Authorized,
            outcome,
            side_effect: None,
        }
    }

    pub fn action_type(&self) -> &str {
        self.action.action_type()
    }

    pub fn is_pending(&self) -> bool {
        self.side_effect == Some(SideEffect::LicensePending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorized_flag_follows_outcome() {
        let rec = ActionRecord::new(
            ActionKind::General {
                action_type: "publish".into(),
            },
            "publish the memoir".into(),
            40,
            vec![],
            ActionOutcome::LowConfidence,
            Timestamp::from_secs(1),
        );
        assert!(!rec.authorized);
        assert_eq!(rec.action_type(), "publish");
    }

    #[test]
    fn record_json_is_tagged() {
        let rec = ActionRecord::new(
            ActionKind::FundProject {
                recipient: Identity::new("school").unwrap(),
                amount: 10,
            },
            "fund".into(),
            99,
            vec!["letter-3".into()],
            ActionOutcome::Authorized,
            Timestamp::from_secs(1),
        );
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"kind\":\"fund_project\""));
        assert!(json.contains("\"outcome\":\"authorized\""));
        assert!(!json.contains("side_effect"));
    }
}
