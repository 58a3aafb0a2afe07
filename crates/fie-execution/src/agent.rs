// agent.rs — ExecutionState: the per-estate execution agent.
//
//   Inactive → Active → SunsetRequested
//
// While Active and inside the execution window, every request that survives
// parameter validation is scored by the corpus resolver and recorded. Only a
// confidence of at least CONFIDENCE_THRESHOLD authorizes the action; anything
// else (including a resolver that cannot answer) is recorded as unauthorized
// and performs no side effect. Execution is bounded by the sunset horizon.
//
// Authorized licenses are recorded as pending. `settle_pending` performs the
// registry call later, so the record can be persisted before the registry
// is touched.

use std::fmt;

use fie_sunset::{is_sunset_due, sunset_due_at};
use fie_trigger::TriggerMechanism;
use fie_types::{Amount, AssetId, Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;
use crate::record::{ActionKind, ActionOutcome, ActionRecord, SideEffect};
use crate::registry::AssetRegistry;
use crate::resolver::{resolve_checked, CorpusRef, CorpusResolver};

/// Minimum resolver confidence (inclusive) that authorizes an action.
pub const CONFIDENCE_THRESHOLD: u8 = 95;

/// 100% in basis points.
pub const MAX_ROYALTY_BPS: u16 = 10_000;

/// Action categories the agent refuses outright, whatever the confidence.
pub const PROHIBITED_ACTION_TYPES: &[&str] = &[
    "electoral_activity",
    "political_advocacy",
    "lobbying",
    "policy_influence",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    #[default]
    Inactive,
    Active,
    SunsetRequested,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPhase::Inactive => write!(f, "inactive"),
            ExecutionPhase::Active => write!(f, "active"),
            ExecutionPhase::SunsetRequested => write!(f, "sunset_requested"),
        }
    }
}

/// Resolver and time for one execution call.
pub struct ExecutionContext<'a> {
    pub resolver: &'a dyn CorpusResolver,
    pub now: Timestamp,
}

/// Terms for [`ExecutionState::issue_license`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseTerms {
    pub asset_id: AssetId,
    pub licensee: Identity,
    pub royalty_bps: u16,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionState {
    phase: ExecutionPhase,
    /// Copied from the trigger at activation; bounds the execution period.
    trigger_timestamp: Option<Timestamp>,
    action_log: Vec<ActionRecord>,
    total_distributed: Amount,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == ExecutionPhase::Active
    }

    pub fn action_log(&self) -> &[ActionRecord] {
        &self.action_log
    }

    pub fn total_distributed(&self) -> Amount {
        self.total_distributed
    }

    pub fn trigger_timestamp(&self) -> Option<Timestamp> {
        self.trigger_timestamp
    }

    /// Inactive → Active. The window closes at the sunset horizon, so an
    /// estate whose horizon has passed can no longer be activated.
    pub fn activate(
        &mut self,
        trigger: &TriggerMechanism,
        now: Timestamp,
    ) -> Result<(), ExecutionError> {
        let at = trigger.trigger_timestamp().ok_or(ExecutionError::NotTriggered)?;
        if self.phase != ExecutionPhase::Inactive {
            return Err(ExecutionError::AlreadyActive);
        }
        if is_sunset_due(at, now) {
            return Err(ExecutionError::ExecutionPeriodEnded {
                ended_at: sunset_due_at(at),
            });
        }
        self.phase = ExecutionPhase::Active;
        self.trigger_timestamp = Some(at);
        tracing::info!(principal = %trigger.principal(), trigger = %at, "execution activated");
        Ok(())
    }

    /// Evaluate a free-form action against the corpus.
    pub fn execute_action(
        &mut self,
        ctx: &ExecutionContext<'_>,
        action_type: &str,
        goal_description: &str,
        corpus: &CorpusRef,
    ) -> Result<ActionRecord, ExecutionError> {
        self.require_active(ctx.now)?;
        let action_type = action_type.trim();
        if action_type.is_empty() {
            return Err(invalid("action type must not be empty"));
        }
        let normalized = action_type.to_ascii_lowercase();
        if PROHIBITED_ACTION_TYPES.contains(&normalized.as_str()) {
            tracing::warn!(category = %normalized, "prohibited action refused");
            return Err(ExecutionError::ProhibitedAction {
                category: normalized,
            });
        }
        let kind = ActionKind::General {
            action_type: action_type.to_string(),
        };
        Ok(self.run(ctx, kind, goal_description, corpus))
    }

    /// Evaluate a license. If authorized, the record carries a pending side
    /// effect until [`settle_pending`](Self::settle_pending) is called.
    pub fn issue_license(
        &mut self,
        ctx: &ExecutionContext<'_>,
        terms: LicenseTerms,
        goal_description: &str,
        corpus: &CorpusRef,
    ) -> Result<ActionRecord, ExecutionError> {
        self.require_active(ctx.now)?;
        if terms.royalty_bps > MAX_ROYALTY_BPS {
            return Err(invalid(format!(
                "royalty {} bps exceeds {MAX_ROYALTY_BPS}",
                terms.royalty_bps
            )));
        }
        if terms.duration_secs == 0 {
            return Err(invalid("license duration must be greater than zero"));
        }
        let kind = ActionKind::IssueLicense {
            asset_id: terms.asset_id,
            licensee: terms.licensee,
            royalty_bps: terms.royalty_bps,
            duration_secs: terms.duration_secs,
        };
        Ok(self.run(ctx, kind, goal_description, corpus))
    }

    pub fn fund_project(
        &mut self,
        ctx: &ExecutionContext<'_>,
        recipient: Identity,
        amount: Amount,
        goal_description: &str,
        corpus: &CorpusRef,
    ) -> Result<ActionRecord, ExecutionError> {
        self.require_active(ctx.now)?;
        self.validate_amount(amount)?;
        let kind = ActionKind::FundProject { recipient, amount };
        Ok(self.run(ctx, kind, goal_description, corpus))
    }

    pub fn distribute_revenue(
        &mut self,
        ctx: &ExecutionContext<'_>,
        recipient: Identity,
        amount: Amount,
        goal_description: &str,
        corpus: &CorpusRef,
    ) -> Result<ActionRecord, ExecutionError> {
        self.require_active(ctx.now)?;
        self.validate_amount(amount)?;
        let kind = ActionKind::DistributeRevenue { recipient, amount };
        Ok(self.run(ctx, kind, goal_description, corpus))
    }

    /// Perform the registry call for the latest record if it is a pending
    /// license, and settle that record with the outcome. Returns the settled
    /// record, or `None` when nothing was pending.
    ///
    /// Only the latest record can be pending: a registry outcome that was
    /// never recorded stays pending for good rather than being retried.
    pub fn settle_pending(&mut self, registry: &mut dyn AssetRegistry) -> Option<ActionRecord> {
        let record = self.action_log.last_mut().filter(|r| r.is_pending())?;
        let ActionKind::IssueLicense {
            asset_id,
            licensee,
            royalty_bps,
            duration_secs,
        } = &record.action
        else {
            return None;
        };
        let effect = match registry.license(asset_id, licensee, *royalty_bps, *duration_secs) {
            Ok(license_id) => SideEffect::LicenseIssued { license_id },
            Err(e) => {
                tracing::warn!(asset = %asset_id, error = %e, "registry license call failed");
                SideEffect::RegistryFailed {
                    reason: e.to_string(),
                }
            }
        };
        record.side_effect = Some(effect);
        Some(record.clone())
    }

    /// Active → SunsetRequested, once the sunset horizon counted from the
    /// recorded trigger timestamp has elapsed at `now`.
    pub fn activate_sunset(&mut self, now: Timestamp) -> Result<(), ExecutionError> {
        if self.phase != ExecutionPhase::Active {
            return Err(ExecutionError::NotActive { phase: self.phase });
        }
        let trigger = self.trigger_timestamp.ok_or(ExecutionError::NotTriggered)?;
        if !is_sunset_due(trigger, now) {
            return Err(ExecutionError::SunsetNotDue {
                due_at: sunset_due_at(trigger),
            });
        }
        self.phase = ExecutionPhase::SunsetRequested;
        tracing::info!(at = %now, "execution handed over to sunset");
        Ok(())
    }

    fn validate_amount(&self, amount: Amount) -> Result<(), ExecutionError> {
        if amount == 0 {
            return Err(invalid("amount must be greater than zero"));
        }
        if self.total_distributed.checked_add(amount).is_none() {
            return Err(invalid("amount would overflow the distributed total"));
        }
        Ok(())
    }

    fn require_active(&self, now: Timestamp) -> Result<Timestamp, ExecutionError> {
        if self.phase != ExecutionPhase::Active {
            return Err(ExecutionError::NotActive { phase: self.phase });
        }
        let trigger = self.trigger_timestamp.ok_or(ExecutionError::NotTriggered)?;
        if is_sunset_due(trigger, now) {
            return Err(ExecutionError::ExecutionPeriodEnded {
                ended_at: sunset_due_at(trigger),
            });
        }
        Ok(trigger)
    }

    /// Resolve, gate and record. Callers have already checked the window.
    fn run(
        &mut self,
        ctx: &ExecutionContext<'_>,
        kind: ActionKind,
        goal_description: &str,
        corpus: &CorpusRef,
    ) -> ActionRecord {
        let (confidence, citations, outcome) =
            match resolve_checked(ctx.resolver, goal_description, corpus) {
                Ok(r) if r.confidence >= CONFIDENCE_THRESHOLD => {
                    (r.confidence, r.citations, ActionOutcome::Authorized)
                }
                Ok(r) => (r.confidence, r.citations, ActionOutcome::LowConfidence),
                Err(e) => (
                    0,
                    Vec::new(),
                    ActionOutcome::ResolutionFailed {
                        reason: e.to_string(),
                    },
                ),
            };

        let mut record = ActionRecord::new(
            kind,
            goal_description.to_string(),
            confidence,
            citations,
            outcome,
            ctx.now,
        );

        if record.authorized {
            record.side_effect = self.apply(&record.action);
            tracing::info!(
                action = record.action_type(),
                confidence,
                %corpus,
                "action authorized"
            );
        } else {
            tracing::warn!(
                action = record.action_type(),
                confidence,
                outcome = ?record.outcome,
                "action not authorized"
            );
        }

        self.action_log.push(record.clone());
        record
    }

    /// Bookkeeping for an authorized action. Registry work is deferred.
    fn apply(&mut self, action: &ActionKind) -> Option<SideEffect> {
        match action {
            ActionKind::General { .. } => None,
            ActionKind::IssueLicense { .. } => Some(SideEffect::LicensePending),
            ActionKind::FundProject { recipient, amount }
            | ActionKind::DistributeRevenue { recipient, amount } => {
                // Checked during validation; saturate rather than panic.
                self.total_distributed = self.total_distributed.saturating_add(*amount);
                Some(SideEffect::Disbursed {
                    recipient: recipient.clone(),
                    amount: *amount,
                })
            }
        }
    }
}

fn invalid(reason: impl Into<String>) -> ExecutionError {
    ExecutionError::InvalidParameters {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRegistry, RegistryError};
    use crate::resolver::{Resolution, ResolveError, StaticResolver};
    use fie_sunset::SUNSET_DURATION;
    use fie_trigger::TriggerParams;
    use std::cell::Cell;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn corpus() -> CorpusRef {
        CorpusRef("corpus-2024".into())
    }

    fn ctx(resolver: &dyn CorpusResolver, now: u64) -> ExecutionContext<'_> {
        ExecutionContext {
            resolver,
            now: t(now),
        }
    }

    fn triggered_at(at: u64) -> TriggerMechanism {
        let mut m = TriggerMechanism::new(id("alice"));
        m.configure(
            &id("alice"),
            TriggerParams::Quorum {
                signers: vec![id("s1")],
                threshold: 1,
            },
            t(0),
        )
        .unwrap();
        m.submit_signature(&id("s1"), t(at)).unwrap();
        m
    }

    fn active() -> ExecutionState {
        let mut s = ExecutionState::new();
        s.activate(&triggered_at(1_000), t(1_000)).unwrap();
        s
    }

    #[test]
    fn activation_requires_trigger() {
        let mut s = ExecutionState::new();
        let untriggered = TriggerMechanism::new(id("alice"));
        assert_eq!(
            s.activate(&untriggered, t(1_000)),
            Err(ExecutionError::NotTriggered)
        );
        assert_eq!(s.phase(), ExecutionPhase::Inactive);
    }

    #[test]
    fn activation_is_guarded() {
        let mut s = active();
        assert_eq!(
            s.activate(&triggered_at(1_000), t(2_000)),
            Err(ExecutionError::AlreadyActive)
        );
        assert_eq!(s.trigger_timestamp(), Some(t(1_000)));
    }

    #[test]
    fn activation_closes_at_the_horizon() {
        let trigger = triggered_at(1_000);
        let mut late = ExecutionState::new();
        assert_eq!(
            late.activate(&trigger, t(1_000 + SUNSET_DURATION)),
            Err(ExecutionError::ExecutionPeriodEnded {
                ended_at: t(1_000 + SUNSET_DURATION)
            })
        );
        assert_eq!(late.phase(), ExecutionPhase::Inactive);

        let mut just_in_time = ExecutionState::new();
        just_in_time
            .activate(&trigger, t(1_000 + SUNSET_DURATION - 1))
            .unwrap();
        assert!(just_in_time.is_active());
    }

    #[test]
    fn confidence_gate_is_inclusive_at_95() {
        let mut s = active();

        let low = StaticResolver::new(94, vec!["diary".into()]);
        let rec = s
            .execute_action(&ctx(&low, 2_000), "publish", "publish letters", &corpus())
            .unwrap();
        assert!(!rec.authorized);
        assert_eq!(rec.outcome, ActionOutcome::LowConfidence);
        assert_eq!(rec.confidence_score, 94);

        let high = StaticResolver::new(95, vec!["diary".into()]);
        let rec = s
            .execute_action(&ctx(&high, 2_001), "publish", "publish letters", &corpus())
            .unwrap();
        assert!(rec.authorized);
        assert_eq!(rec.citation_refs, vec!["diary".to_string()]);

        assert_eq!(s.action_log().len(), 2);
    }

    #[test]
    fn low_confidence_license_leaves_nothing_to_settle() {
        let mut s = active();
        let mut registry = InMemoryRegistry::new();
        let asset = registry.mint(&id("alice"), "ipfs://song", "h").unwrap();
        let low = StaticResolver::new(94, vec![]);
        let terms = LicenseTerms {
            asset_id: asset,
            licensee: id("studio"),
            royalty_bps: 500,
            duration_secs: 3_600,
        };
        let rec = s
            .issue_license(&ctx(&low, 2_000), terms, "license the song", &corpus())
            .unwrap();
        assert!(!rec.authorized);
        assert!(rec.side_effect.is_none());
        assert!(s.settle_pending(&mut registry).is_none());
        assert!(registry.licenses().is_empty());
    }

    #[test]
    fn authorized_license_is_pending_until_settled() {
        let mut s = active();
        let mut registry = InMemoryRegistry::new();
        let asset = registry.mint(&id("alice"), "ipfs://song", "h").unwrap();
        let high = StaticResolver::new(99, vec![]);
        let terms = LicenseTerms {
            asset_id: asset.clone(),
            licensee: id("studio"),
            royalty_bps: 10_000,
            duration_secs: 3_600,
        };
        let rec = s
            .issue_license(&ctx(&high, 2_000), terms, "license the song", &corpus())
            .unwrap();
        assert!(rec.is_pending());
        assert!(registry.licenses().is_empty());

        let settled = s.settle_pending(&mut registry).unwrap();
        assert!(matches!(settled.side_effect, Some(SideEffect::LicenseIssued { .. })));
        assert_eq!(s.action_log().last(), Some(&settled));
        assert_eq!(registry.licenses().len(), 1);
        assert_eq!(registry.licenses()[0].asset, asset);

        // Settling is once only.
        assert!(s.settle_pending(&mut registry).is_none());
        assert_eq!(registry.licenses().len(), 1);
    }

    #[test]
    fn registry_failure_is_recorded_not_raised() {
        let mut s = active();
        let mut registry = InMemoryRegistry::new();
        let high = StaticResolver::new(99, vec![]);
        let terms = LicenseTerms {
            asset_id: AssetId("missing".into()),
            licensee: id("studio"),
            royalty_bps: 1,
            duration_secs: 1,
        };
        let rec = s
            .issue_license(&ctx(&high, 2_000), terms, "license", &corpus())
            .unwrap();
        assert!(rec.authorized);
        let settled = s.settle_pending(&mut registry).unwrap();
        assert_eq!(
            settled.side_effect,
            Some(SideEffect::RegistryFailed {
                reason: RegistryError::UnknownAsset(AssetId("missing".into())).to_string()
            })
        );
    }

    #[test]
    fn malformed_parameters_skip_the_resolver() {
        let mut s = active();
        let calls = Cell::new(0);
        let counting = |_: &str, _: &CorpusRef| -> Result<Resolution, ResolveError> {
            calls.set(calls.get() + 1);
            Ok(Resolution {
                confidence: 100,
                citations: vec![],
            })
        };
        let ctx = ctx(&counting, 2_000);

        let terms = LicenseTerms {
            asset_id: AssetId("a".into()),
            licensee: id("studio"),
            royalty_bps: 10_001,
            duration_secs: 10,
        };
        assert!(matches!(
            s.issue_license(&ctx, terms.clone(), "g", &corpus()),
            Err(ExecutionError::InvalidParameters { .. })
        ));
        let zero_duration = LicenseTerms {
            royalty_bps: 10,
            duration_secs: 0,
            ..terms
        };
        assert!(s.issue_license(&ctx, zero_duration, "g", &corpus()).is_err());
        assert!(s.fund_project(&ctx, id("school"), 0, "g", &corpus()).is_err());
        assert!(s.distribute_revenue(&ctx, id("heir"), 0, "g", &corpus()).is_err());
        assert!(s.execute_action(&ctx, "  ", "g", &corpus()).is_err());

        assert_eq!(calls.get(), 0);
        assert!(s.action_log().is_empty());
    }

    #[test]
    fn resolver_failure_is_distinct_from_low_confidence() {
        let mut s = active();
        let down = |_: &str, _: &CorpusRef| -> Result<Resolution, ResolveError> {
            Err(ResolveError::Unavailable("timeout".into()))
        };
        let rec = s
            .fund_project(&ctx(&down, 2_000), id("school"), 500, "fund the school", &corpus())
            .unwrap();
        assert!(!rec.authorized);
        assert!(matches!(rec.outcome, ActionOutcome::ResolutionFailed { .. }));
        assert_eq!(s.total_distributed(), 0);
    }

    #[test]
    fn authorized_disbursements_accumulate() {
        let mut s = active();
        let high = StaticResolver::new(97, vec![]);
        let ctx = ctx(&high, 2_000);
        s.fund_project(&ctx, id("school"), 300, "fund", &corpus()).unwrap();
        s.distribute_revenue(&ctx, id("heir"), 200, "share", &corpus()).unwrap();
        assert_eq!(s.total_distributed(), 500);
    }

    #[test]
    fn prohibited_categories_are_refused() {
        let mut s = active();
        let high = StaticResolver::new(100, vec![]);
        let err = s
            .execute_action(&ctx(&high, 2_000), "Lobbying", "lobby for a bill", &corpus())
            .unwrap_err();
        assert_eq!(
            err,
            ExecutionError::ProhibitedAction {
                category: "lobbying".into()
            }
        );
        assert!(s.action_log().is_empty());
    }

    #[test]
    fn phase_is_checked_before_any_validation() {
        let mut s = ExecutionState::new();
        let high = StaticResolver::new(100, vec![]);
        let ctx = ctx(&high, 2_000);
        let inactive: Result<ActionRecord, ExecutionError> = Err(ExecutionError::NotActive {
            phase: ExecutionPhase::Inactive,
        });
        assert_eq!(s.execute_action(&ctx, "publish", "g", &corpus()), inactive);
        assert_eq!(s.execute_action(&ctx, "", "g", &corpus()), inactive);
        assert_eq!(s.execute_action(&ctx, "lobbying", "g", &corpus()), inactive);
        assert_eq!(s.fund_project(&ctx, id("school"), 0, "g", &corpus()), inactive);
    }

    #[test]
    fn execution_stops_at_the_horizon() {
        let mut s = active();
        let high = StaticResolver::new(100, vec![]);
        let ctx = ctx(&high, 1_000 + SUNSET_DURATION);
        assert!(matches!(
            s.execute_action(&ctx, "publish", "g", &corpus()),
            Err(ExecutionError::ExecutionPeriodEnded { .. })
        ));
        assert!(matches!(
            s.execute_action(&ctx, "", "g", &corpus()),
            Err(ExecutionError::ExecutionPeriodEnded { .. })
        ));
    }

    #[test]
    fn sunset_request_waits_for_horizon() {
        let mut s = active();
        assert_eq!(
            s.activate_sunset(t(1_000 + SUNSET_DURATION - 1)),
            Err(ExecutionError::SunsetNotDue {
                due_at: t(1_000 + SUNSET_DURATION)
            })
        );
        s.activate_sunset(t(1_000 + SUNSET_DURATION)).unwrap();
        assert_eq!(s.phase(), ExecutionPhase::SunsetRequested);
        assert!(matches!(
            s.activate_sunset(t(1_000 + SUNSET_DURATION + 1)),
            Err(ExecutionError::NotActive { .. })
        ));
    }

    #[test]
    fn sunset_request_needs_an_activated_agent() {
        let mut s = ExecutionState::new();
        assert_eq!(
            s.activate_sunset(t(u64::MAX)),
            Err(ExecutionError::NotActive {
                phase: ExecutionPhase::Inactive
            })
        );
    }
}
