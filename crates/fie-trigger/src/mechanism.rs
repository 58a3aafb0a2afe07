// mechanism.rs — TriggerMechanism: the per-estate activation state machine.
//
//   Unconfigured → Configured(config) → Triggered { config, at }
//
// Configured → Configured (reconfiguration) is allowed until the estate
// triggers. Triggered is terminal: the timestamp exists only in that
// variant, so "has a trigger timestamp" and "is triggered" cannot disagree,
// and nothing ever rewrites it.

use std::fmt;

use fie_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::anchor::{CertificateProof, CertificateVerifier, PublicInputs};
use crate::config::{TriggerConfig, TriggerMode, TriggerParams};
use crate::error::TriggerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TriggerState {
    Unconfigured,
    Configured { config: TriggerConfig },
    Triggered { config: TriggerConfig, at: Timestamp },
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Unconfigured => write!(f, "unconfigured"),
            TriggerState::Configured { .. } => write!(f, "configured"),
            TriggerState::Triggered { .. } => write!(f, "triggered"),
        }
    }
}

/// Result of a trigger input that was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerProgress {
    /// Input recorded; `have` of `need` reached.
    Pending { have: usize, need: usize },
    /// This input fired the trigger.
    Triggered { at: Timestamp },
}

/// Activation state for one estate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMechanism {
    principal: Identity,
    state: TriggerState,
}

impl TriggerMechanism {
    pub fn new(principal: Identity) -> Self {
        Self {
            principal,
            state: TriggerState::Unconfigured,
        }
    }

    pub fn principal(&self) -> &Identity {
        &self.principal
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    pub fn mode(&self) -> TriggerMode {
        match &self.state {
            TriggerState::Unconfigured => TriggerMode::None,
            TriggerState::Configured { config } | TriggerState::Triggered { config, .. } => {
                config.mode()
            }
        }
    }

    pub fn config(&self) -> Option<&TriggerConfig> {
        match &self.state {
            TriggerState::Unconfigured => None,
            TriggerState::Configured { config } | TriggerState::Triggered { config, .. } => {
                Some(config)
            }
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.state, TriggerState::Triggered { .. })
    }

    pub fn trigger_timestamp(&self) -> Option<Timestamp> {
        match self.state {
            TriggerState::Triggered { at, .. } => Some(at),
            _ => None,
        }
    }

    /// When a deadman-configured estate becomes executable.
    pub fn deadman_due_at(&self) -> Option<Timestamp> {
        match &self.state {
            TriggerState::Configured {
                config: TriggerConfig::Deadman(d),
            } => Some(d.due_at()),
            _ => None,
        }
    }

    /// Install (or replace) the trigger configuration. Principal only.
    pub fn configure(
        &mut self,
        caller: &Identity,
        params: TriggerParams,
        now: Timestamp,
    ) -> Result<TriggerMode, TriggerError> {
        self.require_principal(caller)?;
        if self.is_triggered() {
            return Err(TriggerError::AlreadyTriggered);
        }
        let config = TriggerConfig::from_params(params, now)?;
        let mode = config.mode();
        if let TriggerState::Configured { config: previous } = &self.state {
            tracing::info!(
                principal = %self.principal,
                from = %previous.mode(),
                to = %mode,
                "trigger reconfigured"
            );
        }
        self.state = TriggerState::Configured { config };
        Ok(mode)
    }

    /// Principal proof-of-life for deadman mode.
    pub fn check_in(&mut self, caller: &Identity, now: Timestamp) -> Result<(), TriggerError> {
        self.require_principal(caller)?;
        match self.configured_mut()? {
            TriggerConfig::Deadman(d) => {
                d.last_check_in = now;
                tracing::debug!(principal = %caller, at = %now, "deadman check-in");
                Ok(())
            }
            other => Err(TriggerError::WrongMode {
                expected: TriggerMode::Deadman,
                actual: other.mode(),
            }),
        }
    }

    pub fn submit_signature(
        &mut self,
        signer: &Identity,
        now: Timestamp,
    ) -> Result<TriggerProgress, TriggerError> {
        let (reached, have, need) = match self.configured_mut()? {
            TriggerConfig::Quorum(q) => {
                let reached = q.collect(signer)?;
                (reached, q.collected.len(), q.threshold as usize)
            }
            other => {
                return Err(TriggerError::WrongMode {
                    expected: TriggerMode::Quorum,
                    actual: other.mode(),
                })
            }
        };
        tracing::debug!(principal = %self.principal, %signer, have, need, "signature accepted");
        Ok(self.fire_if(reached, now, have, need))
    }

    pub fn submit_oracle_verdict(
        &mut self,
        oracle: &Identity,
        verdict: bool,
        now: Timestamp,
    ) -> Result<TriggerProgress, TriggerError> {
        let (reached, have, need) = match self.configured_mut()? {
            TriggerConfig::Oracle(o) => {
                let reached = o.record(oracle, verdict)?;
                (reached, o.positive_verdicts(), o.required_verdicts())
            }
            other => {
                return Err(TriggerError::WrongMode {
                    expected: TriggerMode::Oracle,
                    actual: other.mode(),
                })
            }
        };
        tracing::debug!(principal = %self.principal, %oracle, verdict, have, need, "oracle verdict accepted");
        Ok(self.fire_if(reached, now, have, need))
    }

    /// Submit a certificate proof on behalf of `oracle`. The verifier's answer
    /// is recorded as that oracle's verdict.
    pub fn submit_certificate_proof(
        &mut self,
        oracle: &Identity,
        proof: &CertificateProof,
        verifier: &dyn CertificateVerifier,
        now: Timestamp,
    ) -> Result<TriggerProgress, TriggerError> {
        // Reject before running the verifier if the call cannot be accepted.
        match self.configured_mut()? {
            TriggerConfig::Oracle(o) if !o.oracles.contains(oracle) => {
                return Err(TriggerError::NotAuthorizedOracle {
                    oracle: oracle.clone(),
                })
            }
            TriggerConfig::Oracle(o) if o.verdicts.contains_key(oracle) => {
                return Err(TriggerError::DuplicateVerdict {
                    oracle: oracle.clone(),
                })
            }
            TriggerConfig::Oracle(_) => {}
            other => {
                return Err(TriggerError::WrongMode {
                    expected: TriggerMode::Oracle,
                    actual: other.mode(),
                })
            }
        }
        let inputs = PublicInputs::new(&self.principal, proof, now);
        let valid = verifier.verify(proof, &inputs);
        if !valid {
            tracing::warn!(principal = %self.principal, %oracle, "certificate proof rejected by verifier");
        }
        self.submit_oracle_verdict(oracle, valid, now)
    }

    /// Fire the deadman switch. Callable by anyone once the interval has lapsed.
    pub fn execute_deadman_switch(&mut self, now: Timestamp) -> Result<Timestamp, TriggerError> {
        match self.configured_mut()? {
            TriggerConfig::Deadman(d) if d.is_due(now) => {}
            TriggerConfig::Deadman(d) => return Err(TriggerError::TooEarly { due_at: d.due_at() }),
            other => {
                return Err(TriggerError::WrongMode {
                    expected: TriggerMode::Deadman,
                    actual: other.mode(),
                })
            }
        }
        Ok(self.fire(now))
    }

    fn require_principal(&self, caller: &Identity) -> Result<(), TriggerError> {
        if caller != &self.principal {
            return Err(TriggerError::NotPrincipal {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// The configuration, if the estate is configured and not yet triggered.
    fn configured_mut(&mut self) -> Result<&mut TriggerConfig, TriggerError> {
        match &mut self.state {
            TriggerState::Unconfigured => Err(TriggerError::NotConfigured),
            TriggerState::Triggered { .. } => Err(TriggerError::AlreadyTriggered),
            TriggerState::Configured { config } => Ok(config),
        }
    }

    fn fire_if(&mut self, reached: bool, now: Timestamp, have: usize, need: usize) -> TriggerProgress {
        if reached {
            TriggerProgress::Triggered { at: self.fire(now) }
        } else {
            TriggerProgress::Pending { have, need }
        }
    }

    /// Configured → Triggered; the only place the trigger timestamp is set.
    /// An already-triggered estate keeps its original timestamp.
    fn fire(&mut self, now: Timestamp) -> Timestamp {
        let previous = std::mem::replace(&mut self.state, TriggerState::Unconfigured);
        self.state = match previous {
            TriggerState::Configured { config } => {
                tracing::info!(principal = %self.principal, mode = %config.mode(), at = %now, "estate triggered");
                TriggerState::Triggered { config, at: now }
            }
            other => other,
        };
        self.trigger_timestamp().unwrap_or(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fie_types::SECONDS_PER_DAY;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    fn t(secs: u64) -> Timestamp {
        Timestamp::from_secs(secs)
    }

    fn deadman(interval: u64, at: u64) -> TriggerMechanism {
        let mut m = TriggerMechanism::new(id("alice"));
        m.configure(
            &id("alice"),
            TriggerParams::Deadman {
                interval_seconds: interval,
            },
            t(at),
        )
        .unwrap();
        m
    }

    fn quorum(threshold: u32) -> TriggerMechanism {
        let mut m = TriggerMechanism::new(id("alice"));
        m.configure(
            &id("alice"),
            TriggerParams::Quorum {
                signers: vec![id("s1"), id("s2"), id("s3")],
                threshold,
            },
            t(0),
        )
        .unwrap();
        m
    }

    fn oracles() -> TriggerMechanism {
        let mut m = TriggerMechanism::new(id("alice"));
        m.configure(
            &id("alice"),
            TriggerParams::Oracle {
                oracles: vec![id("o1"), id("o2"), id("o3")],
            },
            t(0),
        )
        .unwrap();
        m
    }

    #[test]
    fn new_mechanism_is_unconfigured() {
        let m = TriggerMechanism::new(id("alice"));
        assert_eq!(m.mode(), TriggerMode::None);
        assert!(!m.is_triggered());
        assert!(m.trigger_timestamp().is_none());
    }

    #[test]
    fn only_principal_may_configure_or_check_in() {
        let mut m = TriggerMechanism::new(id("alice"));
        let err = m
            .configure(
                &id("mallory"),
                TriggerParams::Deadman {
                    interval_seconds: 10,
                },
                t(0),
            )
            .unwrap_err();
        assert!(matches!(err, TriggerError::NotPrincipal { .. }));

        let mut m = deadman(10, 0);
        assert!(matches!(
            m.check_in(&id("mallory"), t(5)),
            Err(TriggerError::NotPrincipal { .. })
        ));
    }

    #[test]
    fn reconfiguration_replaces_mode_before_trigger() {
        let mut m = deadman(10, 0);
        m.configure(
            &id("alice"),
            TriggerParams::Oracle {
                oracles: vec![id("o1")],
            },
            t(1),
        )
        .unwrap();
        assert_eq!(m.mode(), TriggerMode::Oracle);
    }

    #[test]
    fn invalid_config_leaves_state_untouched() {
        let mut m = deadman(10, 0);
        let before = m.clone();
        let err = m
            .configure(
                &id("alice"),
                TriggerParams::Quorum {
                    signers: vec![id("s1")],
                    threshold: 2,
                },
                t(1),
            )
            .unwrap_err();
        assert!(matches!(err, TriggerError::InvalidConfig { .. }));
        assert_eq!(m, before);
    }

    #[test]
    fn deadman_fires_once_after_interval() {
        let interval = 90 * SECONDS_PER_DAY;
        let mut m = deadman(interval, 1_000);

        let err = m.execute_deadman_switch(t(1_000 + interval)).unwrap_err();
        assert_eq!(
            err,
            TriggerError::TooEarly {
                due_at: t(1_000 + interval + 1)
            }
        );

        let at = m.execute_deadman_switch(t(1_000 + interval + 1)).unwrap();
        assert_eq!(m.trigger_timestamp(), Some(at));

        assert_eq!(
            m.execute_deadman_switch(t(1_000 + 2 * interval)),
            Err(TriggerError::AlreadyTriggered)
        );
        assert_eq!(m.trigger_timestamp(), Some(at));
    }

    #[test]
    fn check_in_postpones_deadman() {
        let mut m = deadman(100, 0);
        m.check_in(&id("alice"), t(90)).unwrap();
        assert!(matches!(
            m.execute_deadman_switch(t(150)),
            Err(TriggerError::TooEarly { .. })
        ));
        assert_eq!(m.deadman_due_at(), Some(t(191)));
        assert!(m.execute_deadman_switch(t(191)).is_ok());
    }

    #[test]
    fn check_in_requires_deadman_mode() {
        let mut m = quorum(2);
        assert_eq!(
            m.check_in(&id("alice"), t(1)),
            Err(TriggerError::WrongMode {
                expected: TriggerMode::Deadman,
                actual: TriggerMode::Quorum
            })
        );
        let mut unconfigured = TriggerMechanism::new(id("alice"));
        assert_eq!(
            unconfigured.check_in(&id("alice"), t(1)),
            Err(TriggerError::NotConfigured)
        );
    }

    #[test]
    fn quorum_two_of_three_triggers() {
        let mut m = quorum(2);
        assert_eq!(
            m.submit_signature(&id("s1"), t(10)).unwrap(),
            TriggerProgress::Pending { have: 1, need: 2 }
        );
        assert_eq!(
            m.submit_signature(&id("s3"), t(20)).unwrap(),
            TriggerProgress::Triggered { at: t(20) }
        );
        assert_eq!(m.trigger_timestamp(), Some(t(20)));
        assert_eq!(
            m.submit_signature(&id("s2"), t(30)),
            Err(TriggerError::AlreadyTriggered)
        );
        assert_eq!(m.trigger_timestamp(), Some(t(20)));
    }

    #[test]
    fn duplicate_signature_counts_once() {
        let mut m = quorum(2);
        m.submit_signature(&id("s1"), t(10)).unwrap();
        assert!(matches!(
            m.submit_signature(&id("s1"), t(11)),
            Err(TriggerError::DuplicateSignature { .. })
        ));
        assert!(!m.is_triggered());
    }

    #[test]
    fn unknown_signer_is_rejected() {
        let mut m = quorum(1);
        assert!(matches!(
            m.submit_signature(&id("mallory"), t(1)),
            Err(TriggerError::NotAuthorizedSigner { .. })
        ));
        assert!(!m.is_triggered());
    }

    #[test]
    fn oracle_majority_triggers_on_first_satisfying_verdict() {
        let mut m = oracles();
        assert_eq!(
            m.submit_oracle_verdict(&id("o1"), true, t(5)).unwrap(),
            TriggerProgress::Pending { have: 1, need: 2 }
        );
        m.submit_oracle_verdict(&id("o2"), false, t(6)).unwrap();
        assert_eq!(
            m.submit_oracle_verdict(&id("o3"), true, t(7)).unwrap(),
            TriggerProgress::Triggered { at: t(7) }
        );
    }

    #[test]
    fn oracle_rejects_strangers_and_repeats() {
        let mut m = oracles();
        assert!(matches!(
            m.submit_oracle_verdict(&id("o9"), true, t(1)),
            Err(TriggerError::NotAuthorizedOracle { .. })
        ));
        m.submit_oracle_verdict(&id("o1"), false, t(1)).unwrap();
        assert!(matches!(
            m.submit_oracle_verdict(&id("o1"), true, t(2)),
            Err(TriggerError::DuplicateVerdict { .. })
        ));
    }

    #[test]
    fn certificate_proof_becomes_verdict() {
        let mut m = oracles();
        let accept = |_: &CertificateProof, inputs: &PublicInputs| !inputs.creator_commitment.is_empty();
        let reject = |_: &CertificateProof, _: &PublicInputs| false;
        let proof = CertificateProof {
            certificate_hash: "cert".into(),
            proof: "zk".into(),
        };

        m.submit_certificate_proof(&id("o1"), &proof, &reject, t(1))
            .unwrap();
        m.submit_certificate_proof(&id("o2"), &proof, &accept, t(2))
            .unwrap();
        let progress = m
            .submit_certificate_proof(&id("o3"), &proof, &accept, t(3))
            .unwrap();
        assert_eq!(progress, TriggerProgress::Triggered { at: t(3) });
    }

    #[test]
    fn certificate_from_unregistered_oracle_skips_verifier() {
        let mut m = oracles();
        let called = std::cell::Cell::new(false);
        let verifier = |_: &CertificateProof, _: &PublicInputs| {
            called.set(true);
            true
        };
        let proof = CertificateProof {
            certificate_hash: "cert".into(),
            proof: "zk".into(),
        };
        assert!(m
            .submit_certificate_proof(&id("nobody"), &proof, &verifier, t(1))
            .is_err());
        assert!(!called.get());
    }

    #[test]
    fn configure_after_trigger_fails() {
        let mut m = quorum(1);
        m.submit_signature(&id("s2"), t(3)).unwrap();
        assert_eq!(
            m.configure(
                &id("alice"),
                TriggerParams::Deadman {
                    interval_seconds: 1
                },
                t(4)
            ),
            Err(TriggerError::AlreadyTriggered)
        );
        assert_eq!(m.mode(), TriggerMode::Quorum);
    }

    #[test]
    fn state_serialization_round_trip() {
        let mut m = quorum(2);
        m.submit_signature(&id("s1"), t(10)).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let restored: TriggerMechanism = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, m);
        assert_eq!(m.state().to_string(), "configured");
    }
}
