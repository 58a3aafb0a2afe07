// config.rs — Trigger modes and their per-mode state.
//
// The three activation modes are mutually exclusive variants of one enum,
// so an estate can never hold, say, a quorum and an oracle configuration at
// the same time. Each variant owns the mutable bookkeeping its mode needs
// (last check-in, collected signatures, oracle verdicts).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fie_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::TriggerError;

/// Which activation mode an estate uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    None,
    Deadman,
    Quorum,
    Oracle,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::None => write!(f, "none"),
            TriggerMode::Deadman => write!(f, "deadman"),
            TriggerMode::Quorum => write!(f, "quorum"),
            TriggerMode::Oracle => write!(f, "oracle"),
        }
    }
}

/// Caller-supplied parameters for `configure`. Validated into a [`TriggerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerParams {
    Deadman { interval_seconds: u64 },
    Quorum { signers: Vec<Identity>, threshold: u32 },
    Oracle { oracles: Vec<Identity> },
}

/// A validated trigger configuration plus its accumulated inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TriggerConfig {
    Deadman(DeadmanConfig),
    Quorum(QuorumConfig),
    Oracle(OracleConfig),
}

impl TriggerConfig {
    /// Validate `params`. Deadman configurations start their interval at `now`.
    pub fn from_params(params: TriggerParams, now: Timestamp) -> Result<Self, TriggerError> {
        match params {
            TriggerParams::Deadman { interval_seconds } => {
                if interval_seconds == 0 {
                    return Err(invalid("deadman interval must be greater than zero"));
                }
                Ok(TriggerConfig::Deadman(DeadmanConfig {
                    interval_seconds,
                    last_check_in: now,
                }))
            }
            TriggerParams::Quorum { signers, threshold } => {
                let signers: BTreeSet<Identity> = signers.into_iter().collect();
                if signers.is_empty() {
                    return Err(invalid("quorum signer set must not be empty"));
                }
                // Threshold is compared against distinct signers.
                let distinct = u32::try_from(signers.len()).unwrap_or(u32::MAX);
                if threshold == 0 || threshold > distinct {
                    return Err(invalid(format!(
                        "quorum threshold {threshold} must be between 1 and {distinct}"
                    )));
                }
                Ok(TriggerConfig::Quorum(QuorumConfig {
                    signers,
                    threshold,
                    collected: BTreeSet::new(),
                }))
            }
            TriggerParams::Oracle { oracles } => {
                let oracles: BTreeSet<Identity> = oracles.into_iter().collect();
                if oracles.is_empty() {
                    return Err(invalid("oracle set must not be empty"));
                }
                Ok(TriggerConfig::Oracle(OracleConfig {
                    oracles,
                    verdicts: BTreeMap::new(),
                }))
            }
        }
    }

    pub fn mode(&self) -> TriggerMode {
        match self {
            TriggerConfig::Deadman(_) => TriggerMode::Deadman,
            TriggerConfig::Quorum(_) => TriggerMode::Quorum,
            TriggerConfig::Oracle(_) => TriggerMode::Oracle,
        }
    }
}

fn invalid(reason: impl Into<String>) -> TriggerError {
    TriggerError::InvalidConfig {
        reason: reason.into(),
    }
}

/// Deadman switch: fires once the principal has been silent for longer
/// than `interval_seconds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadmanConfig {
    pub interval_seconds: u64,
    pub last_check_in: Timestamp,
}

impl DeadmanConfig {
    /// Strictly more than `interval_seconds` must have passed.
    pub fn is_due(&self, now: Timestamp) -> bool {
        now.saturating_since(self.last_check_in) > self.interval_seconds
    }

    /// First instant at which the switch may be executed.
    pub fn due_at(&self) -> Timestamp {
        self.last_check_in
            .checked_add(self.interval_seconds)
            .and_then(|t| t.checked_add(1))
            .unwrap_or(Timestamp::from_secs(u64::MAX))
    }
}

/// M-of-N signature quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumConfig {
    pub signers: BTreeSet<Identity>,
    pub threshold: u32,
    pub collected: BTreeSet<Identity>,
}

impl QuorumConfig {
    /// Record a signature. Returns whether the threshold is now met.
    pub(crate) fn collect(&mut self, signer: &Identity) -> Result<bool, TriggerError> {
        if !self.signers.contains(signer) {
            return Err(TriggerError::NotAuthorizedSigner {
                signer: signer.clone(),
            });
        }
        if !self.collected.insert(signer.clone()) {
            return Err(TriggerError::DuplicateSignature {
                signer: signer.clone(),
            });
        }
        Ok(self.is_met())
    }

    pub fn is_met(&self) -> bool {
        self.collected.len() >= self.threshold as usize
    }
}

/// Registered oracles and the verdicts they have submitted.
///
/// Policy: the estate triggers once a strict majority of the *registered*
/// oracles have reported a positive verdict. Each oracle reports once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub oracles: BTreeSet<Identity>,
    pub verdicts: BTreeMap<Identity, bool>,
}

impl OracleConfig {
    /// Record a verdict. Returns whether the majority policy now holds.
    pub(crate) fn record(&mut self, oracle: &Identity, verdict: bool) -> Result<bool, TriggerError> {
        if !self.oracles.contains(oracle) {
            return Err(TriggerError::NotAuthorizedOracle {
                oracle: oracle.clone(),
            });
        }
        if self.verdicts.contains_key(oracle) {
            return Err(TriggerError::DuplicateVerdict {
                oracle: oracle.clone(),
            });
        }
        self.verdicts.insert(oracle.clone(), verdict);
        Ok(self.majority_reached())
    }

    pub fn positive_verdicts(&self) -> usize {
        self.verdicts.values().filter(|v| **v).count()
    }

    /// Smallest number of positive verdicts that forms a strict majority.
    pub fn required_verdicts(&self) -> usize {
        self.oracles.len() / 2 + 1
    }

    pub fn majority_reached(&self) -> bool {
        self.positive_verdicts() >= self.required_verdicts()
    }
}
