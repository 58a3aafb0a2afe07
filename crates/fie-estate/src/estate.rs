// estate.rs — Estate: the persisted unit, one per principal.
//
// The three state machines are kept side by side and only ever advanced
// through the Executor, which hands each of them the same `now`.

use fie_execution::ExecutionState;
use fie_sunset::{is_sunset_due, SunsetState};
use fie_trigger::TriggerMechanism;
use fie_types::{Identity, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estate {
    pub principal: Identity,
    pub trigger: TriggerMechanism,
    pub execution: ExecutionState,
    pub sunset: SunsetState,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Estate {
    pub fn new(principal: Identity, now: Timestamp) -> Self {
        Self {
            trigger: TriggerMechanism::new(principal.clone()),
            execution: ExecutionState::new(),
            sunset: SunsetState::new(),
            principal,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn trigger_timestamp(&self) -> Option<Timestamp> {
        self.trigger.trigger_timestamp()
    }

    /// `false` until the estate has triggered.
    pub fn is_sunset_due(&self, now: Timestamp) -> bool {
        self.trigger_timestamp()
            .is_some_and(|at| is_sunset_due(at, now))
    }

    /// One-line status for listings.
    pub fn summary(&self) -> String {
        format!(
            "{}: trigger={} ({}) execution={} sunset={} actions={}",
            self.principal,
            self.trigger.state(),
            self.trigger.mode(),
            self.execution.phase(),
            self.sunset.stage(),
            self.execution.action_log().len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fie_sunset::SUNSET_DURATION;
    use fie_trigger::TriggerParams;

    #[test]
    fn untriggered_estate_is_never_due() {
        let alice = Identity::new("alice").unwrap();
        let estate = Estate::new(alice, Timestamp::from_secs(0));
        assert!(!estate.is_sunset_due(Timestamp::from_secs(u64::MAX)));
    }

    #[test]
    fn due_counts_from_trigger() {
        let alice = Identity::new("alice").unwrap();
        let mut estate = Estate::new(alice.clone(), Timestamp::from_secs(0));
        estate
            .trigger
            .configure(
                &alice,
                TriggerParams::Deadman { interval_seconds: 10 },
                Timestamp::from_secs(0),
            )
            .unwrap();
        estate
            .trigger
            .execute_deadman_switch(Timestamp::from_secs(11))
            .unwrap();
        assert!(!estate.is_sunset_due(Timestamp::from_secs(10 + SUNSET_DURATION)));
        assert!(estate.is_sunset_due(Timestamp::from_secs(11 + SUNSET_DURATION)));
        assert!(estate.summary().contains("trigger=triggered (deadman)"));
    }
}
