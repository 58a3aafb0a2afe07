// protocol.rs — SunsetState: the per-estate wind-down workflow.
//
//   Pending → Initiated → Archived → Transitioned → Clustered → Completed
//
// Initiation is allowed only once SUNSET_DURATION has elapsed since the
// trigger. Every later stage requires the previous one. The emergency path
// performs the initiation for any caller and locks the post-sunset license
// to the public domain.

use fie_types::{AssetId, Identity, Timestamp, SECONDS_PER_YEAR};
use serde::{Deserialize, Serialize};

use crate::error::SunsetError;
use crate::stage::{PostSunsetLicense, SunsetStage};

/// Twenty 365-day years, in seconds. Fixed; not configurable.
pub const SUNSET_DURATION: u64 = 20 * SECONDS_PER_YEAR;

/// The first instant at which an estate triggered at `trigger_timestamp` may sunset.
pub fn sunset_due_at(trigger_timestamp: Timestamp) -> Timestamp {
    trigger_timestamp
        .checked_add(SUNSET_DURATION)
        .unwrap_or(Timestamp::from_secs(u64::MAX))
}

/// `now ≥ trigger_timestamp + SUNSET_DURATION`. No side effects.
pub fn is_sunset_due(trigger_timestamp: Timestamp, now: Timestamp) -> bool {
    trigger_timestamp
        .checked_add(SUNSET_DURATION)
        .is_some_and(|due| now >= due)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedAsset {
    pub asset_id: AssetId,
    pub archive_uri: String,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SunsetState {
    stage: SunsetStage,
    sunset_timestamp: Option<Timestamp>,
    /// Copy of the estate's trigger timestamp, kept for audit.
    trigger_timestamp: Option<Timestamp>,
    post_sunset_license: PostSunsetLicense,
    cluster_id: Option<String>,
    #[serde(default)]
    archived: Vec<ArchivedAsset>,
    /// Set when the sunset was started through the emergency path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    emergency_caller: Option<Identity>,
}

impl SunsetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> SunsetStage {
        self.stage
    }

    pub fn is_sunset(&self) -> bool {
        self.stage >= SunsetStage::Initiated
    }

    pub fn assets_archived(&self) -> bool {
        self.stage >= SunsetStage::Archived
    }

    pub fn ip_transitioned(&self) -> bool {
        self.stage >= SunsetStage::Transitioned
    }

    pub fn clustered(&self) -> bool {
        self.stage >= SunsetStage::Clustered
    }

    pub fn completed(&self) -> bool {
        self.stage >= SunsetStage::Completed
    }

    /// The five milestone flags in workflow order.
    pub fn flags(&self) -> [bool; 5] {
        [
            self.is_sunset(),
            self.assets_archived(),
            self.ip_transitioned(),
            self.clustered(),
            self.completed(),
        ]
    }

    pub fn sunset_timestamp(&self) -> Option<Timestamp> {
        self.sunset_timestamp
    }

    pub fn trigger_timestamp(&self) -> Option<Timestamp> {
        self.trigger_timestamp
    }

    pub fn post_sunset_license(&self) -> PostSunsetLicense {
        self.post_sunset_license
    }

    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_deref()
    }

    pub fn archived(&self) -> &[ArchivedAsset] {
        &self.archived
    }

    pub fn emergency_caller(&self) -> Option<&Identity> {
        self.emergency_caller.as_ref()
    }

    pub fn initiate(&mut self, trigger_timestamp: Timestamp, now: Timestamp) -> Result<(), SunsetError> {
        self.begin(trigger_timestamp, now)?;
        tracing::info!(trigger = %trigger_timestamp, at = %now, "sunset initiated");
        Ok(())
    }

    /// Same effect as [`initiate`](Self::initiate), callable by anyone, and
    /// fixes the post-sunset license to the public domain immediately.
    pub fn emergency_sunset(
        &mut self,
        caller: &Identity,
        trigger_timestamp: Timestamp,
        now: Timestamp,
    ) -> Result<(), SunsetError> {
        self.begin(trigger_timestamp, now)?;
        self.post_sunset_license = PostSunsetLicense::PublicDomain;
        self.emergency_caller = Some(caller.clone());
        tracing::warn!(%caller, trigger = %trigger_timestamp, at = %now, "emergency sunset initiated");
        Ok(())
    }

    /// Record the archive batch. Inputs are parallel arrays.
    pub fn archive_assets(
        &mut self,
        asset_ids: Vec<AssetId>,
        archive_uris: Vec<String>,
        content_hashes: Vec<String>,
    ) -> Result<(), SunsetError> {
        if !self.is_sunset() {
            return Err(SunsetError::NotYetSunset);
        }
        if self.assets_archived() {
            return Err(SunsetError::AlreadyArchived);
        }
        if asset_ids.len() != archive_uris.len() || asset_ids.len() != content_hashes.len() {
            return Err(SunsetError::LengthMismatch {
                assets: asset_ids.len(),
                uris: archive_uris.len(),
                hashes: content_hashes.len(),
            });
        }
        self.stage.advance(SunsetStage::Archived)?;
        self.archived = asset_ids
            .into_iter()
            .zip(archive_uris)
            .zip(content_hashes)
            .map(|((asset_id, archive_uri), content_hash)| ArchivedAsset {
                asset_id,
                archive_uri,
                content_hash,
            })
            .collect();
        tracing::info!(count = self.archived.len(), "sunset assets archived");
        Ok(())
    }

    /// Record the post-sunset license. Returns the license actually applied,
    /// which is always public domain after an emergency sunset.
    pub fn transition_ip(&mut self, license: PostSunsetLicense) -> Result<PostSunsetLicense, SunsetError> {
        if !self.assets_archived() {
            return Err(SunsetError::AssetsNotArchived);
        }
        if self.ip_transitioned() {
            return Err(SunsetError::AlreadyTransitioned);
        }
        let effective = if self.emergency_caller.is_some() {
            if license != PostSunsetLicense::PublicDomain {
                tracing::warn!(requested = %license, "emergency sunset locks license to public domain");
            }
            PostSunsetLicense::PublicDomain
        } else {
            license
        };
        self.stage.advance(SunsetStage::Transitioned)?;
        self.post_sunset_license = effective;
        tracing::info!(license = %effective, "sunset IP transitioned");
        Ok(effective)
    }

    /// Attach the estate to a semantic cluster. The reference is advisory and
    /// not checked for existence.
    pub fn cluster_legacy(&mut self, cluster_id: impl Into<String>) -> Result<(), SunsetError> {
        if !self.ip_transitioned() {
            return Err(SunsetError::IpNotTransitioned);
        }
        if self.clustered() {
            return Err(SunsetError::AlreadyClustered);
        }
        self.stage.advance(SunsetStage::Clustered)?;
        let cluster_id = cluster_id.into();
        tracing::info!(%cluster_id, "sunset legacy clustered");
        self.cluster_id = Some(cluster_id);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), SunsetError> {
        if !self.clustered() {
            return Err(SunsetError::NotClustered);
        }
        if self.completed() {
            return Err(SunsetError::AlreadyCompleted);
        }
        self.stage.advance(SunsetStage::Completed)?;
        tracing::info!("sunset completed");
        Ok(())
    }

    fn begin(&mut self, trigger_timestamp: Timestamp, now: Timestamp) -> Result<(), SunsetError> {
        if self.is_sunset() {
            return Err(SunsetError::AlreadySunset);
        }
        if !is_sunset_due(trigger_timestamp, now) {
            return Err(SunsetError::TooEarly {
                due_at: sunset_due_at(trigger_timestamp),
            });
        }
        self.stage.advance(SunsetStage::Initiated)?;
        self.sunset_timestamp = Some(now);
        self.trigger_timestamp = Some(trigger_timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIGGER: Timestamp = Timestamp::from_secs(1_700_000_000);

    fn due() -> Timestamp {
        sunset_due_at(TRIGGER)
    }

    fn asset(n: &str) -> AssetId {
        AssetId(n.to_string())
    }

    fn initiated() -> SunsetState {
        let mut s = SunsetState::new();
        s.initiate(TRIGGER, due()).unwrap();
        s
    }

    fn archived() -> SunsetState {
        let mut s = initiated();
        s.archive_assets(
            vec![asset("a1")],
            vec!["ar://a1".into()],
            vec!["h1".into()],
        )
        .unwrap();
        s
    }

    #[test]
    fn duration_is_twenty_years_of_seconds() {
        assert_eq!(SUNSET_DURATION, 630_720_000);
    }

    #[test]
    fn initiate_respects_the_horizon_boundary() {
        let mut s = SunsetState::new();
        let one_early = Timestamp::from_secs(TRIGGER.as_secs() + 630_719_999);
        assert_eq!(
            s.initiate(TRIGGER, one_early),
            Err(SunsetError::TooEarly { due_at: due() })
        );
        assert!(!s.is_sunset());

        let exactly = Timestamp::from_secs(TRIGGER.as_secs() + 630_720_000);
        s.initiate(TRIGGER, exactly).unwrap();
        assert!(s.is_sunset());
        assert_eq!(s.sunset_timestamp(), Some(exactly));
        assert_eq!(s.trigger_timestamp(), Some(TRIGGER));
    }

    #[test]
    fn initiate_is_exactly_once() {
        let mut s = initiated();
        assert_eq!(s.initiate(TRIGGER, due()), Err(SunsetError::AlreadySunset));
        let stranger = Identity::new("anyone").unwrap();
        assert_eq!(
            s.emergency_sunset(&stranger, TRIGGER, due()),
            Err(SunsetError::AlreadySunset)
        );
    }

    #[test]
    fn is_sunset_due_is_pure() {
        assert!(!is_sunset_due(TRIGGER, TRIGGER));
        assert!(is_sunset_due(TRIGGER, due()));
        assert!(!is_sunset_due(Timestamp::from_secs(u64::MAX), Timestamp::from_secs(u64::MAX)));
    }

    #[test]
    fn archive_before_initiate_fails() {
        let mut s = SunsetState::new();
        assert_eq!(
            s.archive_assets(vec![], vec![], vec![]),
            Err(SunsetError::NotYetSunset)
        );
    }

    #[test]
    fn archive_requires_parallel_inputs() {
        let mut s = initiated();
        assert_eq!(
            s.archive_assets(vec![asset("a1"), asset("a2")], vec!["u".into()], vec!["h".into()]),
            Err(SunsetError::LengthMismatch {
                assets: 2,
                uris: 1,
                hashes: 1
            })
        );
        assert!(!s.assets_archived());
    }

    #[test]
    fn archive_is_a_single_batch() {
        let mut s = archived();
        assert_eq!(s.archived().len(), 1);
        assert_eq!(
            s.archive_assets(vec![], vec![], vec![]),
            Err(SunsetError::AlreadyArchived)
        );
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut s = initiated();
        assert_eq!(
            s.transition_ip(PostSunsetLicense::PublicDomain),
            Err(SunsetError::AssetsNotArchived)
        );
        assert_eq!(s.cluster_legacy("c"), Err(SunsetError::IpNotTransitioned));
        assert_eq!(s.complete(), Err(SunsetError::NotClustered));
        assert_eq!(s.stage(), SunsetStage::Initiated);
    }

    #[test]
    fn complete_before_cluster_fails() {
        let mut s = archived();
        s.transition_ip(PostSunsetLicense::PublicDomain).unwrap();
        assert_eq!(s.complete(), Err(SunsetError::NotClustered));
    }

    #[test]
    fn full_workflow_sets_all_flags_in_order() {
        let mut s = SunsetState::new();
        let mut seen = vec![s.flags()];
        s.initiate(TRIGGER, due()).unwrap();
        seen.push(s.flags());
        s.archive_assets(vec![asset("a")], vec!["u".into()], vec!["h".into()])
            .unwrap();
        seen.push(s.flags());
        s.transition_ip(PostSunsetLicense::Attribution).unwrap();
        seen.push(s.flags());
        s.cluster_legacy("cluster-7").unwrap();
        seen.push(s.flags());
        s.complete().unwrap();
        seen.push(s.flags());

        for flags in &seen {
            // A later flag is only ever true if every earlier one is.
            for i in 1..flags.len() {
                assert!(!flags[i] || flags[i - 1]);
            }
        }
        for pair in seen.windows(2) {
            for i in 0..5 {
                assert!(!pair[0][i] || pair[1][i], "flag {i} went back to false");
            }
        }
        assert_eq!(s.flags(), [true; 5]);
        assert_eq!(s.cluster_id(), Some("cluster-7"));
        assert_eq!(s.post_sunset_license(), PostSunsetLicense::Attribution);
        assert_eq!(s.complete(), Err(SunsetError::AlreadyCompleted));
    }

    #[test]
    fn emergency_sunset_forces_public_domain() {
        let mut s = SunsetState::new();
        let stranger = Identity::new("passer-by").unwrap();
        assert!(matches!(
            s.emergency_sunset(&stranger, TRIGGER, TRIGGER),
            Err(SunsetError::TooEarly { .. })
        ));
        s.emergency_sunset(&stranger, TRIGGER, due()).unwrap();
        assert!(s.is_sunset());
        assert_eq!(s.post_sunset_license(), PostSunsetLicense::PublicDomain);
        assert_eq!(s.emergency_caller(), Some(&stranger));

        s.archive_assets(vec![], vec![], vec![]).unwrap();
        let applied = s.transition_ip(PostSunsetLicense::AttributionShareAlike).unwrap();
        assert_eq!(applied, PostSunsetLicense::PublicDomain);
        assert_eq!(s.post_sunset_license().code(), 0);
    }

    #[test]
    fn second_emergency_keeps_the_first_caller() {
        let mut s = SunsetState::new();
        let first = Identity::new("passer-by").unwrap();
        let second = Identity::new("latecomer").unwrap();
        s.emergency_sunset(&first, TRIGGER, due()).unwrap();
        assert_eq!(
            s.emergency_sunset(&second, TRIGGER, due()),
            Err(SunsetError::AlreadySunset)
        );
        assert_eq!(s.emergency_caller(), Some(&first));
    }

    #[test]
    fn state_serialization_round_trip() {
        let s = archived();
        let json = serde_json::to_string(&s).unwrap();
        let restored: SunsetState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, s);
        assert!(json.contains("\"stage\":\"archived\""));
    }
}
