// executor.rs — Executor: the single entry point for every estate call.
//
// The executor owns the principal-keyed estate map, the asset registry and
// the shared clock. Each call reads the clock once, applies the operation to
// a copy of the estate, and only on success persists the copy, appends the
// audit entries and dispatches events. A rejected call therefore leaves both
// memory and disk untouched.
//
// Registry calls happen only after the estate that authorizes them has been
// committed. Their outcome is committed in a second step.
//
// `&mut self` on every state-changing call is what orders calls globally.

use std::collections::BTreeMap;
use std::sync::Arc;

use fie_audit::hasher::hash_str;
use fie_audit::{AuditAction, AuditEvent, AuditLog};
use fie_execution::{
    ActionRecord, AssetRegistry, CorpusRef, CorpusResolver, ExecutionContext, ExecutionError,
    ExecutionState, LicenseTerms, LoggingRegistry,
};
use fie_sunset::{PostSunsetLicense, SunsetStage};
use fie_trigger::{CertificateProof, CertificateVerifier, TriggerMode, TriggerParams, TriggerProgress};
use fie_types::{Amount, AssetId, Clock, Identity, Timestamp};
use serde_json::json;

use crate::error::EstateError;
use crate::estate::Estate;
use crate::events::{EstateEvent, EventDispatcher};
use crate::store::EstateStore;

pub struct Executor<R = LoggingRegistry> {
    clock: Arc<dyn Clock>,
    registry: R,
    estates: BTreeMap<Identity, Estate>,
    store: Option<EstateStore>,
    audit: Option<AuditLog>,
    dispatcher: EventDispatcher,
}

/// What a successful call leaves behind besides the new estate.
#[derive(Default)]
struct Effects {
    audit: Vec<AuditEvent>,
    events: Vec<EstateEvent>,
}

impl Effects {
    fn audit(mut self, event: AuditEvent) -> Self {
        self.audit.push(event);
        self
    }

    fn event(mut self, event: EstateEvent) -> Self {
        self.events.push(event);
        self
    }
}

impl<R: AssetRegistry> Executor<R> {
    /// An executor with no persistence, no audit log and no sinks.
    pub fn new(clock: Arc<dyn Clock>, registry: R) -> Self {
        Self {
            clock,
            registry,
            estates: BTreeMap::new(),
            store: None,
            audit: None,
            dispatcher: EventDispatcher::new(),
        }
    }

    /// Persist estates in `store`, loading whatever it already holds.
    pub fn with_store(mut self, store: EstateStore) -> Result<Self, EstateError> {
        for estate in store.list()? {
            self.estates.insert(estate.principal.clone(), estate);
        }
        tracing::debug!(estates = self.estates.len(), "loaded estates from store");
        self.store = Some(store);
        Ok(self)
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn estate(&self, principal: &Identity) -> Option<&Estate> {
        self.estates.get(principal)
    }

    pub fn estates(&self) -> impl Iterator<Item = &Estate> {
        self.estates.values()
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    // ── Trigger ─────────────────────────────────────────────────

    /// Configure (or reconfigure) the trigger. Creates the estate on first use.
    pub fn configure_trigger(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        params: TriggerParams,
    ) -> Result<TriggerMode, EstateError> {
        let now = self.clock.now();
        let mut estate = match self.estates.get(principal) {
            Some(existing) => existing.clone(),
            None => Estate::new(principal.clone(), now),
        };
        let mode = estate
            .trigger
            .configure(caller, params, now)
            .map_err(|e| rejected(e, principal, "configure_trigger"))?;

        let effects = Effects::default()
            .audit(
                audit_event(caller, principal, AuditAction::TriggerConfigured, now)
                    .with_metadata(json!({ "mode": mode.to_string() })),
            )
            .event(EstateEvent::TriggerConfigured {
                principal: principal.to_string(),
                mode: mode.to_string(),
                timestamp: now.to_datetime(),
            });
        self.commit(estate, now, effects)?;
        Ok(mode)
    }

    pub fn check_in(&mut self, caller: &Identity, principal: &Identity) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        estate
            .trigger
            .check_in(caller, now)
            .map_err(|e| rejected(e, principal, "check_in"))?;

        let due_at = estate.trigger.deadman_due_at().map(Timestamp::as_secs);
        let effects = Effects::default().audit(
            audit_event(caller, principal, AuditAction::CheckIn, now)
                .with_metadata(json!({ "due_at": due_at })),
        );
        self.commit(estate, now, effects)
    }

    pub fn submit_signature(
        &mut self,
        signer: &Identity,
        principal: &Identity,
    ) -> Result<TriggerProgress, EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let progress = estate
            .trigger
            .submit_signature(signer, now)
            .map_err(|e| rejected(e, principal, "submit_signature"))?;

        let effects = Effects::default().audit(
            audit_event(signer, principal, AuditAction::SignatureAccepted, now)
                .with_metadata(progress_metadata(progress)),
        );
        let effects = fired(effects, signer, &estate, progress);
        self.commit(estate, now, effects)?;
        Ok(progress)
    }

    pub fn submit_oracle_verdict(
        &mut self,
        oracle: &Identity,
        principal: &Identity,
        verdict: bool,
    ) -> Result<TriggerProgress, EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let progress = estate
            .trigger
            .submit_oracle_verdict(oracle, verdict, now)
            .map_err(|e| rejected(e, principal, "submit_oracle_verdict"))?;

        let mut metadata = progress_metadata(progress);
        metadata["verdict"] = json!(verdict);
        let effects = Effects::default().audit(
            audit_event(oracle, principal, AuditAction::OracleVerdict, now).with_metadata(metadata),
        );
        let effects = fired(effects, oracle, &estate, progress);
        self.commit(estate, now, effects)?;
        Ok(progress)
    }

    /// Submit a certificate proof as `oracle`'s verdict. The verifier sees
    /// the same `now` as the rest of the call.
    pub fn submit_certificate_proof(
        &mut self,
        oracle: &Identity,
        principal: &Identity,
        proof: &CertificateProof,
        verifier: &dyn CertificateVerifier,
    ) -> Result<TriggerProgress, EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let progress = estate
            .trigger
            .submit_certificate_proof(oracle, proof, verifier, now)
            .map_err(|e| rejected(e, principal, "submit_certificate_proof"))?;

        let mut metadata = progress_metadata(progress);
        metadata["certificate"] = json!(true);
        let effects = Effects::default().audit(
            audit_event(oracle, principal, AuditAction::OracleVerdict, now)
                .with_input_hash(proof.certificate_hash.clone())
                .with_metadata(metadata),
        );
        let effects = fired(effects, oracle, &estate, progress);
        self.commit(estate, now, effects)?;
        Ok(progress)
    }

    /// Fire a lapsed deadman switch. Any caller.
    pub fn execute_deadman_switch(
        &mut self,
        caller: &Identity,
        principal: &Identity,
    ) -> Result<Timestamp, EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let at = estate
            .trigger
            .execute_deadman_switch(now)
            .map_err(|e| rejected(e, principal, "execute_deadman_switch"))?;

        let effects = fired(
            Effects::default(),
            caller,
            &estate,
            TriggerProgress::Triggered { at },
        );
        self.commit(estate, now, effects)?;
        Ok(at)
    }

    // ── Execution ───────────────────────────────────────────────

    pub fn activate_execution(
        &mut self,
        caller: &Identity,
        principal: &Identity,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        estate
            .execution
            .activate(&estate.trigger, now)
            .map_err(|e| rejected(e, principal, "activate_execution"))?;

        let effects = Effects::default()
            .audit(audit_event(caller, principal, AuditAction::ExecutionActivated, now))
            .event(EstateEvent::ExecutionActivated {
                principal: principal.to_string(),
                timestamp: now.to_datetime(),
            });
        self.commit(estate, now, effects)
    }

    pub fn execute_action(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        action_type: &str,
        goal_description: &str,
        corpus: &CorpusRef,
        resolver: &dyn CorpusResolver,
    ) -> Result<ActionRecord, EstateError> {
        self.run_action(caller, principal, goal_description, resolver, |state, ctx| {
            state.execute_action(ctx, action_type, goal_description, corpus)
        })
    }

    pub fn issue_license(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        terms: LicenseTerms,
        goal_description: &str,
        corpus: &CorpusRef,
        resolver: &dyn CorpusResolver,
    ) -> Result<ActionRecord, EstateError> {
        self.run_action(caller, principal, goal_description, resolver, |state, ctx| {
            state.issue_license(ctx, terms, goal_description, corpus)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fund_project(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        recipient: Identity,
        amount: Amount,
        goal_description: &str,
        corpus: &CorpusRef,
        resolver: &dyn CorpusResolver,
    ) -> Result<ActionRecord, EstateError> {
        self.run_action(caller, principal, goal_description, resolver, |state, ctx| {
            state.fund_project(ctx, recipient, amount, goal_description, corpus)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn distribute_revenue(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        recipient: Identity,
        amount: Amount,
        goal_description: &str,
        corpus: &CorpusRef,
        resolver: &dyn CorpusResolver,
    ) -> Result<ActionRecord, EstateError> {
        self.run_action(caller, principal, goal_description, resolver, |state, ctx| {
            state.distribute_revenue(ctx, recipient, amount, goal_description, corpus)
        })
    }

    /// Hand an active estate over to the sunset protocol once the horizon
    /// has elapsed.
    pub fn activate_sunset(
        &mut self,
        caller: &Identity,
        principal: &Identity,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        estate
            .execution
            .activate_sunset(now)
            .map_err(|e| rejected(e, principal, "activate_sunset"))?;

        let effects = Effects::default()
            .audit(audit_event(caller, principal, AuditAction::SunsetRequested, now))
            .event(EstateEvent::SunsetRequested {
                principal: principal.to_string(),
                timestamp: now.to_datetime(),
            });
        self.commit(estate, now, effects)
    }

    // ── Sunset ──────────────────────────────────────────────────

    pub fn is_sunset_due(&self, principal: &Identity) -> Result<bool, EstateError> {
        let now = self.clock.now();
        let estate = self
            .estates
            .get(principal)
            .ok_or_else(|| EstateError::UnknownEstate(principal.clone()))?;
        Ok(estate.is_sunset_due(now))
    }

    pub fn initiate_sunset(
        &mut self,
        caller: &Identity,
        principal: &Identity,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let trigger_timestamp = triggered_at(&estate)?;
        estate
            .sunset
            .initiate(trigger_timestamp, now)
            .map_err(|e| rejected(e, principal, "initiate_sunset"))?;

        let effects = Effects::default().audit(
            audit_event(caller, principal, AuditAction::SunsetInitiated, now)
                .with_metadata(json!({ "trigger_timestamp": trigger_timestamp.as_secs() })),
        );
        let effects = end_execution(effects, caller, &mut estate, now)?;
        let effects = effects.event(EstateEvent::sunset_stage(
            principal,
            SunsetStage::Initiated,
            false,
            now,
        ));
        self.commit(estate, now, effects)
    }

    /// Start the sunset on behalf of any caller once the horizon has
    /// elapsed. Locks the post-sunset license to the public domain.
    pub fn emergency_sunset(
        &mut self,
        caller: &Identity,
        principal: &Identity,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let trigger_timestamp = triggered_at(&estate)?;
        estate
            .sunset
            .emergency_sunset(caller, trigger_timestamp, now)
            .map_err(|e| rejected(e, principal, "emergency_sunset"))?;

        let effects = Effects::default().audit(
            audit_event(caller, principal, AuditAction::EmergencySunset, now)
                .with_metadata(json!({ "trigger_timestamp": trigger_timestamp.as_secs() })),
        );
        let effects = end_execution(effects, caller, &mut estate, now)?;
        let effects = effects.event(EstateEvent::sunset_stage(
            principal,
            SunsetStage::Initiated,
            true,
            now,
        ));
        self.commit(estate, now, effects)
    }

    /// Record the archive batch. The three inputs are parallel arrays.
    pub fn archive_assets(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        asset_ids: Vec<AssetId>,
        archive_uris: Vec<String>,
        content_hashes: Vec<String>,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let batch_hash = hash_str(&content_hashes.join("\n"));
        estate
            .sunset
            .archive_assets(asset_ids, archive_uris, content_hashes)
            .map_err(|e| rejected(e, principal, "archive_assets"))?;

        let count = estate.sunset.archived().len();
        let effects = Effects::default()
            .audit(
                audit_event(caller, principal, AuditAction::AssetsArchived, now)
                    .with_input_hash(batch_hash)
                    .with_metadata(json!({ "count": count })),
            )
            .event(stage_event(&estate, now));
        self.commit(estate, now, effects)
    }

    /// Record the post-sunset license and, once that is committed, release
    /// archived assets to the registry's public domain when that is the
    /// license applied. Returns the license actually applied.
    pub fn transition_ip(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        license: PostSunsetLicense,
    ) -> Result<PostSunsetLicense, EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let applied = estate
            .sunset
            .transition_ip(license)
            .map_err(|e| rejected(e, principal, "transition_ip"))?;

        let effects = Effects::default()
            .audit(
                audit_event(caller, principal, AuditAction::IpTransitioned, now).with_metadata(
                    json!({
                        "requested": license.to_string(),
                        "license": applied.to_string(),
                        "code": applied.code(),
                    }),
                ),
            )
            .event(stage_event(&estate, now));
        self.commit(estate, now, effects)?;

        if applied == PostSunsetLicense::PublicDomain {
            self.release_to_public_domain(caller, principal, now)?;
        }
        Ok(applied)
    }

    pub fn cluster_legacy(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        cluster_id: &str,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        estate
            .sunset
            .cluster_legacy(cluster_id)
            .map_err(|e| rejected(e, principal, "cluster_legacy"))?;

        let effects = Effects::default()
            .audit(
                audit_event(caller, principal, AuditAction::LegacyClustered, now)
                    .with_metadata(json!({ "cluster_id": cluster_id })),
            )
            .event(stage_event(&estate, now));
        self.commit(estate, now, effects)
    }

    pub fn complete_sunset(
        &mut self,
        caller: &Identity,
        principal: &Identity,
    ) -> Result<(), EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        estate
            .sunset
            .complete()
            .map_err(|e| rejected(e, principal, "complete_sunset"))?;

        let effects = Effects::default()
            .audit(audit_event(caller, principal, AuditAction::SunsetCompleted, now))
            .event(stage_event(&estate, now));
        self.commit(estate, now, effects)
    }

    // ── Internals ───────────────────────────────────────────────

    /// Evaluate and commit the record. A pending license is then settled
    /// against the registry and the settled record committed in turn; if
    /// that second commit fails the persisted record stays pending.
    fn run_action(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        goal_description: &str,
        resolver: &dyn CorpusResolver,
        op: impl FnOnce(&mut ExecutionState, &ExecutionContext<'_>) -> Result<ActionRecord, ExecutionError>,
    ) -> Result<ActionRecord, EstateError> {
        let now = self.clock.now();
        let mut estate = self.load(principal)?;
        let ctx = ExecutionContext { resolver, now };
        let record = op(&mut estate.execution, &ctx)
            .map_err(|e| rejected(e, principal, "execute_action"))?;

        let effects = Effects::default()
            .audit(
                audit_event(caller, principal, AuditAction::ActionRecorded, now)
                    .with_input_hash(hash_str(goal_description))
                    .with_metadata(serde_json::to_value(&record)?),
            )
            .event(EstateEvent::ActionRecorded {
                principal: principal.to_string(),
                action_type: record.action_type().to_string(),
                confidence: record.confidence_score,
                authorized: record.authorized,
                timestamp: now.to_datetime(),
            });
        self.commit(estate, now, effects)?;
        if !record.is_pending() {
            return Ok(record);
        }
        self.settle_license(caller, principal, record, now)
    }

    fn settle_license(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        pending: ActionRecord,
        now: Timestamp,
    ) -> Result<ActionRecord, EstateError> {
        let mut estate = self.load(principal)?;
        let Some(record) = estate.execution.settle_pending(&mut self.registry) else {
            return Ok(pending);
        };
        let effects = Effects::default().audit(
            audit_event(caller, principal, AuditAction::LicenseSettled, now)
                .with_metadata(serde_json::to_value(&record)?),
        );
        self.commit(estate, now, effects)?;
        Ok(record)
    }

    /// Hand every archived asset to the registry's public domain. Failures
    /// are logged and listed in the audit entry; they never undo the stage.
    fn release_to_public_domain(
        &mut self,
        caller: &Identity,
        principal: &Identity,
        now: Timestamp,
    ) -> Result<(), EstateError> {
        let estate = self.load(principal)?;
        let mut released = Vec::new();
        let mut failed = Vec::new();
        for archived in estate.sunset.archived() {
            match self.registry.transition_to_public_domain(&archived.asset_id) {
                Ok(()) => released.push(archived.asset_id.to_string()),
                Err(e) => {
                    tracing::warn!(
                        %principal,
                        asset = %archived.asset_id,
                        error = %e,
                        "registry public-domain transition failed"
                    );
                    failed.push(json!({ "asset": archived.asset_id.to_string(), "error": e.to_string() }));
                }
            }
        }
        let effects = Effects::default().audit(
            audit_event(caller, principal, AuditAction::PublicDomainReleased, now)
                .with_metadata(json!({ "released": released, "failed": failed })),
        );
        self.commit(estate, now, effects)
    }

    fn load(&self, principal: &Identity) -> Result<Estate, EstateError> {
        self.estates
            .get(principal)
            .cloned()
            .ok_or_else(|| EstateError::UnknownEstate(principal.clone()))
    }

    /// Persist, audit, then publish. Nothing reaches the in-memory map
    /// unless both the store and the audit log accepted it; a failed audit
    /// append puts the previous estate file back.
    fn commit(&mut self, mut estate: Estate, now: Timestamp, mut effects: Effects) -> Result<(), EstateError> {
        estate.updated_at = now;
        if let Some(store) = &self.store {
            store.save(&estate)?;
        }
        if let Some(audit) = &mut self.audit {
            if let Err(e) = audit.append_batch(&mut effects.audit) {
                if let Some(store) = &self.store {
                    let restored = match self.estates.get(&estate.principal) {
                        Some(previous) => store.save(previous),
                        None => store.delete(&estate.principal).map(|_| ()),
                    };
                    if let Err(restore) = restored {
                        tracing::error!(
                            principal = %estate.principal,
                            error = %restore,
                            "could not restore estate after audit failure"
                        );
                    }
                }
                return Err(e.into());
            }
        }
        tracing::debug!(principal = %estate.principal, at = %now, "estate committed");
        self.estates.insert(estate.principal.clone(), estate);
        for event in &effects.events {
            self.dispatcher.dispatch(event);
        }
        Ok(())
    }
}

fn audit_event(actor: &Identity, principal: &Identity, action: AuditAction, now: Timestamp) -> AuditEvent {
    AuditEvent::new(actor.as_str(), principal.as_str(), action, now.to_datetime())
}

fn progress_metadata(progress: TriggerProgress) -> serde_json::Value {
    match progress {
        TriggerProgress::Pending { have, need } => json!({ "have": have, "need": need }),
        TriggerProgress::Triggered { at } => json!({ "triggered_at": at.as_secs() }),
    }
}

/// Add the Triggered audit entry and event if `progress` fired the trigger.
fn fired(effects: Effects, actor: &Identity, estate: &Estate, progress: TriggerProgress) -> Effects {
    let TriggerProgress::Triggered { at } = progress else {
        return effects;
    };
    let mode = estate.trigger.mode();
    effects
        .audit(
            audit_event(actor, &estate.principal, AuditAction::Triggered, at)
                .with_metadata(json!({ "mode": mode.to_string(), "at": at.as_secs() })),
        )
        .event(EstateEvent::triggered(&estate.principal, mode, at))
}

/// Starting the sunset closes the execution window: an active agent is
/// moved to SunsetRequested in the same call.
fn end_execution(
    effects: Effects,
    caller: &Identity,
    estate: &mut Estate,
    now: Timestamp,
) -> Result<Effects, EstateError> {
    if !estate.execution.is_active() {
        return Ok(effects);
    }
    estate
        .execution
        .activate_sunset(now)
        .map_err(|e| rejected(e, &estate.principal, "activate_sunset"))?;
    Ok(effects
        .audit(audit_event(caller, &estate.principal, AuditAction::SunsetRequested, now))
        .event(EstateEvent::SunsetRequested {
            principal: estate.principal.to_string(),
            timestamp: now.to_datetime(),
        }))
}

fn stage_event(estate: &Estate, now: Timestamp) -> EstateEvent {
    EstateEvent::sunset_stage(
        &estate.principal,
        estate.sunset.stage(),
        estate.sunset.emergency_caller().is_some(),
        now,
    )
}

fn triggered_at(estate: &Estate) -> Result<Timestamp, EstateError> {
    estate
        .trigger_timestamp()
        .ok_or_else(|| EstateError::NotTriggered(estate.principal.clone()))
}

/// Convert a component error, logging it at a level that matches its class.
/// Invariant violations are never persisted: the caller returns before
/// `commit`.
fn rejected(err: impl Into<EstateError>, principal: &Identity, op: &str) -> EstateError {
    let err = err.into();
    let class = err.class();
    if class.is_fatal() {
        tracing::error!(%principal, op, %class, error = %err, "invariant violation; call aborted");
    } else {
        tracing::debug!(%principal, op, %class, error = %err, "call rejected");
    }
    err
}
