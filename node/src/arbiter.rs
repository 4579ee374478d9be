//! The arbiter: every engine behind its own lock, driven by one clock.
//!
//! All operations take `&self`. Each request lives in its own slot mutex, so
//! submissions to different requests only meet on the short global tables.
//! Locks are always taken in this order:
//!
//! request slot → disputes → registry → ledger → trust → treasury
//!
//! The request map and the event bus are leaf locks, held only long enough
//! to look up or insert a slot and never while acquiring another lock.
//! Events are collected while an operation runs and emitted after every
//! engine lock has been released.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use poi_registry::{Model, ModelRegistry};
use poi_staking::{SlashRecord, StakeLedger, ValidatorStake};
use poi_types::{ChallengeId, Clock, ContentHash, EngineParams, ModelId, Principal, RequestId, Timestamp};
use poi_verification::{
    Challenge, ChallengeFiling, ChallengeResolution, ConsensusFinalizer, DisputeResolver,
    InferenceRequest, NewRequest, RequestLifecycle, RequestPhase, RequestRecord, Settlement,
    Submission, SubmitOutcome, TrustScores, VerificationError, VerificationResult,
};

use crate::config::ArbiterConfig;
use crate::events::{ArbiterEvent, EventBus};
use crate::metrics::ArbiterMetrics;
use crate::tracing_spans;
use crate::treasury::Treasury;
use crate::ArbiterError;

pub(crate) type Slot = Arc<Mutex<RequestRecord>>;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}

/// A freshly opened request and how the attached payment was divided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedRequest {
    pub id: RequestId,
    pub content_hash: ContentHash,
    pub fee: u128,
    pub escrow: u128,
    /// Excess payment returned to the agent.
    pub change: u128,
}

/// Result of a validator submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submitted {
    /// Recorded; the request is still waiting for quorum.
    Pending { count: usize, quorum: usize },
    /// This submission completed the quorum and the request was settled.
    Finalized(Settlement),
}

pub struct Arbiter {
    pub(crate) config: ArbiterConfig,
    pub(crate) params: EngineParams,
    pub(crate) admin: Principal,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) paused: AtomicBool,
    /// Next request id. Only advanced under the registry lock.
    pub(crate) next_request_id: AtomicU64,
    /// Operations hold this shared; checkpoints hold it exclusively.
    pub(crate) gate: RwLock<()>,
    pub(crate) requests: RwLock<BTreeMap<RequestId, Slot>>,
    pub(crate) disputes: Mutex<DisputeResolver>,
    pub(crate) registry: Mutex<ModelRegistry>,
    pub(crate) ledger: Mutex<StakeLedger>,
    pub(crate) trust: Mutex<TrustScores>,
    pub(crate) treasury: Mutex<Treasury>,
    events: RwLock<EventBus>,
    metrics: ArbiterMetrics,
}

/// Engine state an arbiter is assembled from.
pub(crate) struct Engines {
    pub registry: ModelRegistry,
    pub ledger: StakeLedger,
    pub trust: TrustScores,
    pub disputes: DisputeResolver,
    pub treasury: Treasury,
    pub requests: Vec<RequestRecord>,
    pub next_request_id: u64,
    pub paused: bool,
}

impl Arbiter {
    /// Build an empty arbiter from a validated configuration.
    pub fn new(config: ArbiterConfig, clock: Arc<dyn Clock>) -> Result<Self, ArbiterError> {
        config.validate()?;
        let params = config.params.clone();
        let engines = Engines {
            registry: ModelRegistry::new(),
            ledger: StakeLedger::new(params.minimum_stake),
            trust: TrustScores::new(params.initial_trust, params.max_trust),
            disputes: DisputeResolver::new(config.arbitrator_principals()),
            treasury: Treasury::new(),
            requests: Vec::new(),
            next_request_id: 1,
            paused: false,
        };
        Self::assemble(config, clock, engines)
    }

    pub(crate) fn assemble(
        config: ArbiterConfig,
        clock: Arc<dyn Clock>,
        engines: Engines,
    ) -> Result<Self, ArbiterError> {
        let metrics = ArbiterMetrics::new()?;
        let open = engines
            .requests
            .iter()
            .filter(|r| r.request.phase == RequestPhase::Open && !r.request.refunded)
            .count();
        metrics.open_requests.set(open as i64);

        let requests = engines
            .requests
            .into_iter()
            .map(|r| (r.id(), Arc::new(Mutex::new(r))))
            .collect();

        tracing::info!(
            admin = %config.admin,
            arbitrators = config.arbitrators.len(),
            quorum = config.params.quorum,
            minimum_stake = engines.ledger.minimum_stake(),
            "arbiter ready"
        );

        Ok(Self {
            params: config.params.clone(),
            admin: config.admin_principal(),
            config,
            clock,
            paused: AtomicBool::new(engines.paused),
            next_request_id: AtomicU64::new(engines.next_request_id),
            gate: RwLock::new(()),
            requests: RwLock::new(requests),
            disputes: Mutex::new(engines.disputes),
            registry: Mutex::new(engines.registry),
            ledger: Mutex::new(engines.ledger),
            trust: Mutex::new(engines.trust),
            treasury: Mutex::new(engines.treasury),
            events: RwLock::new(EventBus::new()),
            metrics,
        })
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn metrics(&self) -> &ArbiterMetrics {
        &self.metrics
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Register an event listener. Listeners must not subscribe further listeners.
    pub fn subscribe(&self, listener: Box<dyn Fn(&ArbiterEvent) + Send + Sync>) {
        write(&self.events).subscribe(listener);
    }

    fn emit(&self, events: Vec<ArbiterEvent>) {
        if !events.is_empty() {
            read(&self.events).emit_all(&events);
        }
    }

    fn require_admin(&self, caller: &Principal) -> Result<(), ArbiterError> {
        if *caller != self.admin {
            return Err(ArbiterError::Unauthorized(caller.to_string()));
        }
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), ArbiterError> {
        if self.paused.load(Ordering::SeqCst) {
            return Err(ArbiterError::Paused);
        }
        Ok(())
    }

    fn slot(&self, id: RequestId) -> Result<Slot, ArbiterError> {
        read(&self.requests)
            .get(&id)
            .cloned()
            .ok_or_else(|| VerificationError::RequestNotFound(id).into())
    }

    // ── Administration ──────────────────────────────────────────────────

    pub fn register_model(
        &self,
        caller: &Principal,
        model_id: ModelId,
        owner: Principal,
        verification_fee: u128,
    ) -> Result<Model, ArbiterError> {
        let _gate = read(&self.gate);
        self.require_admin(caller)?;
        let model = lock(&self.registry)
            .register(model_id, owner, verification_fee, self.now())?
            .clone();
        self.emit(vec![ArbiterEvent::ModelRegistered {
            model_id: model.model_id.clone(),
            owner: model.owner.clone(),
            verification_fee: model.verification_fee,
        }]);
        Ok(model)
    }

    /// Change the stake a validator needs to be active. Also the minimum challenge bond.
    pub fn set_minimum_stake(&self, caller: &Principal, minimum_stake: u128) -> Result<(), ArbiterError> {
        let _gate = read(&self.gate);
        self.require_admin(caller)?;
        lock(&self.ledger).set_minimum_stake(minimum_stake);
        tracing::info!(minimum_stake, "minimum stake changed");
        Ok(())
    }

    pub fn pause(&self, caller: &Principal) -> Result<(), ArbiterError> {
        self.require_admin(caller)?;
        if !self.paused.swap(true, Ordering::SeqCst) {
            tracing::warn!(by = %caller, "arbiter paused");
            self.emit(vec![ArbiterEvent::Paused]);
        }
        Ok(())
    }

    pub fn unpause(&self, caller: &Principal) -> Result<(), ArbiterError> {
        self.require_admin(caller)?;
        if self.paused.swap(false, Ordering::SeqCst) {
            tracing::info!(by = %caller, "arbiter unpaused");
            self.emit(vec![ArbiterEvent::Unpaused]);
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Move unallocated treasury funds to the admin. Only while paused.
    pub fn emergency_withdraw(&self, caller: &Principal, amount: u128) -> Result<u128, ArbiterError> {
        let _gate = read(&self.gate);
        self.require_admin(caller)?;
        if !self.is_paused() {
            return Err(ArbiterError::NotPaused);
        }
        lock(&self.treasury).withdraw_unallocated(amount)?;
        tracing::warn!(amount, recipient = %caller, "emergency withdrawal");
        self.emit(vec![ArbiterEvent::EmergencyWithdrawal {
            amount,
            recipient: caller.clone(),
        }]);
        Ok(amount)
    }

    // ── Model owners ────────────────────────────────────────────────────

    pub fn update_model_metrics(
        &self,
        caller: &Principal,
        model_id: &ModelId,
        accuracy_bps: u32,
        latency_ms: u64,
        uptime_bps: u32,
    ) -> Result<(), ArbiterError> {
        let _gate = read(&self.gate);
        lock(&self.registry).update_metrics(model_id, caller, accuracy_bps, latency_ms, uptime_bps, self.now())?;
        Ok(())
    }

    pub fn set_model_fee(&self, caller: &Principal, model_id: &ModelId, fee: u128) -> Result<(), ArbiterError> {
        let _gate = read(&self.gate);
        lock(&self.registry).set_fee(model_id, caller, fee)?;
        Ok(())
    }

    pub fn set_model_active(&self, caller: &Principal, model_id: &ModelId, active: bool) -> Result<(), ArbiterError> {
        let _gate = read(&self.gate);
        lock(&self.registry).set_active(model_id, caller, active)?;
        Ok(())
    }

    /// Pay out every verification fee the owner has earned.
    pub fn withdraw_fees(&self, owner: &Principal) -> Result<u128, ArbiterError> {
        let _gate = read(&self.gate);
        let amount = lock(&self.treasury).withdraw_fees(owner)?;
        tracing::info!(owner = %owner, amount, "fees withdrawn");
        Ok(amount)
    }

    // ── Staking ─────────────────────────────────────────────────────────

    pub fn stake(&self, validator: &Principal, amount: u128) -> Result<ValidatorStake, ArbiterError> {
        let _gate = read(&self.gate);
        let entry = lock(&self.ledger).stake(validator, amount, self.now())?.clone();
        Ok(entry)
    }

    pub fn unstake(&self, validator: &Principal, amount: u128) -> Result<u128, ArbiterError> {
        let _gate = read(&self.gate);
        Ok(lock(&self.ledger).unstake(validator, amount, self.now())?)
    }

    pub fn delegate(&self, delegator: &Principal, validator: &Principal, amount: u128) -> Result<(), ArbiterError> {
        let _gate = read(&self.gate);
        lock(&self.ledger).delegate(delegator, validator, amount, self.now())?;
        Ok(())
    }

    pub fn undelegate(&self, delegator: &Principal, validator: &Principal, amount: u128) -> Result<u128, ArbiterError> {
        let _gate = read(&self.gate);
        Ok(lock(&self.ledger).undelegate(delegator, validator, amount, self.now())?)
    }

    /// Pay out a validator's accrued rewards from the reward pool.
    pub fn claim_rewards(&self, validator: &Principal) -> Result<u128, ArbiterError> {
        let _gate = read(&self.gate);
        let mut ledger = lock(&self.ledger);
        let mut treasury = lock(&self.treasury);
        let accrued = ledger.get(validator).map_or(0, |s| s.accrued_rewards);
        if accrued > treasury.reward_pool {
            return Err(ArbiterError::InsufficientTreasury {
                requested: accrued,
                available: treasury.reward_pool,
            });
        }
        let payout = ledger.claim_rewards(validator, self.now())?;
        treasury.pay_rewards(payout)?;
        Ok(payout)
    }

    // ── Requests ────────────────────────────────────────────────────────

    /// Open a verification request. `payment` must cover the model fee plus the reward.
    pub fn open_request(&self, new: NewRequest) -> Result<OpenedRequest, ArbiterError> {
        let _gate = read(&self.gate);
        self.ensure_running()?;
        let span = tracing_spans::open_request_span(new.agent.as_str(), new.model_id.as_str());
        let _enter = span.enter();
        let now = self.now();

        let mut registry = lock(&self.registry);
        let trust = lock(&self.trust);
        let mut treasury = lock(&self.treasury);

        // Allocated under the registry lock so rejected opens do not consume ids.
        let id = RequestId::new(self.next_request_id.load(Ordering::SeqCst));
        let (record, split) =
            RequestLifecycle.open(&mut registry, &trust, id, new, &self.params, now)?;
        let owner = registry.get(&record.request.model_id)?.owner.clone();
        treasury.receive_request(&owner, split.fee, split.escrow)?;
        self.next_request_id.store(id.raw() + 1, Ordering::SeqCst);

        let opened = OpenedRequest {
            id,
            content_hash: record.request.content_hash,
            fee: split.fee,
            escrow: split.escrow,
            change: split.change,
        };
        let event = ArbiterEvent::RequestOpened {
            request_id: id,
            agent: record.request.agent.clone(),
            model_id: record.request.model_id.clone(),
            reward: record.request.reward,
        };
        write(&self.requests).insert(id, Arc::new(Mutex::new(record)));
        drop(treasury);
        drop(trust);
        drop(registry);

        self.metrics.requests_opened.inc();
        self.metrics.open_requests.inc();
        self.emit(vec![event]);
        Ok(opened)
    }

    /// Record a validator's verdict, finalizing the request if it completes the quorum.
    pub fn submit_verification(
        &self,
        request_id: RequestId,
        submission: Submission,
    ) -> Result<Submitted, ArbiterError> {
        let _gate = read(&self.gate);
        self.ensure_running()?;
        let span = tracing_spans::submission_span(request_id, submission.validator.as_str());
        let _enter = span.enter();
        let now = self.now();

        let slot = self.slot(request_id)?;
        let mut record = lock(&slot);
        let validator = submission.validator.clone();
        let is_valid = submission.is_valid;

        let outcome = {
            let mut ledger = lock(&self.ledger);
            ConsensusFinalizer.submit(&mut record, &mut ledger, submission, &self.params, now)?
        };
        let mut events = vec![ArbiterEvent::VerificationSubmitted {
            request_id,
            validator,
            is_valid,
        }];

        let count = match outcome {
            SubmitOutcome::Pending { count, quorum } => {
                drop(record);
                self.metrics.submissions.inc();
                self.emit(events);
                return Ok(Submitted::Pending { count, quorum });
            }
            SubmitOutcome::QuorumReached { count } => count,
        };

        // The quorum-completing submission only stands if its settlement can
        // be written in full; otherwise it is taken back and the request
        // stays open.
        let started = Instant::now();
        let settlement = {
            let mut registry = lock(&self.registry);
            let mut ledger = lock(&self.ledger);
            let mut trust = lock(&self.trust);
            let mut treasury = lock(&self.treasury);
            let planned = ConsensusFinalizer
                .plan(&record, &registry, &ledger, &self.params)
                .map_err(ArbiterError::from)
                .and_then(|plan| {
                    let mut books = treasury.clone();
                    if plan.verified {
                        books.settle_verified(plan.reward, plan.reward - plan.retained, plan.retained)?;
                    } else {
                        books.receive_slashed(plan.total_slashed())?;
                    }
                    Ok((plan, books))
                });
            let (plan, books) = match planned {
                Ok(planned) => planned,
                Err(e) => {
                    ConsensusFinalizer.retract(&mut record, &mut ledger);
                    tracing::warn!(request = %request_id, error = %e, "settlement refused, submission withdrawn");
                    return Err(e);
                }
            };
            let settlement = plan.apply(&mut record, &mut registry, &mut ledger, &mut trust, &self.params, now)?;
            *treasury = books;
            settlement
        };
        drop(record);

        self.metrics.submissions.inc();
        self.metrics
            .finalize_time_us
            .observe(started.elapsed().as_micros() as f64);
        self.metrics.open_requests.dec();
        if settlement.verified {
            self.metrics.finalized_verified.inc();
        } else {
            self.metrics.finalized_rejected.inc();
        }
        self.metrics.slashes.inc_by(settlement.slashed.len() as u64);
        tracing::debug!(request = %request_id, count, "quorum reached");

        events.push(ArbiterEvent::RequestFinalized {
            request_id,
            verified: settlement.verified,
            valid_count: settlement.valid_count,
            total: settlement.total,
            consensus_confidence: settlement.consensus_confidence,
        });
        for (validator, amount) in &settlement.slashed {
            events.push(ArbiterEvent::ValidatorSlashed {
                validator: validator.clone(),
                amount: *amount,
                reason: format!("incorrect verification on {request_id}"),
            });
        }
        if settlement.verified {
            events.push(ArbiterEvent::PaymentDue {
                request_id,
                amount: settlement.reward,
                recipient: settlement.agent.clone(),
            });
        }
        events.push(ArbiterEvent::ReceiptDue {
            request_id,
            verified: settlement.verified,
            consensus_confidence: settlement.consensus_confidence,
            agent: settlement.agent.clone(),
        });
        self.emit(events);
        Ok(Submitted::Finalized(settlement))
    }

    /// Return the reward escrow of an expired or rejected request to its agent.
    pub fn refund_expired(&self, request_id: RequestId) -> Result<u128, ArbiterError> {
        let _gate = read(&self.gate);
        let now = self.now();
        let slot = self.slot(request_id)?;
        let mut record = lock(&slot);

        if record.request.refunded {
            return Err(ArbiterError::AlreadyRefunded(request_id));
        }
        let expired = record.request.is_expired(now);
        let rejected = record.request.phase == RequestPhase::Finalized { verified: false };
        if !expired && !rejected {
            return Err(ArbiterError::RequestNotRefundable(request_id));
        }

        let amount = record.request.reward;
        {
            let mut ledger = lock(&self.ledger);
            let mut treasury = lock(&self.treasury);
            treasury.refund(amount)?;
            for result in &record.results {
                ledger.release_exposure(&result.validator, request_id);
            }
        }
        record.request.refunded = true;
        let agent = record.request.agent.clone();
        drop(record);

        if expired {
            self.metrics.open_requests.dec();
        }
        self.metrics.refunds.inc();
        tracing::info!(request = %request_id, agent = %agent, amount, expired, "escrow refunded");
        self.emit(vec![ArbiterEvent::RequestRefunded {
            request_id,
            agent,
            amount,
        }]);
        Ok(amount)
    }

    // ── Challenges ──────────────────────────────────────────────────────

    /// Contest a verified verdict. The bond must be at least the minimum stake.
    pub fn open_challenge(
        &self,
        request_id: RequestId,
        filing: ChallengeFiling,
    ) -> Result<ChallengeId, ArbiterError> {
        let _gate = read(&self.gate);
        let span = tracing_spans::challenge_span(request_id, None);
        let _enter = span.enter();
        let now = self.now();

        let slot = self.slot(request_id)?;
        let mut record = lock(&slot);
        let mut disputes = lock(&self.disputes);
        let mut ledger = lock(&self.ledger);
        let mut treasury = lock(&self.treasury);
        let minimum_bond = ledger.minimum_stake();
        let challenger = filing.challenger.clone();
        let bond = filing.bond;

        let mut books = treasury.clone();
        books.receive_bond(bond)?;
        let id = disputes.open(&mut record, &mut ledger, filing, minimum_bond, &self.params, now)?;
        *treasury = books;
        drop(treasury);
        drop(ledger);
        drop(disputes);
        drop(record);

        self.metrics.challenges_opened.inc();
        self.emit(vec![ArbiterEvent::ChallengeOpened {
            challenge_id: id,
            request_id,
            challenger,
            bond,
        }]);
        Ok(id)
    }

    /// Decide a pending challenge. Only arbitrators may call this.
    pub fn resolve_challenge(
        &self,
        challenge_id: ChallengeId,
        upheld: bool,
        arbitrator: &Principal,
    ) -> Result<ChallengeResolution, ArbiterError> {
        let _gate = read(&self.gate);
        let now = self.now();
        let request_id = lock(&self.disputes).request_of(challenge_id)?;
        let span = tracing_spans::challenge_span(request_id, Some(challenge_id));
        let _enter = span.enter();

        let slot = self.slot(request_id)?;
        let mut record = lock(&slot);
        let resolution = {
            let mut disputes = lock(&self.disputes);
            let mut registry = lock(&self.registry);
            let mut ledger = lock(&self.ledger);
            let mut trust = lock(&self.trust);
            let resolution = disputes.resolve(
                challenge_id,
                upheld,
                arbitrator,
                &mut record,
                &mut registry,
                &mut ledger,
                &mut trust,
                &self.params,
                now,
            )?;
            let mut treasury = lock(&self.treasury);
            if resolution.upheld {
                treasury.settle_upheld(&resolution.challenger, resolution.bond, resolution.challenger_payout)?;
            } else {
                let distributed = resolution.bond - resolution.retained;
                treasury.settle_rejected(resolution.bond, distributed, resolution.retained)?;
            }
            resolution
        };
        drop(record);

        let mut events = Vec::with_capacity(resolution.slashed.len() + 1);
        for (validator, amount) in &resolution.slashed {
            events.push(ArbiterEvent::ValidatorSlashed {
                validator: validator.clone(),
                amount: *amount,
                reason: format!("verdict overturned by {challenge_id}"),
            });
        }
        events.push(ArbiterEvent::ChallengeResolved {
            challenge_id,
            request_id,
            upheld,
            challenger_payout: resolution.challenger_payout,
        });
        if upheld {
            self.metrics.challenges_upheld.inc();
            self.metrics.slashes.inc_by(resolution.slashed.len() as u64);
        } else {
            self.metrics.challenges_rejected.inc();
        }
        self.emit(events);
        Ok(resolution)
    }

    /// Pay out everything upheld challenges have earned this challenger.
    pub fn claim_challenge_payout(&self, challenger: &Principal) -> Result<u128, ArbiterError> {
        let _gate = read(&self.gate);
        let amount = lock(&self.treasury).claim_challenge_payout(challenger)?;
        tracing::info!(challenger = %challenger, amount, "challenge payout claimed");
        Ok(amount)
    }

    // ── Collaborator references ─────────────────────────────────────────

    /// Store the payment collaborator's reference for a verified request.
    pub fn attach_payment_reference(
        &self,
        caller: &Principal,
        request_id: RequestId,
        reference: String,
    ) -> Result<(), ArbiterError> {
        let _gate = read(&self.gate);
        self.require_admin(caller)?;
        let slot = self.slot(request_id)?;
        let mut record = lock(&slot);
        if !record.request.verified() {
            return Err(VerificationError::RequestNotVerified(request_id).into());
        }
        if record.request.payment_ref.is_some() {
            return Err(ArbiterError::ReferenceAlreadyAttached {
                request: request_id,
                kind: "payment",
            });
        }
        tracing::info!(request = %request_id, reference = %reference, "payment reference attached");
        record.request.payment_ref = Some(reference);
        Ok(())
    }

    /// Store the receipt collaborator's reference for a completed request.
    pub fn attach_receipt_reference(
        &self,
        caller: &Principal,
        request_id: RequestId,
        reference: String,
    ) -> Result<(), ArbiterError> {
        let _gate = read(&self.gate);
        self.require_admin(caller)?;
        let slot = self.slot(request_id)?;
        let mut record = lock(&slot);
        if !record.request.completed() {
            return Err(ArbiterError::RequestNotCompleted(request_id));
        }
        if record.request.receipt_ref.is_some() {
            return Err(ArbiterError::ReferenceAlreadyAttached {
                request: request_id,
                kind: "receipt",
            });
        }
        tracing::info!(request = %request_id, reference = %reference, "receipt reference attached");
        record.request.receipt_ref = Some(reference);
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn get_request(&self, request_id: RequestId) -> Option<InferenceRequest> {
        let slot = self.slot(request_id).ok()?;
        let record = lock(&slot);
        Some(record.request.clone())
    }

    /// Submissions for a request, in arrival order.
    pub fn get_results(&self, request_id: RequestId) -> Result<Vec<VerificationResult>, ArbiterError> {
        let slot = self.slot(request_id)?;
        let record = lock(&slot);
        Ok(record.results.clone())
    }

    pub fn is_expired(&self, request_id: RequestId) -> Result<bool, ArbiterError> {
        let slot = self.slot(request_id)?;
        let record = lock(&slot);
        Ok(record.request.is_expired(self.now()))
    }

    pub fn request_count(&self) -> usize {
        read(&self.requests).len()
    }

    pub fn get_challenge(&self, challenge_id: ChallengeId) -> Option<Challenge> {
        lock(&self.disputes).get(challenge_id).cloned()
    }

    pub fn challenges_for(&self, request_id: RequestId) -> Vec<Challenge> {
        lock(&self.disputes).challenges_for(request_id).cloned().collect()
    }

    pub fn get_model(&self, model_id: &ModelId) -> Option<Model> {
        lock(&self.registry).get(model_id).ok().cloned()
    }

    pub fn get_stake(&self, validator: &Principal) -> Option<ValidatorStake> {
        lock(&self.ledger).get(validator).cloned()
    }

    pub fn is_validator(&self, principal: &Principal) -> bool {
        lock(&self.ledger).is_active(principal)
    }

    pub fn minimum_stake(&self) -> u128 {
        lock(&self.ledger).minimum_stake()
    }

    pub fn delegation(&self, delegator: &Principal, validator: &Principal) -> u128 {
        lock(&self.ledger).delegation(delegator, validator)
    }

    pub fn slash_history(&self, validator: &Principal) -> Vec<SlashRecord> {
        lock(&self.ledger).slash_history(validator).cloned().collect()
    }

    pub fn get_score(&self, agent: &Principal) -> u64 {
        lock(&self.trust).get_score(agent)
    }

    /// A copy of the treasury's books.
    pub fn treasury(&self) -> Treasury {
        lock(&self.treasury).clone()
    }
}
