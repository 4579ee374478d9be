//! Settlement: who gets paid and who gets slashed once a request finalizes.
//!
//! A settlement is computed as a [`SettlementPlan`] against read-only views
//! of the registry and ledger, then applied in one pass. Planning runs every
//! check applying depends on (unknown model or validator, counter and reward
//! overflow), so an error never leaves a request half-settled.
//!
//! Verified verdict:
//! - Every submitter is credited `reward / n`, dissenters included
//! - The remainder `reward - n * (reward / n)` is retained by the treasury
//! - The model's success counter moves and the agent gains trust
//! - Validators who voted valid stay locked for `challenge_slash_bps` of
//!   their self-stake until the challenge window closes
//!
//! Rejected verdict:
//! - Validators who voted valid are slashed `slash_bps` of their self-stake,
//!   and never less than the exposure they locked when submitting
//! - The reward escrow becomes refundable to the agent
//! - The agent loses trust

use crate::consensus::Tally;
use crate::error::VerificationError;
use crate::state::{RequestPhase, RequestRecord};
use crate::trust::TrustScores;
use poi_registry::ModelRegistry;
use poi_staking::{SlashReason, StakeLedger, StakingError};
use poi_types::{EngineParams, ModelId, Principal, RequestId, Timestamp};

/// Divide `amount` evenly across `n` recipients. Returns `(share, remainder)`.
pub fn split_evenly(amount: u128, n: usize) -> (u128, u128) {
    let n = n as u128;
    match amount.checked_div(n) {
        Some(share) => (share, amount - share * n),
        None => (0, amount),
    }
}

/// `bps` of the validator's current self-stake, raised to the exposure it
/// locked on `request` and capped at what it still holds.
pub fn exposure_floor_slash(
    ledger: &StakeLedger,
    validator: &Principal,
    request: RequestId,
    bps: u32,
) -> Result<u128, StakingError> {
    let held = ledger
        .get(validator)
        .map(|s| s.self_stake)
        .ok_or_else(|| StakingError::UnknownValidator(validator.to_string()))?;
    let by_rate = ledger.slash_amount(validator, bps)?;
    Ok(by_rate.max(ledger.exposure_on(validator, request)).min(held))
}

/// Everything a finalization will do, computed before any of it happens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    pub request_id: RequestId,
    pub agent: Principal,
    pub model_id: ModelId,
    pub verified: bool,
    pub valid_count: usize,
    pub total: usize,
    pub consensus_confidence: u32,
    pub reward: u128,
    pub per_validator_reward: u128,
    pub rewards: Vec<(Principal, u128)>,
    pub retained: u128,
    /// Planned slash per dissenter. Exactly what applying will take.
    pub slashes: Vec<(Principal, u128)>,
    pub refundable: u128,
    /// Every submitter; their submission locks are released on apply.
    pub submitters: Vec<Principal>,
    /// Locks re-taken for the valid voters of a verified verdict.
    pub challenge_locks: Vec<(Principal, u128)>,
}

/// What a finalization did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub request_id: RequestId,
    pub agent: Principal,
    pub model_id: ModelId,
    pub verified: bool,
    pub valid_count: usize,
    pub total: usize,
    pub consensus_confidence: u32,
    pub reward: u128,
    pub per_validator_reward: u128,
    pub rewards: Vec<(Principal, u128)>,
    pub retained: u128,
    pub slashed: Vec<(Principal, u128)>,
    pub refundable: u128,
    pub trust_score: u64,
}

impl Settlement {
    pub fn total_slashed(&self) -> u128 {
        self.slashed.iter().map(|(_, amount)| amount).sum()
    }
}

impl SettlementPlan {
    pub fn total_slashed(&self) -> u128 {
        self.slashes.iter().map(|(_, amount)| amount).sum()
    }

    pub fn compute(
        record: &RequestRecord,
        tally: &Tally,
        registry: &ModelRegistry,
        ledger: &StakeLedger,
        params: &EngineParams,
    ) -> Result<Self, VerificationError> {
        let request = &record.request;
        registry.check_outcome(&request.model_id, tally.consensus)?;
        for result in &record.results {
            if ledger.get(&result.validator).is_none() {
                return Err(StakingError::UnknownValidator(result.validator.to_string()).into());
            }
        }

        let mut plan = Self {
            request_id: request.id,
            agent: request.agent.clone(),
            model_id: request.model_id.clone(),
            verified: tally.consensus,
            valid_count: tally.valid_count,
            total: tally.total,
            consensus_confidence: tally.confidence,
            reward: request.reward,
            per_validator_reward: 0,
            rewards: Vec::new(),
            retained: 0,
            slashes: Vec::new(),
            refundable: 0,
            submitters: record.results.iter().map(|r| r.validator.clone()).collect(),
            challenge_locks: Vec::new(),
        };

        if tally.consensus {
            let (share, remainder) = split_evenly(request.reward, record.results.len());
            plan.per_validator_reward = share;
            plan.retained = remainder;
            for result in &record.results {
                ledger.check_credit(&result.validator, share)?;
                plan.rewards.push((result.validator.clone(), share));
            }
            for validator in record.voters_for(true) {
                let lock = ledger.slash_amount(validator, params.challenge_slash_bps)?;
                plan.challenge_locks.push((validator.clone(), lock));
            }
        } else {
            plan.refundable = request.reward;
            for validator in record.voters_for(true) {
                let amount = exposure_floor_slash(ledger, validator, request.id, params.slash_bps)?;
                plan.slashes.push((validator.clone(), amount));
            }
        }
        Ok(plan)
    }

    /// Write the plan into the record and the engines.
    pub fn apply(
        self,
        record: &mut RequestRecord,
        registry: &mut ModelRegistry,
        ledger: &mut StakeLedger,
        trust: &mut TrustScores,
        params: &EngineParams,
        now: Timestamp,
    ) -> Result<Settlement, VerificationError> {
        for validator in &self.submitters {
            ledger.release_exposure(validator, self.request_id);
        }
        let window_closes = now.plus(params.challenge_window_secs);
        for (validator, amount) in &self.challenge_locks {
            ledger.commit_exposure(validator, self.request_id, *amount, Some(window_closes))?;
        }

        let request = &mut record.request;
        request.phase = RequestPhase::Finalized {
            verified: self.verified,
        };
        request.finalized_at = Some(now);
        request.consensus_confidence = Some(self.consensus_confidence);

        registry.record_outcome(&self.model_id, self.verified)?;

        for (validator, amount) in &self.rewards {
            if *amount > 0 {
                ledger.credit_reward(validator, *amount, now)?;
            }
        }

        let mut slashed = Vec::with_capacity(self.slashes.len());
        for (validator, amount) in self.slashes {
            let reason = SlashReason::IncorrectVerification {
                request_id: self.request_id,
            };
            let taken = ledger.slash(&validator, amount, reason, now)?;
            slashed.push((validator, taken));
        }

        let trust_score = if self.verified {
            trust.reward(&self.agent, params.trust_increment)
        } else {
            trust.penalize(&self.agent, params.trust_decrement)
        };

        tracing::info!(
            request = %self.request_id,
            verified = self.verified,
            valid = self.valid_count,
            total = self.total,
            confidence = self.consensus_confidence,
            per_validator = self.per_validator_reward,
            slashed = slashed.len(),
            "request finalized"
        );

        Ok(Settlement {
            request_id: self.request_id,
            agent: self.agent,
            model_id: self.model_id,
            verified: self.verified,
            valid_count: self.valid_count,
            total: self.total,
            consensus_confidence: self.consensus_confidence,
            reward: self.reward,
            per_validator_reward: self.per_validator_reward,
            rewards: self.rewards,
            retained: self.retained,
            slashed,
            refundable: self.refundable,
            trust_score,
        })
    }
}
