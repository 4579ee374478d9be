//! Collecting validator submissions and finalizing at quorum.

use crate::error::VerificationError;
use crate::method::VerificationMethod;
use crate::settlement::{Settlement, SettlementPlan};
use crate::state::{RequestPhase, RequestRecord, VerificationResult};
use crate::trust::TrustScores;
use poi_registry::ModelRegistry;
use poi_staking::StakeLedger;
use poi_types::{EngineParams, Principal, Timestamp, BPS_DENOMINATOR};

/// A validator's verdict as handed in.
#[derive(Clone, Debug)]
pub struct Submission {
    pub validator: Principal,
    pub is_valid: bool,
    pub confidence: u32,
    pub proof: Vec<u8>,
    pub method: VerificationMethod,
}

/// Whether a submission brought the request to quorum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Pending { count: usize, quorum: usize },
    QuorumReached { count: usize },
}

/// Majority count over a result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tally {
    pub valid_count: usize,
    pub total: usize,
    /// Strict majority said valid. Ties are not a majority.
    pub consensus: bool,
    /// Floor of the mean confidence, basis points.
    pub confidence: u32,
}

/// Count verdicts. `None` for an empty result set.
pub fn tally(results: &[VerificationResult]) -> Option<Tally> {
    let total = results.len();
    if total == 0 {
        return None;
    }
    let valid_count = results.iter().filter(|r| r.is_valid).count();
    let sum: u64 = results.iter().map(|r| u64::from(r.confidence)).sum();
    Some(Tally {
        valid_count,
        total,
        consensus: valid_count * 2 > total,
        confidence: (sum / total as u64) as u32,
    })
}

/// Accepts submissions and runs finalization once quorum is reached.
pub struct ConsensusFinalizer;

impl ConsensusFinalizer {
    /// Append a validator's result and lock its exposure.
    ///
    /// Checks run in a fixed order so callers see the same error for the
    /// same situation: finalized, expired, not a validator, duplicate,
    /// confidence range.
    pub fn submit(
        &self,
        record: &mut RequestRecord,
        ledger: &mut StakeLedger,
        submission: Submission,
        params: &EngineParams,
        now: Timestamp,
    ) -> Result<SubmitOutcome, VerificationError> {
        let id = record.id();
        if record.request.phase != RequestPhase::Open {
            return Err(VerificationError::RequestAlreadyFinalized(id));
        }
        if record.request.is_expired(now) {
            return Err(VerificationError::RequestExpired(id));
        }
        if !ledger.is_active(&submission.validator) {
            return Err(VerificationError::NotAValidator(submission.validator.to_string()));
        }
        if record.has_submitted(&submission.validator) {
            return Err(VerificationError::DuplicateSubmission {
                request: id,
                validator: submission.validator.to_string(),
            });
        }
        if submission.confidence > BPS_DENOMINATOR {
            return Err(VerificationError::ConfidenceOutOfRange(submission.confidence));
        }

        // Binds through the deadline; past it the request can no longer settle.
        let exposure = ledger.slash_amount(&submission.validator, params.slash_bps)?;
        ledger.commit_exposure(&submission.validator, id, exposure, Some(record.request.deadline))?;

        tracing::debug!(
            request = %id,
            validator = %submission.validator,
            is_valid = submission.is_valid,
            confidence = submission.confidence,
            method = %submission.method,
            "verification submitted"
        );
        record.results.push(VerificationResult {
            validator: submission.validator,
            is_valid: submission.is_valid,
            confidence: submission.confidence,
            proof: submission.proof,
            submitted_at: now,
            method: submission.method,
        });

        let count = record.results.len();
        let quorum = params.quorum as usize;
        if count >= quorum {
            Ok(SubmitOutcome::QuorumReached { count })
        } else {
            Ok(SubmitOutcome::Pending { count, quorum })
        }
    }

    /// Undo the most recent [`Self::submit`] on an open request: drop the
    /// result and its exposure lock. Used when the settlement that submission
    /// triggered cannot be carried out.
    pub fn retract(&self, record: &mut RequestRecord, ledger: &mut StakeLedger) {
        if record.request.phase != RequestPhase::Open {
            return;
        }
        if let Some(result) = record.results.pop() {
            ledger.release_exposure(&result.validator, record.request.id);
            tracing::debug!(request = %record.request.id, validator = %result.validator, "submission retracted");
        }
    }

    /// Work out what settling a request at quorum would do, writing nothing.
    pub fn plan(
        &self,
        record: &RequestRecord,
        registry: &ModelRegistry,
        ledger: &StakeLedger,
        params: &EngineParams,
    ) -> Result<SettlementPlan, VerificationError> {
        if record.request.phase != RequestPhase::Open {
            return Err(VerificationError::RequestAlreadyFinalized(record.id()));
        }
        let need = params.quorum as usize;
        let have = record.results.len();
        let counted = match tally(&record.results) {
            Some(t) if have >= need => t,
            _ => return Err(VerificationError::QuorumNotReached { have, need }),
        };
        SettlementPlan::compute(record, &counted, registry, ledger, params)
    }

    /// Settle a request that has reached quorum.
    ///
    /// The plan is computed and checked against the registry and ledger
    /// before anything is written.
    pub fn finalize(
        &self,
        record: &mut RequestRecord,
        registry: &mut ModelRegistry,
        ledger: &mut StakeLedger,
        trust: &mut TrustScores,
        params: &EngineParams,
        now: Timestamp,
    ) -> Result<Settlement, VerificationError> {
        let plan = self.plan(record, registry, ledger, params)?;
        plan.apply(record, registry, ledger, trust, params, now)
    }
}
