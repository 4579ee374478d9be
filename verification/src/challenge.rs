//! Post-finalization challenges against verified verdicts.
//!
//! Anyone may post a bond against a verified request while its challenge
//! window is open. An arbitrator then decides:
//! - Upheld: the validators who voted valid are slashed, the challenger is
//!   owed the bond plus everything slashed, and the verdict is reversed
//! - Rejected: the bond is split across the validators who voted valid and
//!   the verdict stands
//!
//! The majority's challenge locks stop lapsing while a challenge is pending,
//! so they cannot unstake out from under the slash. An upheld challenge
//! releases them after slashing; a rejected one returns them to the window
//! close.

use crate::error::VerificationError;
use crate::settlement::{exposure_floor_slash, split_evenly};
use crate::state::{RequestPhase, RequestRecord};
use crate::trust::TrustScores;
use poi_registry::ModelRegistry;
use poi_staking::{SlashReason, StakeLedger, StakingError};
use poi_types::{ChallengeId, EngineParams, Principal, RequestId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Pending,
    Upheld,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub request_id: RequestId,
    pub challenger: Principal,
    pub reason: String,
    pub evidence: String,
    /// Held by the treasury until resolution.
    pub bond: u128,
    pub status: ChallengeStatus,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub arbitrator: Option<Principal>,
}

/// A challenge as filed.
#[derive(Clone, Debug)]
pub struct ChallengeFiling {
    pub challenger: Principal,
    pub reason: String,
    pub evidence: String,
    pub bond: u128,
}

/// What a resolution did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeResolution {
    pub challenge_id: ChallengeId,
    pub request_id: RequestId,
    pub challenger: Principal,
    pub upheld: bool,
    pub bond: u128,
    /// Stake taken from the original majority (upheld only).
    pub slashed: Vec<(Principal, u128)>,
    /// Owed to the challenger: bond plus slashed stake (upheld only).
    pub challenger_payout: u128,
    /// Bond shares credited to the original majority (rejected only).
    pub compensated: Vec<(Principal, u128)>,
    /// Undistributable remainder of the bond (rejected only).
    pub retained: u128,
}

/// Owns every challenge and the set of principals allowed to resolve them.
#[derive(Debug, Default)]
pub struct DisputeResolver {
    challenges: BTreeMap<ChallengeId, Challenge>,
    arbitrators: BTreeSet<Principal>,
    next_id: u64,
}

impl DisputeResolver {
    pub fn new(arbitrators: impl IntoIterator<Item = Principal>) -> Self {
        Self {
            challenges: BTreeMap::new(),
            arbitrators: arbitrators.into_iter().collect(),
            next_id: 1,
        }
    }

    /// Rebuild from persisted challenges. Ids continue after the highest one seen.
    pub fn from_parts(
        arbitrators: impl IntoIterator<Item = Principal>,
        challenges: impl IntoIterator<Item = Challenge>,
    ) -> Self {
        let mut resolver = Self::new(arbitrators);
        resolver.challenges = challenges.into_iter().map(|c| (c.id, c)).collect();
        resolver.next_id = resolver
            .challenges
            .keys()
            .next_back()
            .map_or(1, |id| id.raw() + 1);
        resolver
    }

    pub fn is_arbitrator(&self, principal: &Principal) -> bool {
        self.arbitrators.contains(principal)
    }

    pub fn get(&self, id: ChallengeId) -> Option<&Challenge> {
        self.challenges.get(&id)
    }

    /// The request a challenge targets.
    pub fn request_of(&self, id: ChallengeId) -> Result<RequestId, VerificationError> {
        self.challenges
            .get(&id)
            .map(|c| c.request_id)
            .ok_or(VerificationError::ChallengeNotFound(id))
    }

    /// Every challenge ever filed against a request, oldest first.
    pub fn challenges_for(&self, request_id: RequestId) -> impl Iterator<Item = &Challenge> {
        self.challenges
            .values()
            .filter(move |c| c.request_id == request_id)
    }

    pub fn challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.challenges.values()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    /// File a challenge. The request moves to `Disputed` and the majority's
    /// challenge locks are held until resolution.
    ///
    /// The window is checked before the bond so a late challenger learns
    /// the real reason first.
    pub fn open(
        &mut self,
        record: &mut RequestRecord,
        ledger: &mut StakeLedger,
        filing: ChallengeFiling,
        minimum_bond: u128,
        params: &EngineParams,
        now: Timestamp,
    ) -> Result<ChallengeId, VerificationError> {
        let request = &mut record.request;
        if !request.phase.verified() {
            return Err(VerificationError::RequestNotVerified(request.id));
        }
        let finalized_at = request.finalized_at.unwrap_or(request.created_at);
        if finalized_at.window_elapsed(params.challenge_window_secs, now) {
            return Err(VerificationError::ChallengeWindowClosed {
                request: request.id,
                closed_at: finalized_at.plus(params.challenge_window_secs),
            });
        }
        if filing.bond < minimum_bond {
            return Err(VerificationError::BondTooLow {
                bond: filing.bond,
                minimum: minimum_bond,
            });
        }
        if request.phase == RequestPhase::Disputed {
            return Err(VerificationError::ChallengePending(request.id));
        }

        let id = ChallengeId::new(self.next_id);
        self.next_id += 1;
        request.phase = RequestPhase::Disputed;
        let request_id = request.id;
        for validator in record.voters_for(true) {
            ledger.hold_exposure(validator, request_id, None);
        }
        tracing::info!(
            challenge = %id,
            request = %request_id,
            challenger = %filing.challenger,
            bond = filing.bond,
            "challenge opened"
        );
        self.challenges.insert(
            id,
            Challenge {
                id,
                request_id,
                challenger: filing.challenger,
                reason: filing.reason,
                evidence: filing.evidence,
                bond: filing.bond,
                status: ChallengeStatus::Pending,
                created_at: now,
                resolved_at: None,
                arbitrator: None,
            },
        );
        Ok(id)
    }

    /// Decide a pending challenge.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        &mut self,
        id: ChallengeId,
        upheld: bool,
        arbitrator: &Principal,
        record: &mut RequestRecord,
        registry: &mut ModelRegistry,
        ledger: &mut StakeLedger,
        trust: &mut TrustScores,
        params: &EngineParams,
        now: Timestamp,
    ) -> Result<ChallengeResolution, VerificationError> {
        let challenge = self
            .challenges
            .get(&id)
            .ok_or(VerificationError::ChallengeNotFound(id))?;
        if !self.arbitrators.contains(arbitrator) {
            return Err(VerificationError::NotArbitrator(arbitrator.to_string()));
        }
        if challenge.status != ChallengeStatus::Pending {
            return Err(VerificationError::AlreadyResolved(id));
        }
        if challenge.request_id != record.id() {
            return Err(VerificationError::RequestNotFound(challenge.request_id));
        }

        let majority: Vec<Principal> = record.voters_for(true).cloned().collect();
        for validator in &majority {
            if ledger.get(validator).is_none() {
                return Err(StakingError::UnknownValidator(validator.to_string()).into());
            }
        }
        registry.get(&record.request.model_id)?;

        let mut resolution = ChallengeResolution {
            challenge_id: id,
            request_id: challenge.request_id,
            challenger: challenge.challenger.clone(),
            upheld,
            bond: challenge.bond,
            slashed: Vec::new(),
            challenger_payout: 0,
            compensated: Vec::new(),
            retained: 0,
        };

        if upheld {
            let mut planned = Vec::with_capacity(majority.len());
            for validator in &majority {
                planned.push(exposure_floor_slash(
                    ledger,
                    validator,
                    record.id(),
                    params.challenge_slash_bps,
                )?);
            }
            let mut payout = challenge.bond;
            for (validator, amount) in majority.into_iter().zip(planned) {
                let reason = SlashReason::UpheldChallenge { challenge_id: id };
                let taken = ledger.slash(&validator, amount, reason, now)?;
                ledger.release_exposure(&validator, record.id());
                payout = payout.saturating_add(taken);
                resolution.slashed.push((validator, taken));
            }
            resolution.challenger_payout = payout;
            record.request.phase = RequestPhase::Reversed;
            registry.revoke_success(&record.request.model_id)?;
            trust.penalize(&record.request.agent, params.trust_decrement);
        } else {
            let (share, remainder) = split_evenly(challenge.bond, majority.len());
            for validator in &majority {
                ledger.check_credit(validator, share)?;
            }
            let finalized_at = record.request.finalized_at.unwrap_or(record.request.created_at);
            let window_closes = finalized_at.plus(params.challenge_window_secs);
            for validator in majority {
                if share > 0 {
                    ledger.credit_reward(&validator, share, now)?;
                }
                ledger.hold_exposure(&validator, record.id(), Some(window_closes));
                resolution.compensated.push((validator, share));
            }
            resolution.retained = remainder;
            record.request.phase = RequestPhase::Finalized { verified: true };
        }

        if let Some(challenge) = self.challenges.get_mut(&id) {
            challenge.status = if upheld {
                ChallengeStatus::Upheld
            } else {
                ChallengeStatus::Rejected
            };
            challenge.resolved_at = Some(now);
            challenge.arbitrator = Some(arbitrator.clone());
        }
        tracing::info!(
            challenge = %id,
            request = %resolution.request_id,
            upheld,
            arbitrator = %arbitrator,
            payout = resolution.challenger_payout,
            "challenge resolved"
        );
        Ok(resolution)
    }
}
