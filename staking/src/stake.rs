//! Validator stake records and the slashing audit trail.

use poi_types::{ChallengeId, Principal, RequestId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Self-stake held back from withdrawal on behalf of one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureLock {
    pub amount: u128,
    /// Last second the lock binds. `None` holds until released.
    pub until: Option<Timestamp>,
}

impl ExposureLock {
    pub fn binds_at(&self, now: Timestamp) -> bool {
        self.until.map_or(true, |until| !now.is_past(until))
    }
}

/// A validator's collateral and reward position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStake {
    pub validator: Principal,
    pub self_stake: u128,
    pub delegated_stake: u128,
    /// Number of times this validator has been slashed. Never decreases.
    pub slash_count: u32,
    pub total_slashed: u128,
    /// Rewards credited by settlement and not yet claimed.
    pub accrued_rewards: u128,
    /// Per-request locks: a request still collecting votes, or a verified
    /// verdict that can still be challenged.
    pub exposure: BTreeMap<RequestId, ExposureLock>,
    pub last_update: Timestamp,
    pub active: bool,
}

impl ValidatorStake {
    pub(crate) fn new(validator: Principal, now: Timestamp) -> Self {
        Self {
            validator,
            self_stake: 0,
            delegated_stake: 0,
            slash_count: 0,
            total_slashed: 0,
            accrued_rewards: 0,
            exposure: BTreeMap::new(),
            last_update: now,
            active: false,
        }
    }

    /// Self-stake plus delegated stake.
    pub fn total_stake(&self) -> u128 {
        self.self_stake.saturating_add(self.delegated_stake)
    }

    /// Sum of the locks still binding at `now`. Lapsed locks count for nothing.
    pub fn committed_exposure(&self, now: Timestamp) -> u128 {
        self.exposure
            .values()
            .filter(|lock| lock.binds_at(now))
            .fold(0u128, |sum, lock| sum.saturating_add(lock.amount))
    }

    /// Lock held for `request`, lapsed or not.
    pub fn exposure_on(&self, request: RequestId) -> u128 {
        self.exposure.get(&request).map_or(0, |lock| lock.amount)
    }

    pub(crate) fn refresh_active(&mut self, minimum_stake: u128) {
        self.active = self.self_stake > 0 && self.self_stake >= minimum_stake;
    }
}

/// Stake a third party has delegated to a validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationPosition {
    pub delegator: Principal,
    pub validator: Principal,
    pub amount: u128,
}

/// Why a validator lost stake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashReason {
    /// Voted against the majority on a request that finalized rejected.
    IncorrectVerification { request_id: RequestId },
    /// Voted with a majority whose verdict was later overturned.
    UpheldChallenge { challenge_id: ChallengeId },
}

impl fmt::Display for SlashReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncorrectVerification { request_id } => {
                write!(f, "incorrect verification on {request_id}")
            }
            Self::UpheldChallenge { challenge_id } => {
                write!(f, "verdict overturned by {challenge_id}")
            }
        }
    }
}

/// One entry in the slashing audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashRecord {
    pub validator: Principal,
    /// Amount actually removed (may be less than requested if stake ran out).
    pub amount: u128,
    pub reason: SlashReason,
    pub at: Timestamp,
}
