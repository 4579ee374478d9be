//! The stake ledger engine.

use crate::error::StakingError;
use crate::stake::{DelegationPosition, ExposureLock, SlashReason, SlashRecord, ValidatorStake};
use poi_types::{bps_of, Principal, RequestId, Timestamp};
use std::collections::HashMap;

/// Stake, delegation, reward and slashing state for every validator.
///
/// A validator is "a validator" exactly when its entry is `active`, which
/// requires a non-zero self-stake of at least `minimum_stake`.
#[derive(Debug)]
pub struct StakeLedger {
    stakes: HashMap<Principal, ValidatorStake>,
    /// (delegator, validator) → delegated amount.
    delegations: HashMap<(Principal, Principal), u128>,
    slash_log: Vec<SlashRecord>,
    minimum_stake: u128,
}

impl StakeLedger {
    pub fn new(minimum_stake: u128) -> Self {
        Self {
            stakes: HashMap::new(),
            delegations: HashMap::new(),
            slash_log: Vec::new(),
            minimum_stake,
        }
    }

    /// Rebuild a ledger from persisted records.
    pub fn from_parts(
        minimum_stake: u128,
        stakes: impl IntoIterator<Item = ValidatorStake>,
        delegations: impl IntoIterator<Item = DelegationPosition>,
        slash_log: Vec<SlashRecord>,
    ) -> Self {
        let mut ledger = Self {
            stakes: stakes
                .into_iter()
                .map(|s| (s.validator.clone(), s))
                .collect(),
            delegations: delegations
                .into_iter()
                .map(|d| ((d.delegator, d.validator), d.amount))
                .collect(),
            slash_log,
            minimum_stake,
        };
        ledger.set_minimum_stake(minimum_stake);
        ledger
    }

    pub fn minimum_stake(&self) -> u128 {
        self.minimum_stake
    }

    /// Change the activation threshold and re-evaluate every validator.
    pub fn set_minimum_stake(&mut self, minimum_stake: u128) {
        self.minimum_stake = minimum_stake;
        for entry in self.stakes.values_mut() {
            entry.refresh_active(minimum_stake);
        }
    }

    /// Deposit self-stake. Creates the entry on first deposit.
    pub fn stake(
        &mut self,
        validator: &Principal,
        amount: u128,
        now: Timestamp,
    ) -> Result<&ValidatorStake, StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let minimum = self.minimum_stake;
        let entry = self
            .stakes
            .entry(validator.clone())
            .or_insert_with(|| ValidatorStake::new(validator.clone(), now));
        entry.self_stake = entry
            .self_stake
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        entry.last_update = now;
        entry.refresh_active(minimum);
        tracing::debug!(validator = %validator, amount, self_stake = entry.self_stake, "stake deposited");
        Ok(entry)
    }

    /// Withdraw self-stake. Returns the amount released to the validator.
    ///
    /// The remaining self-stake must still cover every exposure lock that
    /// binds at `now`. Lapsed locks are dropped here.
    pub fn unstake(
        &mut self,
        validator: &Principal,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let minimum = self.minimum_stake;
        let entry = self.entry_mut(validator)?;
        if amount > entry.self_stake {
            return Err(StakingError::InsufficientStake {
                requested: amount,
                available: entry.self_stake,
            });
        }
        entry.exposure.retain(|_, lock| lock.binds_at(now));
        let remaining = entry.self_stake - amount;
        let committed = entry.committed_exposure(now);
        if remaining < committed {
            return Err(StakingError::ExposureLocked { committed, remaining });
        }
        entry.self_stake = remaining;
        entry.last_update = now;
        entry.refresh_active(minimum);
        tracing::debug!(validator = %validator, amount, self_stake = remaining, "stake withdrawn");
        Ok(amount)
    }

    /// Delegate stake to a validator that has self-stake of its own.
    pub fn delegate(
        &mut self,
        delegator: &Principal,
        validator: &Principal,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        if delegator == validator {
            return Err(StakingError::SelfDelegation);
        }
        let entry = match self.stakes.get_mut(validator) {
            Some(entry) if entry.self_stake > 0 => entry,
            _ => return Err(StakingError::ValidatorInactive(validator.to_string())),
        };
        let position = self
            .delegations
            .entry((delegator.clone(), validator.clone()))
            .or_insert(0);
        let new_position = position.checked_add(amount).ok_or(StakingError::Overflow)?;
        entry.delegated_stake = entry
            .delegated_stake
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        *position = new_position;
        entry.last_update = now;
        Ok(())
    }

    /// Withdraw previously delegated stake. Returns the amount released.
    pub fn undelegate(
        &mut self,
        delegator: &Principal,
        validator: &Principal,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, StakingError> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let key = (delegator.clone(), validator.clone());
        let available = self.delegations.get(&key).copied().unwrap_or(0);
        if amount > available {
            return Err(StakingError::InsufficientDelegation {
                requested: amount,
                available,
            });
        }
        let entry = self.entry_mut(validator)?;
        entry.delegated_stake = entry.delegated_stake.saturating_sub(amount);
        entry.last_update = now;
        if available == amount {
            self.delegations.remove(&key);
        } else {
            self.delegations.insert(key, available - amount);
        }
        Ok(amount)
    }

    /// Remove up to `amount` of self-stake. Returns the amount actually slashed.
    pub fn slash(
        &mut self,
        validator: &Principal,
        amount: u128,
        reason: SlashReason,
        now: Timestamp,
    ) -> Result<u128, StakingError> {
        let minimum = self.minimum_stake;
        let entry = self.entry_mut(validator)?;
        let slashed = amount.min(entry.self_stake);
        entry.self_stake -= slashed;
        entry.slash_count = entry.slash_count.saturating_add(1);
        entry.total_slashed = entry.total_slashed.saturating_add(slashed);
        entry.last_update = now;
        entry.refresh_active(minimum);
        tracing::warn!(
            validator = %validator,
            amount = slashed,
            remaining = entry.self_stake,
            reason = %reason,
            "validator slashed"
        );
        self.slash_log.push(SlashRecord {
            validator: validator.clone(),
            amount: slashed,
            reason,
            at: now,
        });
        Ok(slashed)
    }

    /// Slash a share (basis points) of the validator's current self-stake.
    pub fn slash_bps(
        &mut self,
        validator: &Principal,
        bps: u32,
        reason: SlashReason,
        now: Timestamp,
    ) -> Result<u128, StakingError> {
        let amount = self.slash_amount(validator, bps)?;
        self.slash(validator, amount, reason, now)
    }

    /// What `slash_bps` would take right now, without taking it.
    pub fn slash_amount(&self, validator: &Principal, bps: u32) -> Result<u128, StakingError> {
        let entry = self.entry(validator)?;
        bps_of(entry.self_stake, bps).ok_or(StakingError::Overflow)
    }

    /// Add to a validator's unclaimed rewards.
    pub fn credit_reward(
        &mut self,
        validator: &Principal,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        let entry = self.entry_mut(validator)?;
        entry.accrued_rewards = entry
            .accrued_rewards
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        entry.last_update = now;
        Ok(())
    }

    /// Zero and return the validator's unclaimed rewards.
    pub fn claim_rewards(&mut self, validator: &Principal, now: Timestamp) -> Result<u128, StakingError> {
        let entry = self.entry_mut(validator)?;
        if entry.accrued_rewards == 0 {
            return Err(StakingError::NothingToClaim(validator.to_string()));
        }
        let payout = std::mem::take(&mut entry.accrued_rewards);
        entry.last_update = now;
        tracing::info!(validator = %validator, payout, "rewards claimed");
        Ok(payout)
    }

    /// Lock `amount` of self-stake for `request` until `until` (inclusive),
    /// or until released when `until` is `None`. Replaces any earlier lock
    /// the validator held for the same request.
    pub fn commit_exposure(
        &mut self,
        validator: &Principal,
        request: RequestId,
        amount: u128,
        until: Option<Timestamp>,
    ) -> Result<(), StakingError> {
        let entry = self.entry_mut(validator)?;
        entry.exposure.insert(request, ExposureLock { amount, until });
        Ok(())
    }

    /// Change how long an existing lock binds. No-op when there is no lock.
    pub fn hold_exposure(&mut self, validator: &Principal, request: RequestId, until: Option<Timestamp>) {
        if let Some(lock) = self
            .stakes
            .get_mut(validator)
            .and_then(|entry| entry.exposure.get_mut(&request))
        {
            lock.until = until;
        }
    }

    /// Drop the validator's lock for `request`. Unknown validators are ignored.
    pub fn release_exposure(&mut self, validator: &Principal, request: RequestId) {
        if let Some(entry) = self.stakes.get_mut(validator) {
            entry.exposure.remove(&request);
        }
    }

    /// The validator's lock amount for `request`, zero if none.
    pub fn exposure_on(&self, validator: &Principal, request: RequestId) -> u128 {
        self.stakes.get(validator).map_or(0, |entry| entry.exposure_on(request))
    }

    /// Whether crediting `amount` to the validator's rewards would succeed.
    pub fn check_credit(&self, validator: &Principal, amount: u128) -> Result<(), StakingError> {
        let entry = self.entry(validator)?;
        entry
            .accrued_rewards
            .checked_add(amount)
            .map(|_| ())
            .ok_or(StakingError::Overflow)
    }

    pub fn get(&self, validator: &Principal) -> Option<&ValidatorStake> {
        self.stakes.get(validator)
    }

    pub fn is_active(&self, validator: &Principal) -> bool {
        self.stakes.get(validator).is_some_and(|s| s.active)
    }

    pub fn delegation(&self, delegator: &Principal, validator: &Principal) -> u128 {
        self.delegations
            .get(&(delegator.clone(), validator.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Slashing audit trail for one validator, oldest first.
    pub fn slash_history<'a>(&'a self, validator: &'a Principal) -> impl Iterator<Item = &'a SlashRecord> {
        self.slash_log.iter().filter(move |r| r.validator == *validator)
    }

    pub fn slash_log(&self) -> &[SlashRecord] {
        &self.slash_log
    }

    pub fn stakes(&self) -> impl Iterator<Item = &ValidatorStake> {
        self.stakes.values()
    }

    pub fn delegations(&self) -> impl Iterator<Item = DelegationPosition> + '_ {
        self.delegations
            .iter()
            .map(|((delegator, validator), amount)| DelegationPosition {
                delegator: delegator.clone(),
                validator: validator.clone(),
                amount: *amount,
            })
    }

    fn entry(&self, validator: &Principal) -> Result<&ValidatorStake, StakingError> {
        self.stakes
            .get(validator)
            .ok_or_else(|| StakingError::UnknownValidator(validator.to_string()))
    }

    fn entry_mut(&mut self, validator: &Principal) -> Result<&mut ValidatorStake, StakingError> {
        self.stakes
            .get_mut(validator)
            .ok_or_else(|| StakingError::UnknownValidator(validator.to_string()))
    }
}
