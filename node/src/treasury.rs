//! The arbiter's books.
//!
//! Every unit an agent or challenger hands over lands in exactly one bucket:
//! - `escrow`: declared rewards of requests that have not settled yet, and
//!   of rejected or expired requests until the agent is refunded
//! - `bonds`: challenge bonds awaiting resolution
//! - `reward_pool`: validator rewards credited but not yet claimed
//! - `owner_earnings`: verification fees owed to model owners
//! - `challenger_payouts`: upheld-challenge payouts not yet claimed
//! - `retained` and `slashed_pool`: unallocated funds, the only buckets an
//!   emergency withdrawal may touch

use crate::ArbiterError;
use poi_types::Principal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    pub escrow: u128,
    pub bonds: u128,
    pub reward_pool: u128,
    /// Division remainders of rewards and rejected bonds.
    pub retained: u128,
    /// Stake taken by slashing on rejected requests.
    pub slashed_pool: u128,
    pub owner_earnings: BTreeMap<Principal, u128>,
    pub challenger_payouts: BTreeMap<Principal, u128>,
    pub withdrawn: u128,
}

fn add(bucket: &mut u128, amount: u128) -> Result<(), ArbiterError> {
    *bucket = bucket.checked_add(amount).ok_or(ArbiterError::Overflow)?;
    Ok(())
}

fn sub(bucket: &mut u128, amount: u128) -> Result<(), ArbiterError> {
    *bucket = bucket
        .checked_sub(amount)
        .ok_or(ArbiterError::InsufficientTreasury {
            requested: amount,
            available: *bucket,
        })?;
    Ok(())
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take in a new request: the fee is owed to the owner, the reward is escrowed.
    pub fn receive_request(&mut self, owner: &Principal, fee: u128, escrow: u128) -> Result<(), ArbiterError> {
        add(&mut self.escrow, escrow)?;
        add(self.owner_earnings.entry(owner.clone()).or_default(), fee)
    }

    /// A verified request moves its escrow to validator rewards and the remainder.
    pub fn settle_verified(&mut self, reward: u128, distributed: u128, retained: u128) -> Result<(), ArbiterError> {
        sub(&mut self.escrow, reward)?;
        add(&mut self.reward_pool, distributed)?;
        add(&mut self.retained, retained)
    }

    /// Slashed stake enters the treasury.
    pub fn receive_slashed(&mut self, amount: u128) -> Result<(), ArbiterError> {
        add(&mut self.slashed_pool, amount)
    }

    /// Return a rejected or expired request's escrow to its agent.
    pub fn refund(&mut self, amount: u128) -> Result<(), ArbiterError> {
        sub(&mut self.escrow, amount)
    }

    pub fn receive_bond(&mut self, bond: u128) -> Result<(), ArbiterError> {
        add(&mut self.bonds, bond)
    }

    /// An upheld challenge releases the bond and owes it, plus the slashed
    /// stake, to the challenger.
    pub fn settle_upheld(&mut self, challenger: &Principal, bond: u128, payout: u128) -> Result<(), ArbiterError> {
        sub(&mut self.bonds, bond)?;
        add(self.challenger_payouts.entry(challenger.clone()).or_default(), payout)
    }

    /// A rejected challenge pays the bond to the majority validators.
    pub fn settle_rejected(&mut self, bond: u128, distributed: u128, retained: u128) -> Result<(), ArbiterError> {
        sub(&mut self.bonds, bond)?;
        add(&mut self.reward_pool, distributed)?;
        add(&mut self.retained, retained)
    }

    pub fn pay_rewards(&mut self, amount: u128) -> Result<(), ArbiterError> {
        sub(&mut self.reward_pool, amount)
    }

    pub fn withdraw_fees(&mut self, owner: &Principal) -> Result<u128, ArbiterError> {
        match self.owner_earnings.remove(owner) {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(ArbiterError::NothingToClaim(owner.to_string())),
        }
    }

    pub fn claim_challenge_payout(&mut self, challenger: &Principal) -> Result<u128, ArbiterError> {
        match self.challenger_payouts.remove(challenger) {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(ArbiterError::NothingToClaim(challenger.to_string())),
        }
    }

    /// Funds no one has a claim on.
    pub fn unallocated(&self) -> u128 {
        self.retained.saturating_add(self.slashed_pool)
    }

    /// Take from the unallocated buckets, retained first.
    pub fn withdraw_unallocated(&mut self, amount: u128) -> Result<(), ArbiterError> {
        let available = self.unallocated();
        if amount == 0 || amount > available {
            return Err(ArbiterError::InsufficientTreasury {
                requested: amount,
                available,
            });
        }
        let from_retained = amount.min(self.retained);
        self.retained -= from_retained;
        self.slashed_pool -= amount - from_retained;
        add(&mut self.withdrawn, amount)
    }

    /// Everything currently held, claimed or not.
    pub fn total_held(&self) -> u128 {
        let owed: u128 = self
            .owner_earnings
            .values()
            .chain(self.challenger_payouts.values())
            .fold(0u128, |acc, v| acc.saturating_add(*v));
        self.escrow
            .saturating_add(self.bonds)
            .saturating_add(self.reward_pool)
            .saturating_add(self.unallocated())
            .saturating_add(owed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Principal {
        Principal::new("0xowner")
    }

    #[test]
    fn request_flow_balances() {
        let mut t = Treasury::new();
        t.receive_request(&owner(), 10, 301).unwrap();
        assert_eq!(t.escrow, 301);
        assert_eq!(t.owner_earnings[&owner()], 10);

        t.settle_verified(301, 300, 1).unwrap();
        assert_eq!(t.escrow, 0);
        assert_eq!(t.reward_pool, 300);
        assert_eq!(t.retained, 1);
        assert_eq!(t.total_held(), 311);
    }

    #[test]
    fn fees_withdraw_once() {
        let mut t = Treasury::new();
        t.receive_request(&owner(), 10, 0).unwrap();
        assert_eq!(t.withdraw_fees(&owner()).unwrap(), 10);
        assert!(matches!(t.withdraw_fees(&owner()), Err(ArbiterError::NothingToClaim(_))));
    }

    #[test]
    fn emergency_withdrawal_never_touches_escrow_or_bonds() {
        let mut t = Treasury::new();
        t.receive_request(&owner(), 10, 500).unwrap();
        t.receive_bond(1_000).unwrap();
        t.receive_slashed(40).unwrap();
        t.retained = 2;

        assert_eq!(t.unallocated(), 42);
        assert!(matches!(
            t.withdraw_unallocated(43),
            Err(ArbiterError::InsufficientTreasury { requested: 43, available: 42 })
        ));
        t.withdraw_unallocated(41).unwrap();
        assert_eq!(t.retained, 0);
        assert_eq!(t.slashed_pool, 1);
        assert_eq!(t.escrow, 500);
        assert_eq!(t.bonds, 1_000);
        assert_eq!(t.withdrawn, 41);
    }

    #[test]
    fn upheld_challenge_owes_bond_plus_slash() {
        let mut t = Treasury::new();
        t.receive_bond(1_000).unwrap();
        let challenger = Principal::new("0xchallenger");
        t.settle_upheld(&challenger, 1_000, 1_900).unwrap();
        assert_eq!(t.bonds, 0);
        assert_eq!(t.claim_challenge_payout(&challenger).unwrap(), 1_900);
        assert!(t.claim_challenge_payout(&challenger).is_err());
    }

    #[test]
    fn refund_cannot_exceed_escrow() {
        let mut t = Treasury::new();
        t.receive_request(&owner(), 1, 5).unwrap();
        assert!(matches!(t.refund(6), Err(ArbiterError::InsufficientTreasury { .. })));
        t.refund(5).unwrap();
        assert_eq!(t.escrow, 0);
    }
}
