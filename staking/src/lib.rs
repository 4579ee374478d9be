//! Validator stake ledger.
//!
//! Every validator's collateral lives here:
//! - Self-stake, which decides whether the validator is active
//! - Delegated stake from third parties
//! - Accrued (unclaimed) rewards credited by consensus settlement
//! - Slashing history, kept as an append-only audit trail
//! - Exposure locks, one per request the validator is answerable for, below
//!   whose sum it cannot unstake. A lock on a request still collecting votes
//!   lapses at the request's deadline; a lock on a verified verdict lapses
//!   when the challenge window closes and is held while a challenge is pending

pub mod error;
pub mod ledger;
pub mod stake;

pub use error::StakingError;
pub use ledger::StakeLedger;
pub use stake::{DelegationPosition, ExposureLock, SlashReason, SlashRecord, ValidatorStake};
