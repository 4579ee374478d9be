//! Ledger-specific errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StakingError {
    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("validator {0} has no stake entry")]
    UnknownValidator(String),

    #[error("insufficient stake: requested {requested}, available {available}")]
    InsufficientStake { requested: u128, available: u128 },

    #[error("stake locked by open commitments: {committed} committed, {remaining} would remain")]
    ExposureLocked { committed: u128, remaining: u128 },

    #[error("validator {0} has no self-stake and cannot receive delegation")]
    ValidatorInactive(String),

    #[error("a validator cannot delegate to itself")]
    SelfDelegation,

    #[error("insufficient delegation: requested {requested}, available {available}")]
    InsufficientDelegation { requested: u128, available: u128 },

    #[error("validator {0} has no rewards to claim")]
    NothingToClaim(String),

    #[error("arithmetic overflow in stake ledger")]
    Overflow,
}
