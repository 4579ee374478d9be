use poi_registry::RegistryError;
use poi_staking::StakingError;
use poi_store::StoreError;
use poi_store_lmdb::LmdbError;
use poi_types::RequestId;
use poi_verification::VerificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArbiterError {
    #[error("arbiter is paused")]
    Paused,

    #[error("{0} is not authorized for this operation")]
    Unauthorized(String),

    #[error("{kind} reference already attached to {request}")]
    ReferenceAlreadyAttached { request: RequestId, kind: &'static str },

    #[error("request {0} has not completed")]
    RequestNotCompleted(RequestId),

    #[error("request {0} has no refundable escrow")]
    RequestNotRefundable(RequestId),

    #[error("request {0} was already refunded")]
    AlreadyRefunded(RequestId),

    #[error("emergency withdrawal requires the arbiter to be paused")]
    NotPaused,

    #[error("insufficient treasury funds: requested {requested}, available {available}")]
    InsufficientTreasury { requested: u128, available: u128 },

    #[error("nothing to claim for {0}")]
    NothingToClaim(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("staking error: {0}")]
    Staking(#[from] StakingError),

    #[error("verification error: {0}")]
    Verification(#[from] VerificationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] LmdbError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("arithmetic overflow")]
    Overflow,
}

/// Broad category of a failure, for callers that only need to know whose
/// fault it was. No class is retried and none leaves a state change behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or unknown input.
    Validation,
    /// The caller lacks the role the operation needs.
    Authorization,
    /// The target is in the wrong state for the operation.
    StateConflict,
    /// Funds, fees, stake or trust fall short.
    Economic,
    /// Persistence, configuration or instrumentation failed.
    Infrastructure,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::StateConflict => "state_conflict",
            Self::Economic => "economic",
            Self::Infrastructure => "infrastructure",
        }
    }
}

impl ArbiterError {
    pub fn class(&self) -> ErrorClass {
        use ErrorClass::*;
        match self {
            Self::Paused
            | Self::ReferenceAlreadyAttached { .. }
            | Self::RequestNotCompleted(_)
            | Self::RequestNotRefundable(_)
            | Self::AlreadyRefunded(_)
            | Self::NotPaused => StateConflict,
            Self::Unauthorized(_) => Authorization,
            Self::InsufficientTreasury { .. } | Self::NothingToClaim(_) | Self::Overflow => {
                Economic
            }
            Self::Registry(e) => registry_class(e),
            Self::Staking(e) => staking_class(e),
            Self::Verification(e) => match e {
                VerificationError::RequestNotFound(_)
                | VerificationError::ChallengeNotFound(_)
                | VerificationError::ConfidenceOutOfRange(_)
                | VerificationError::InvalidDeadline { .. } => Validation,
                VerificationError::NotAValidator(_) | VerificationError::NotArbitrator(_) => {
                    Authorization
                }
                VerificationError::RequestAlreadyFinalized(_)
                | VerificationError::RequestExpired(_)
                | VerificationError::DuplicateSubmission { .. }
                | VerificationError::ModelInactive(_)
                | VerificationError::QuorumNotReached { .. }
                | VerificationError::RequestNotVerified(_)
                | VerificationError::ChallengeWindowClosed { .. }
                | VerificationError::ChallengePending(_)
                | VerificationError::AlreadyResolved(_) => StateConflict,
                VerificationError::InsufficientFee { .. }
                | VerificationError::InsufficientTrust { .. }
                | VerificationError::BondTooLow { .. }
                | VerificationError::Overflow => Economic,
                VerificationError::Registry(inner) => registry_class(inner),
                VerificationError::Staking(inner) => staking_class(inner),
            },
            Self::Store(_)
            | Self::Lmdb(_)
            | Self::Serialization(_)
            | Self::Metrics(_)
            | Self::Config(_) => Infrastructure,
        }
    }
}

fn registry_class(e: &RegistryError) -> ErrorClass {
    match e {
        RegistryError::DuplicateModel(_) => ErrorClass::StateConflict,
        RegistryError::Unauthorized { .. } => ErrorClass::Authorization,
        RegistryError::Overflow(_) => ErrorClass::Economic,
        RegistryError::InvalidFee | RegistryError::NotFound(_) | RegistryError::OutOfRange { .. } => {
            ErrorClass::Validation
        }
    }
}

fn staking_class(e: &StakingError) -> ErrorClass {
    match e {
        StakingError::ZeroAmount | StakingError::UnknownValidator(_) | StakingError::SelfDelegation => {
            ErrorClass::Validation
        }
        StakingError::ExposureLocked { .. } | StakingError::ValidatorInactive(_) => {
            ErrorClass::StateConflict
        }
        StakingError::InsufficientStake { .. }
        | StakingError::InsufficientDelegation { .. }
        | StakingError::NothingToClaim(_)
        | StakingError::Overflow => ErrorClass::Economic,
    }
}
