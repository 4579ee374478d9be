use poi_registry::RegistryError;
use poi_staking::StakingError;
use poi_types::{ChallengeId, ModelId, RequestId, Timestamp};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum VerificationError {
    #[error("request {0} not found")]
    RequestNotFound(RequestId),

    #[error("request {0} is already finalized")]
    RequestAlreadyFinalized(RequestId),

    #[error("request {0} is past its deadline")]
    RequestExpired(RequestId),

    #[error("{0} is not an active validator")]
    NotAValidator(String),

    #[error("{validator} already submitted a result for {request}")]
    DuplicateSubmission { request: RequestId, validator: String },

    #[error("confidence {0} exceeds 10000 basis points")]
    ConfidenceOutOfRange(u32),

    #[error("model {0} is not accepting requests")]
    ModelInactive(ModelId),

    #[error("deadline {deadline} is not after {now}")]
    InvalidDeadline { deadline: Timestamp, now: Timestamp },

    #[error("insufficient payment: needed {needed}, provided {provided}")]
    InsufficientFee { needed: u128, provided: u128 },

    #[error("agent trust {score} below required {required}")]
    InsufficientTrust { score: u64, required: u64 },

    #[error("quorum not reached: have {have}, need {need}")]
    QuorumNotReached { have: usize, need: usize },

    #[error("request {0} has no standing verified verdict")]
    RequestNotVerified(RequestId),

    #[error("challenge window for {request} closed at {closed_at}")]
    ChallengeWindowClosed { request: RequestId, closed_at: Timestamp },

    #[error("bond {bond} below minimum {minimum}")]
    BondTooLow { bond: u128, minimum: u128 },

    #[error("request {0} already has a pending challenge")]
    ChallengePending(RequestId),

    #[error("challenge {0} not found")]
    ChallengeNotFound(ChallengeId),

    #[error("{0} does not hold the arbitration role")]
    NotArbitrator(String),

    #[error("challenge {0} is already resolved")]
    AlreadyResolved(ChallengeId),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("staking: {0}")]
    Staking(#[from] StakingError),
}
