//! Verification of inference claims.
//!
//! A request moves through a fixed lifecycle:
//! 1. **Open**: an agent pays the model fee, escrows a reward and names a deadline.
//! 2. **Submit**: staked validators hand in independent verdicts until quorum.
//! 3. **Finalize**: a simple majority decides; rewards and slashes are settled
//!    in one step and the agent's trust score moves.
//! 4. **Challenge**: a verified verdict can be contested within a window and
//!    reversed by an arbitrator.
//!
//! The components here hold no locks and read no clock. Callers pass in the
//! registry, ledger and trust engines they operate on, plus the current time.

pub mod challenge;
pub mod consensus;
pub mod error;
pub mod method;
pub mod request;
pub mod settlement;
pub mod state;
pub mod trust;

pub use challenge::{
    Challenge, ChallengeFiling, ChallengeResolution, ChallengeStatus, DisputeResolver,
};
pub use consensus::{tally, ConsensusFinalizer, Submission, SubmitOutcome, Tally};
pub use error::VerificationError;
pub use method::VerificationMethod;
pub use request::{NewRequest, PaymentSplit, RequestLifecycle};
pub use settlement::{split_evenly, Settlement, SettlementPlan};
pub use state::{InferenceRequest, RequestPhase, RequestRecord, VerificationResult};
pub use trust::TrustScores;
