//! Opening verification requests.

use crate::error::VerificationError;
use crate::state::{InferenceRequest, RequestPhase, RequestRecord};
use crate::trust::TrustScores;
use poi_crypto::request_content_hash;
use poi_registry::ModelRegistry;
use poi_types::{EngineParams, ModelId, Principal, RequestId, Timestamp};

/// What an agent hands in when asking for verification.
#[derive(Clone, Debug)]
pub struct NewRequest {
    pub agent: Principal,
    pub model_id: ModelId,
    pub input: Vec<u8>,
    pub expected_output: Vec<u8>,
    pub reward: u128,
    pub deadline: Timestamp,
    /// Everything the agent attached: fee, reward escrow and any excess.
    pub payment: u128,
}

/// How an attached payment was divided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentSplit {
    /// Owed to the model owner.
    pub fee: u128,
    /// Held until settlement or refund.
    pub escrow: u128,
    /// Returned to the agent immediately.
    pub change: u128,
}

/// Validates new requests and builds their records. Ids are allocated by the caller.
pub struct RequestLifecycle;

impl RequestLifecycle {
    /// Check and build a request, counting it against the model.
    ///
    /// Nothing is mutated unless every check passes.
    pub fn open(
        &self,
        registry: &mut ModelRegistry,
        trust: &TrustScores,
        id: RequestId,
        new: NewRequest,
        params: &EngineParams,
        now: Timestamp,
    ) -> Result<(RequestRecord, PaymentSplit), VerificationError> {
        if !registry.is_active(&new.model_id) {
            return Err(VerificationError::ModelInactive(new.model_id));
        }
        if new.deadline <= now {
            return Err(VerificationError::InvalidDeadline {
                deadline: new.deadline,
                now,
            });
        }

        let fee = registry.get(&new.model_id)?.verification_fee;
        if new.payment < fee {
            return Err(VerificationError::InsufficientFee {
                needed: fee,
                provided: new.payment,
            });
        }
        let needed = fee
            .checked_add(new.reward)
            .ok_or(VerificationError::Overflow)?;
        if new.payment < needed {
            return Err(VerificationError::InsufficientFee {
                needed,
                provided: new.payment,
            });
        }

        let score = trust.get_score(&new.agent);
        if score < params.min_agent_trust {
            return Err(VerificationError::InsufficientTrust {
                score,
                required: params.min_agent_trust,
            });
        }

        registry.record_inference(&new.model_id)?;

        let content_hash = request_content_hash(
            &new.model_id,
            &new.input,
            &new.expected_output,
            new.reward,
            new.deadline,
            now,
        );
        let split = PaymentSplit {
            fee,
            escrow: new.reward,
            change: new.payment - needed,
        };
        tracing::info!(
            request = %id,
            agent = %new.agent,
            model = %new.model_id,
            reward = new.reward,
            deadline = %new.deadline,
            "verification request opened"
        );
        let request = InferenceRequest {
            id,
            agent: new.agent,
            model_id: new.model_id,
            input: new.input,
            expected_output: new.expected_output,
            reward: new.reward,
            fee_paid: fee,
            deadline: new.deadline,
            created_at: now,
            content_hash,
            phase: RequestPhase::Open,
            finalized_at: None,
            consensus_confidence: None,
            payment_ref: None,
            receipt_ref: None,
            refunded: false,
        };
        Ok((RequestRecord::new(request), split))
    }
}
