//! Request and result records.

use crate::method::VerificationMethod;
use poi_types::{ContentHash, ModelId, Principal, RequestId, Timestamp};
use serde::{Deserialize, Serialize};

/// Where a request is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPhase {
    /// Accepting validator submissions.
    Open,
    /// Quorum reached and settled.
    Finalized { verified: bool },
    /// A verified verdict is under challenge. The verdict stands until resolved.
    Disputed,
    /// A verified verdict was overturned by an upheld challenge.
    Reversed,
}

impl RequestPhase {
    pub fn completed(&self) -> bool {
        !matches!(self, Self::Open)
    }

    pub fn verified(&self) -> bool {
        matches!(self, Self::Finalized { verified: true } | Self::Disputed)
    }
}

/// A claim that `model_id` maps `input` to `expected_output`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub id: RequestId,
    pub agent: Principal,
    pub model_id: ModelId,
    pub input: Vec<u8>,
    pub expected_output: Vec<u8>,
    /// Escrowed for the validators.
    pub reward: u128,
    pub fee_paid: u128,
    pub deadline: Timestamp,
    pub created_at: Timestamp,
    pub content_hash: ContentHash,
    pub phase: RequestPhase,
    pub finalized_at: Option<Timestamp>,
    pub consensus_confidence: Option<u32>,
    pub payment_ref: Option<String>,
    pub receipt_ref: Option<String>,
    pub refunded: bool,
}

impl InferenceRequest {
    pub fn completed(&self) -> bool {
        self.phase.completed()
    }

    pub fn verified(&self) -> bool {
        self.phase.verified()
    }

    /// Still open but past its deadline. Expired requests never finalize.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.phase == RequestPhase::Open && now.is_past(self.deadline)
    }
}

/// One validator's verdict on a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub validator: Principal,
    pub is_valid: bool,
    /// Basis points, 0..=10000.
    pub confidence: u32,
    pub proof: Vec<u8>,
    pub submitted_at: Timestamp,
    pub method: VerificationMethod,
}

/// A request together with its append-only result list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request: InferenceRequest,
    pub results: Vec<VerificationResult>,
}

impl RequestRecord {
    pub fn new(request: InferenceRequest) -> Self {
        Self {
            request,
            results: Vec::new(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.request.id
    }

    pub fn has_submitted(&self, validator: &Principal) -> bool {
        self.results.iter().any(|r| r.validator == *validator)
    }

    /// Validators whose verdict matched `verdict`, in submission order.
    pub fn voters_for(&self, verdict: bool) -> impl Iterator<Item = &Principal> {
        self.results
            .iter()
            .filter(move |r| r.is_valid == verdict)
            .map(|r| &r.validator)
    }
}
