//! Events emitted by the arbiter for subscribers.
//!
//! Payment settlement and receipt minting live outside the arbiter; they
//! learn what to do from [`ArbiterEvent::PaymentDue`] and
//! [`ArbiterEvent::ReceiptDue`] and report back through
//! `attach_payment_reference` / `attach_receipt_reference`.

use poi_types::{ChallengeId, ModelId, Principal, RequestId};
use serde::Serialize;

/// Arbiter-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ArbiterEvent {
    ModelRegistered {
        model_id: ModelId,
        owner: Principal,
        verification_fee: u128,
    },
    RequestOpened {
        request_id: RequestId,
        agent: Principal,
        model_id: ModelId,
        reward: u128,
    },
    VerificationSubmitted {
        request_id: RequestId,
        validator: Principal,
        is_valid: bool,
    },
    RequestFinalized {
        request_id: RequestId,
        verified: bool,
        valid_count: usize,
        total: usize,
        consensus_confidence: u32,
    },
    /// The declared reward should be settled with the agent.
    PaymentDue {
        request_id: RequestId,
        amount: u128,
        recipient: Principal,
    },
    /// An attestation of the verdict should be minted.
    ReceiptDue {
        request_id: RequestId,
        verified: bool,
        consensus_confidence: u32,
        agent: Principal,
    },
    ValidatorSlashed {
        validator: Principal,
        amount: u128,
        reason: String,
    },
    ChallengeOpened {
        challenge_id: ChallengeId,
        request_id: RequestId,
        challenger: Principal,
        bond: u128,
    },
    ChallengeResolved {
        challenge_id: ChallengeId,
        request_id: RequestId,
        upheld: bool,
        challenger_payout: u128,
    },
    RequestRefunded {
        request_id: RequestId,
        agent: Principal,
        amount: u128,
    },
    Paused,
    Unpaused,
    EmergencyWithdrawal {
        amount: u128,
        recipient: Principal,
    },
}

type Listener = Box<dyn Fn(&ArbiterEvent) + Send + Sync>;

/// Synchronous fan-out event bus for arbiter events.
///
/// Listeners are invoked inline on the emitting thread, after the arbiter
/// has released its locks; keep handlers fast anyway.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &ArbiterEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn emit_all(&self, events: &[ArbiterEvent]) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
