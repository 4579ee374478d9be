//! Model records.

use poi_types::{ModelId, Principal, Timestamp, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

/// A registered inference model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub model_id: ModelId,
    pub owner: Principal,
    /// Raw amount an agent must attach, on top of the reward, to open a request.
    pub verification_fee: u128,
    pub active: bool,
    /// Requests ever opened against this model.
    pub total_inferences: u64,
    /// Requests whose claimed output was upheld by consensus (and not later reversed).
    pub successful_verifications: u64,
    /// `successful / total` in basis points; recomputed on every outcome.
    pub accuracy_bps: u32,
    /// Self-reported operating metrics, if the owner has published any.
    pub reported: Option<ReportedMetrics>,
    pub registered_at: Timestamp,
}

/// Metrics the model owner reports about its own deployment.
///
/// These are informational; consensus outcomes drive `accuracy_bps`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedMetrics {
    pub accuracy_bps: u32,
    pub latency_ms: u64,
    pub uptime_bps: u32,
    pub reported_at: Timestamp,
}

impl Model {
    pub fn new(model_id: ModelId, owner: Principal, verification_fee: u128, now: Timestamp) -> Self {
        Self {
            model_id,
            owner,
            verification_fee,
            active: true,
            total_inferences: 0,
            successful_verifications: 0,
            accuracy_bps: 0,
            reported: None,
            registered_at: now,
        }
    }

    pub(crate) fn recompute_accuracy(&mut self) {
        self.accuracy_bps = if self.total_inferences == 0 {
            0
        } else {
            let ratio = self.successful_verifications as u128 * BPS_DENOMINATOR as u128
                / self.total_inferences as u128;
            ratio.min(BPS_DENOMINATOR as u128) as u32
        };
    }
}
