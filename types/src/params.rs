//! Engine parameters: quorum, staking, slashing, challenge and trust tuning.
//!
//! Every field can be set from the arbiter's TOML configuration; the
//! minimum stake can also be changed at runtime by the admin principal.

use serde::{Deserialize, Serialize};

/// Smallest quorum the engine accepts. Fewer than three submissions cannot
/// produce a meaningful majority.
pub const MIN_QUORUM: u32 = 3;

/// All tunable values consulted by the registry, ledger, finalizer,
/// trust tracker and dispute resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    // ── Consensus ────────────────────────────────────────────────────────
    /// Distinct validator submissions needed before a request finalizes.
    pub quorum: u32,

    // ── Staking ──────────────────────────────────────────────────────────
    /// Self-stake (raw) a validator needs to be active. Also the minimum
    /// challenge bond.
    pub minimum_stake: u128,

    /// Share of current self-stake slashed from each dissenter when a request
    /// is rejected (basis points, 1000 = 10%).
    pub slash_bps: u32,

    // ── Challenges ───────────────────────────────────────────────────────
    /// Seconds after finalization during which a verified verdict can be contested.
    pub challenge_window_secs: u64,

    /// Additional share of current self-stake slashed from each majority
    /// validator when a challenge is upheld (basis points).
    pub challenge_slash_bps: u32,

    // ── Trust ────────────────────────────────────────────────────────────
    /// Score an agent starts with before any finalized request.
    pub initial_trust: u64,

    /// Upper bound of the trust score.
    pub max_trust: u64,

    /// Added to the agent's score when its request finalizes verified.
    pub trust_increment: u64,

    /// Removed from the agent's score when its request is rejected or reversed.
    pub trust_decrement: u64,

    /// Agents below this score cannot open new requests (0 disables the gate).
    pub min_agent_trust: u64,
}

impl EngineParams {
    /// Defaults used by the reference deployment.
    pub fn defaults() -> Self {
        Self {
            quorum: MIN_QUORUM,
            minimum_stake: 1_000,
            slash_bps: 1000, // 10%
            challenge_window_secs: 24 * 3600, // 1 day
            challenge_slash_bps: 1000, // 10%
            initial_trust: 500,
            max_trust: 1000,
            trust_increment: 10,
            trust_decrement: 20,
            min_agent_trust: 100,
        }
    }

    /// Check internal consistency. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.quorum < MIN_QUORUM {
            return Err(format!("quorum must be at least {MIN_QUORUM}, got {}", self.quorum));
        }
        if self.slash_bps > crate::BPS_DENOMINATOR || self.challenge_slash_bps > crate::BPS_DENOMINATOR {
            return Err("slashing rates must not exceed 10000 bps".to_string());
        }
        if self.initial_trust > self.max_trust {
            return Err(format!(
                "initial trust {} exceeds maximum {}",
                self.initial_trust, self.max_trust
            ));
        }
        Ok(())
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::defaults()
    }
}
