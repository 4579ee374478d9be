//! Scenario files: an ordered list of arbiter operations in TOML.
//!
//! ```toml
//! start = 1700000000
//!
//! [[step]]
//! op = "register_model"
//! caller = "admin"
//! model = "llama-3-8b"
//! owner = "0xowner"
//! fee = 10
//!
//! [[step]]
//! op = "advance"
//! secs = 3600
//! ```

use std::path::Path;

use anyhow::Context;
use poi_node::{Arbiter, ArbiterError, Submitted};
use poi_nullables::NullClock;
use poi_types::{ChallengeId, ModelId, Principal, RequestId};
use poi_verification::{ChallengeFiling, NewRequest, Submission, VerificationMethod};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Clock reading, in Unix seconds, before the first step.
    #[serde(default)]
    pub start: u64,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    RegisterModel {
        caller: String,
        model: String,
        owner: String,
        fee: u128,
    },
    SetMinimumStake {
        caller: String,
        amount: u128,
    },
    UpdateModelMetrics {
        caller: String,
        model: String,
        accuracy_bps: u32,
        latency_ms: u64,
        uptime_bps: u32,
    },
    Stake {
        validator: String,
        amount: u128,
    },
    Unstake {
        validator: String,
        amount: u128,
    },
    Delegate {
        delegator: String,
        validator: String,
        amount: u128,
    },
    Undelegate {
        delegator: String,
        validator: String,
        amount: u128,
    },
    OpenRequest {
        agent: String,
        model: String,
        #[serde(default)]
        input: String,
        #[serde(default)]
        expected_output: String,
        reward: u128,
        /// Seconds from now until the deadline.
        deadline_in: u64,
        payment: u128,
    },
    Submit {
        request: u64,
        validator: String,
        valid: bool,
        confidence: u32,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        proof: String,
    },
    Advance {
        secs: u64,
    },
    Refund {
        request: u64,
    },
    OpenChallenge {
        request: u64,
        challenger: String,
        bond: u128,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        evidence: String,
    },
    ResolveChallenge {
        challenge: u64,
        upheld: bool,
        arbitrator: String,
    },
    ClaimRewards {
        validator: String,
    },
    ClaimPayout {
        challenger: String,
    },
    WithdrawFees {
        owner: String,
    },
    Pause {
        caller: String,
    },
    Unpause {
        caller: String,
    },
    EmergencyWithdraw {
        caller: String,
        amount: u128,
    },
}

/// What a step produced, printed as one JSON line.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepReport {
    Ok { step: usize, detail: String },
    Failed { step: usize, class: String, error: String },
}

impl Scenario {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("parsing scenario")
    }
}

fn p(s: &str) -> Principal {
    Principal::new(s)
}

/// Run one step. Failures are reported, not fatal: a rejected operation
/// leaves the arbiter unchanged.
pub fn run_step(arbiter: &Arbiter, clock: &NullClock, index: usize, step: Step) -> StepReport {
    match apply(arbiter, clock, step) {
        Ok(detail) => StepReport::Ok { step: index, detail },
        Err(e) => {
            tracing::warn!(step = index, error = %e, "step rejected");
            StepReport::Failed {
                step: index,
                class: e.class().as_str().to_string(),
                error: e.to_string(),
            }
        }
    }
}

fn apply(arbiter: &Arbiter, clock: &NullClock, step: Step) -> Result<String, ArbiterError> {
    let detail = match step {
        Step::RegisterModel { caller, model, owner, fee } => {
            let m = arbiter.register_model(&p(&caller), ModelId::new(model), p(&owner), fee)?;
            format!("model {} registered", m.model_id)
        }
        Step::SetMinimumStake { caller, amount } => {
            arbiter.set_minimum_stake(&p(&caller), amount)?;
            format!("minimum stake {amount}")
        }
        Step::UpdateModelMetrics { caller, model, accuracy_bps, latency_ms, uptime_bps } => {
            arbiter.update_model_metrics(&p(&caller), &ModelId::new(model), accuracy_bps, latency_ms, uptime_bps)?;
            "metrics updated".to_string()
        }
        Step::Stake { validator, amount } => {
            let s = arbiter.stake(&p(&validator), amount)?;
            format!("{validator} self-stake {} active={}", s.self_stake, s.active)
        }
        Step::Unstake { validator, amount } => {
            let out = arbiter.unstake(&p(&validator), amount)?;
            format!("{validator} withdrew {out}")
        }
        Step::Delegate { delegator, validator, amount } => {
            arbiter.delegate(&p(&delegator), &p(&validator), amount)?;
            format!("{delegator} delegated {amount} to {validator}")
        }
        Step::Undelegate { delegator, validator, amount } => {
            let out = arbiter.undelegate(&p(&delegator), &p(&validator), amount)?;
            format!("{delegator} undelegated {out} from {validator}")
        }
        Step::OpenRequest { agent, model, input, expected_output, reward, deadline_in, payment } => {
            let opened = arbiter.open_request(NewRequest {
                agent: p(&agent),
                model_id: ModelId::new(model),
                input: input.into_bytes(),
                expected_output: expected_output.into_bytes(),
                reward,
                deadline: arbiter.now().plus(deadline_in),
                payment,
            })?;
            format!("{} opened, hash {}, change {}", opened.id, opened.content_hash, opened.change)
        }
        Step::Submit { request, validator, valid, confidence, method, proof } => {
            let method = method
                .map(|m| m.parse::<VerificationMethod>().unwrap_or_else(|never| match never {}))
                .unwrap_or(VerificationMethod::ExactMatch);
            let outcome = arbiter.submit_verification(
                RequestId::new(request),
                Submission {
                    validator: p(&validator),
                    is_valid: valid,
                    confidence,
                    proof: proof.into_bytes(),
                    method,
                },
            )?;
            match outcome {
                Submitted::Pending { count, quorum } => format!("{count}/{quorum} submissions"),
                Submitted::Finalized(s) => format!(
                    "finalized verified={} confidence={} per_validator={}",
                    s.verified, s.consensus_confidence, s.per_validator_reward
                ),
            }
        }
        Step::Advance { secs } => {
            clock.advance(secs);
            format!("clock at {}", arbiter.now())
        }
        Step::Refund { request } => {
            let amount = arbiter.refund_expired(RequestId::new(request))?;
            format!("refunded {amount}")
        }
        Step::OpenChallenge { request, challenger, bond, reason, evidence } => {
            let id = arbiter.open_challenge(
                RequestId::new(request),
                ChallengeFiling {
                    challenger: p(&challenger),
                    reason,
                    evidence,
                    bond,
                },
            )?;
            format!("{id} opened")
        }
        Step::ResolveChallenge { challenge, upheld, arbitrator } => {
            let r = arbiter.resolve_challenge(ChallengeId::new(challenge), upheld, &p(&arbitrator))?;
            format!("{} resolved upheld={} payout={}", r.challenge_id, r.upheld, r.challenger_payout)
        }
        Step::ClaimRewards { validator } => format!("claimed {}", arbiter.claim_rewards(&p(&validator))?),
        Step::ClaimPayout { challenger } => {
            format!("claimed {}", arbiter.claim_challenge_payout(&p(&challenger))?)
        }
        Step::WithdrawFees { owner } => format!("withdrew {}", arbiter.withdraw_fees(&p(&owner))?),
        Step::Pause { caller } => {
            arbiter.pause(&p(&caller))?;
            "paused".to_string()
        }
        Step::Unpause { caller } => {
            arbiter.unpause(&p(&caller))?;
            "unpaused".to_string()
        }
        Step::EmergencyWithdraw { caller, amount } => {
            format!("withdrew {}", arbiter.emergency_withdraw(&p(&caller), amount)?)
        }
    };
    Ok(detail)
}
