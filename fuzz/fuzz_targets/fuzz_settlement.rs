#![no_main]

use libfuzzer_sys::fuzz_target;

use poi_registry::ModelRegistry;
use poi_staking::StakeLedger;
use poi_types::{EngineParams, ModelId, Principal, RequestId, Timestamp};
use poi_verification::{
    tally, ConsensusFinalizer, NewRequest, RequestLifecycle, Submission, TrustScores,
    VerificationMethod,
};

// Fuzz tally and settlement with arbitrary rewards, stakes and verdicts.
// Checks settlement never panics and never pays out more than the reward.
fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }

    let reward = u64::from_le_bytes([
        data[0], data[1], data[2], data[3],
        data[4], data[5], data[6], data[7],
    ]) as u128;
    let stake = u64::from_le_bytes([
        data[8], data[9], data[10], data[11],
        data[12], data[13], data[14], data[15],
    ]) as u128;

    let params = EngineParams::defaults();
    let now = Timestamp::new(1_000);
    let mut registry = ModelRegistry::new();
    if registry
        .register(ModelId::new("m"), Principal::new("owner"), 1, now)
        .is_err()
    {
        return;
    }
    let mut ledger = StakeLedger::new(params.minimum_stake);
    let mut trust = TrustScores::new(params.initial_trust, params.max_trust);

    let request = NewRequest {
        agent: Principal::new("agent"),
        model_id: ModelId::new("m"),
        input: data.to_vec(),
        expected_output: Vec::new(),
        reward,
        deadline: now.plus(60),
        payment: reward.saturating_add(1),
    };
    let Ok((mut record, _)) =
        RequestLifecycle.open(&mut registry, &trust, RequestId::new(1), request, &params, now)
    else {
        return;
    };

    // Each remaining 3 bytes is one verdict: validator index, validity, confidence.
    let mut accepted = 0usize;
    for chunk in data[16..].chunks_exact(3) {
        let validator = Principal::new(format!("v{}", chunk[0] % 8));
        let _ = ledger.stake(&validator, stake.max(params.minimum_stake), now);
        let submission = Submission {
            validator,
            is_valid: chunk[1] & 1 == 1,
            confidence: u32::from(chunk[2]) * 40,
            proof: Vec::new(),
            method: VerificationMethod::ExactMatch,
        };
        if ConsensusFinalizer
            .submit(&mut record, &mut ledger, submission, &params, now)
            .is_ok()
        {
            accepted += 1;
        }
        if accepted >= params.quorum as usize {
            break;
        }
    }

    let counted = tally(&record.results);
    if let Ok(settlement) =
        ConsensusFinalizer.finalize(&mut record, &mut registry, &mut ledger, &mut trust, &params, now)
    {
        let paid: u128 = settlement.rewards.iter().map(|(_, r)| r).sum();
        assert!(paid <= reward);
        assert_eq!(Some(settlement.verified), counted.map(|t| t.consensus));
    }
});
