//! Integration tests exercising the full arbiter:
//! registration → staking → requests → consensus → settlement → challenges
//! → checkpoint → restore.
//!
//! Every test drives the public `Arbiter` API with a nullable clock, so time
//! only moves when a test moves it.

use std::sync::{Arc, Mutex};

use poi_node::{Arbiter, ArbiterConfig, ArbiterError, ArbiterEvent, ErrorClass, Submitted};
use poi_nullables::{NullClock, NullStore};
use poi_staking::{SlashReason, StakingError};
use poi_store::StakeStore;
use poi_store_lmdb::LmdbEnvironment;
use poi_types::{ModelId, Principal, RequestId, Timestamp};
use poi_verification::{
    ChallengeFiling, ChallengeStatus, NewRequest, RequestPhase, Submission, VerificationError,
    VerificationMethod,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const START: u64 = 1_000_000;
const HOUR: u64 = 3_600;
const STAKE: u128 = 10_000;

fn p(name: &str) -> Principal {
    Principal::new(name)
}

fn admin() -> Principal {
    p("admin")
}

fn model() -> ModelId {
    ModelId::new("M")
}

fn config() -> ArbiterConfig {
    ArbiterConfig {
        arbitrators: vec!["arb".into()],
        ..ArbiterConfig::default()
    }
}

struct Harness {
    arbiter: Arc<Arbiter>,
    clock: Arc<NullClock>,
    events: Arc<Mutex<Vec<ArbiterEvent>>>,
}

impl Harness {
    fn events(&self) -> Vec<ArbiterEvent> {
        self.events.lock().unwrap().clone()
    }
}

fn record_events(arbiter: &Arbiter) -> Arc<Mutex<Vec<ArbiterEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    arbiter.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));
    events
}

/// Model `M` with fee 10 and validators v1..=v`validators`, each staking 10 000.
fn harness_with(config: ArbiterConfig, validators: usize) -> Harness {
    let clock = Arc::new(NullClock::new(START));
    let arbiter = Arbiter::new(config, clock.clone()).unwrap();
    let events = record_events(&arbiter);
    arbiter.register_model(&admin(), model(), p("owner"), 10).unwrap();
    for i in 1..=validators {
        arbiter.stake(&p(&format!("v{i}")), STAKE).unwrap();
    }
    Harness {
        arbiter: Arc::new(arbiter),
        clock,
        events,
    }
}

fn harness() -> Harness {
    harness_with(config(), 4)
}

fn request(reward: u128) -> NewRequest {
    NewRequest {
        agent: p("agent"),
        model_id: model(),
        input: b"what is 2+2".to_vec(),
        expected_output: b"4".to_vec(),
        reward,
        deadline: Timestamp::new(START + HOUR),
        payment: 10 + reward,
    }
}

fn vote(validator: &str, is_valid: bool, confidence: u32) -> Submission {
    Submission {
        validator: p(validator),
        is_valid,
        confidence,
        proof: b"proof".to_vec(),
        method: VerificationMethod::ExactMatch,
    }
}

fn finalize(h: &Harness, id: RequestId, votes: [(&str, bool, u32); 3]) -> poi_verification::Settlement {
    let mut last = None;
    for (v, valid, conf) in votes {
        last = Some(h.arbiter.submit_verification(id, vote(v, valid, conf)).unwrap());
    }
    match last {
        Some(Submitted::Finalized(settlement)) => settlement,
        other => panic!("expected finalization, got {other:?}"),
    }
}

fn verified_request(h: &Harness, reward: u128) -> RequestId {
    let id = h.arbiter.open_request(request(reward)).unwrap().id;
    let s = finalize(h, id, [("v1", true, 9_000), ("v2", true, 9_000), ("v3", true, 9_000)]);
    assert!(s.verified);
    id
}

fn filing(bond: u128) -> ChallengeFiling {
    ChallengeFiling {
        challenger: p("challenger"),
        reason: "output is wrong".into(),
        evidence: "ipfs://evidence".into(),
        bond,
    }
}

// ---------------------------------------------------------------------------
// Consensus scenarios
// ---------------------------------------------------------------------------

#[test]
fn two_of_three_valid_pays_every_submitter() {
    let h = harness();
    let opened = h.arbiter.open_request(request(300)).unwrap();
    assert_eq!(opened.id, RequestId::new(1));
    assert_eq!(opened.fee, 10);
    assert_eq!(opened.escrow, 300);
    assert_eq!(opened.change, 0);

    let s = finalize(&h, opened.id, [("v1", true, 9_000), ("v2", true, 8_500), ("v3", false, 3_000)]);
    assert!(s.verified);
    assert_eq!(s.valid_count, 2);
    assert_eq!(s.consensus_confidence, 6_833);
    assert_eq!(s.per_validator_reward, 100);
    assert!(s.slashed.is_empty());

    for (v, locked) in [("v1", 1_000), ("v2", 1_000), ("v3", 0)] {
        let stake = h.arbiter.get_stake(&p(v)).unwrap();
        assert_eq!(stake.accrued_rewards, 100);
        assert_eq!(stake.self_stake, STAKE);
        assert_eq!(stake.committed_exposure(h.arbiter.now()), locked);
    }
    assert_eq!(h.arbiter.get_model(&model()).unwrap().successful_verifications, 1);
    assert_eq!(h.arbiter.get_score(&p("agent")), 510);

    let req = h.arbiter.get_request(opened.id).unwrap();
    assert_eq!(req.phase, RequestPhase::Finalized { verified: true });
    assert_eq!(req.consensus_confidence, Some(6_833));
    assert_eq!(req.finalized_at, Some(Timestamp::new(START)));

    let events = h.events();
    assert!(events.contains(&ArbiterEvent::PaymentDue {
        request_id: opened.id,
        amount: 300,
        recipient: p("agent"),
    }));
    assert!(events.contains(&ArbiterEvent::ReceiptDue {
        request_id: opened.id,
        verified: true,
        consensus_confidence: 6_833,
        agent: p("agent"),
    }));
}

#[test]
fn rejected_verdict_slashes_valid_voters_and_refunds_once() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    let s = finalize(&h, id, [("v1", true, 8_000), ("v2", false, 7_000), ("v3", false, 6_000)]);

    assert!(!s.verified);
    assert_eq!(s.slashed, vec![(p("v1"), 1_000)]);
    assert_eq!(s.refundable, 300);
    assert_eq!(h.arbiter.get_stake(&p("v1")).unwrap().self_stake, 9_000);
    assert_eq!(h.arbiter.get_stake(&p("v1")).unwrap().slash_count, 1);
    assert_eq!(h.arbiter.get_stake(&p("v2")).unwrap().self_stake, STAKE);
    assert_eq!(h.arbiter.get_score(&p("agent")), 480);
    assert_eq!(
        h.arbiter.slash_history(&p("v1"))[0].reason,
        SlashReason::IncorrectVerification { request_id: id }
    );

    let books = h.arbiter.treasury();
    assert_eq!(books.slashed_pool, 1_000);
    assert_eq!(books.escrow, 300);
    assert!(!h
        .events()
        .iter()
        .any(|e| matches!(e, ArbiterEvent::PaymentDue { .. })));

    assert_eq!(h.arbiter.refund_expired(id).unwrap(), 300);
    assert!(matches!(h.arbiter.refund_expired(id), Err(ArbiterError::AlreadyRefunded(_))));
    assert_eq!(h.arbiter.treasury().escrow, 0);
}

#[test]
fn remainder_is_retained_not_lost() {
    let h = harness();
    let id = h.arbiter.open_request(request(301)).unwrap().id;
    let s = finalize(&h, id, [("v1", true, 9_000), ("v2", true, 9_000), ("v3", false, 9_000)]);
    assert_eq!(s.per_validator_reward, 100);
    assert_eq!(s.retained, 1);
    let books = h.arbiter.treasury();
    assert_eq!(books.reward_pool + books.retained, 301);
    assert_eq!(books.total_held(), 311);
}

#[test]
fn duplicate_submission_never_alters_results() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    h.arbiter.submit_verification(id, vote("v1", true, 9_000)).unwrap();
    let before = h.arbiter.get_results(id).unwrap();

    let err = h.arbiter.submit_verification(id, vote("v1", false, 1)).unwrap_err();
    assert!(matches!(
        err,
        ArbiterError::Verification(VerificationError::DuplicateSubmission { .. })
    ));
    assert_eq!(h.arbiter.get_results(id).unwrap(), before);
}

#[test]
fn late_submission_after_finalization_has_no_side_effects() {
    let h = harness();
    let id = verified_request(&h, 300);
    let stake_before = h.arbiter.get_stake(&p("v4")).unwrap();
    let books_before = h.arbiter.treasury();

    let err = h.arbiter.submit_verification(id, vote("v4", false, 100)).unwrap_err();
    assert_eq!(
        err.to_string(),
        ArbiterError::Verification(VerificationError::RequestAlreadyFinalized(id)).to_string()
    );
    assert_eq!(err.class(), ErrorClass::StateConflict);
    assert_eq!(h.arbiter.get_stake(&p("v4")).unwrap(), stake_before);
    assert_eq!(h.arbiter.treasury(), books_before);
    assert_eq!(h.arbiter.get_results(id).unwrap().len(), 3);
}

#[test]
fn submission_checks_run_in_order() {
    let h = harness();
    let missing = RequestId::new(99);
    assert!(matches!(
        h.arbiter.submit_verification(missing, vote("v1", true, 1)),
        Err(ArbiterError::Verification(VerificationError::RequestNotFound(_)))
    ));

    let id = h.arbiter.open_request(request(300)).unwrap().id;
    assert!(matches!(
        h.arbiter.submit_verification(id, vote("stranger", true, 1)),
        Err(ArbiterError::Verification(VerificationError::NotAValidator(_)))
    ));
    assert!(matches!(
        h.arbiter.submit_verification(id, vote("v1", true, 10_001)),
        Err(ArbiterError::Verification(VerificationError::ConfidenceOutOfRange(10_001)))
    ));
}

#[test]
fn request_without_quorum_expires_and_never_completes() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    h.arbiter.submit_verification(id, vote("v1", true, 9_000)).unwrap();
    h.arbiter.submit_verification(id, vote("v2", true, 9_000)).unwrap();
    assert!(!h.arbiter.is_expired(id).unwrap());

    h.clock.advance(HOUR + 1);
    assert!(h.arbiter.is_expired(id).unwrap());
    assert!(matches!(
        h.arbiter.submit_verification(id, vote("v3", true, 9_000)),
        Err(ArbiterError::Verification(VerificationError::RequestExpired(_)))
    ));
    let req = h.arbiter.get_request(id).unwrap();
    assert!(!req.completed());
    assert_eq!(req.phase, RequestPhase::Open);

    assert_eq!(h.arbiter.get_stake(&p("v1")).unwrap().committed_exposure(h.arbiter.now()), 0);
    assert_eq!(h.arbiter.refund_expired(id).unwrap(), 300);
    assert!(h.arbiter.get_stake(&p("v1")).unwrap().exposure.is_empty());
    assert!(!h.arbiter.get_request(id).unwrap().completed());
}

#[test]
fn exposure_lapses_with_the_deadline_without_a_refund() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    h.arbiter.submit_verification(id, vote("v1", true, 9_000)).unwrap();

    h.clock.advance(HOUR);
    assert!(matches!(
        h.arbiter.unstake(&p("v1"), STAKE),
        Err(ArbiterError::Staking(StakingError::ExposureLocked { committed: 1_000, remaining: 0 }))
    ));
    h.clock.advance(1);
    assert_eq!(h.arbiter.unstake(&p("v1"), STAKE).unwrap(), STAKE);
    assert!(h.arbiter.get_stake(&p("v1")).unwrap().exposure.is_empty());
    assert!(!h.arbiter.get_request(id).unwrap().refunded);
}

#[test]
fn settlement_that_would_overflow_leaves_the_request_open() {
    let h = harness();
    let store = NullStore::new();
    h.arbiter.checkpoint(&store).unwrap();
    let mut stake = h.arbiter.get_stake(&p("v3")).unwrap();
    stake.accrued_rewards = u128::MAX - 50;
    store.put_stake(&p("v3"), &bincode::serialize(&stake).unwrap()).unwrap();
    let arbiter = Arbiter::restore(config(), h.clock.clone(), &store).unwrap();

    let id = arbiter.open_request(request(300)).unwrap().id;
    arbiter.submit_verification(id, vote("v1", true, 9_000)).unwrap();
    arbiter.submit_verification(id, vote("v2", true, 9_000)).unwrap();
    let books = arbiter.treasury();
    let err = arbiter.submit_verification(id, vote("v3", true, 9_000)).unwrap_err();
    assert!(matches!(
        err,
        ArbiterError::Verification(VerificationError::Staking(StakingError::Overflow))
    ));

    let req = arbiter.get_request(id).unwrap();
    assert_eq!(req.phase, RequestPhase::Open);
    assert_eq!(arbiter.get_results(id).unwrap().len(), 2);
    assert!(arbiter.get_stake(&p("v3")).unwrap().exposure.is_empty());
    assert_eq!(arbiter.get_stake(&p("v3")).unwrap().accrued_rewards, u128::MAX - 50);
    assert_eq!(arbiter.get_model(&model()).unwrap().successful_verifications, 0);
    assert_eq!(arbiter.treasury(), books);
    assert_eq!(arbiter.metrics().submissions.get(), 2);

    match arbiter.submit_verification(id, vote("v4", true, 9_000)).unwrap() {
        Submitted::Finalized(s) => assert!(s.verified),
        other => panic!("expected finalization, got {other:?}"),
    }
}

#[test]
fn open_request_is_not_refundable() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    assert!(matches!(h.arbiter.refund_expired(id), Err(ArbiterError::RequestNotRefundable(_))));
    let verified = verified_request(&h, 300);
    assert!(matches!(
        h.arbiter.refund_expired(verified),
        Err(ArbiterError::RequestNotRefundable(_))
    ));
}

#[test]
fn deadline_is_inclusive() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    h.clock.advance(HOUR);
    assert!(!h.arbiter.is_expired(id).unwrap());
    h.arbiter.submit_verification(id, vote("v1", true, 9_000)).unwrap();
}

// ---------------------------------------------------------------------------
// Requests and payments
// ---------------------------------------------------------------------------

#[test]
fn open_request_validations() {
    let h = harness();
    let mut underpaid = request(300);
    underpaid.payment = 9;
    assert!(matches!(
        h.arbiter.open_request(underpaid),
        Err(ArbiterError::Verification(VerificationError::InsufficientFee { needed: 10, provided: 9 }))
    ));

    let mut no_escrow = request(300);
    no_escrow.payment = 200;
    assert!(matches!(
        h.arbiter.open_request(no_escrow),
        Err(ArbiterError::Verification(VerificationError::InsufficientFee { needed: 310, provided: 200 }))
    ));

    let mut stale = request(300);
    stale.deadline = Timestamp::new(START);
    assert!(matches!(
        h.arbiter.open_request(stale),
        Err(ArbiterError::Verification(VerificationError::InvalidDeadline { .. }))
    ));

    h.arbiter.set_model_active(&p("owner"), &model(), false).unwrap();
    assert!(matches!(
        h.arbiter.open_request(request(300)),
        Err(ArbiterError::Verification(VerificationError::ModelInactive(_)))
    ));
    assert_eq!(h.arbiter.request_count(), 0);
}

#[test]
fn overpayment_returns_change_and_fees_accrue_to_owner() {
    let h = harness();
    let mut generous = request(300);
    generous.payment = 400;
    let opened = h.arbiter.open_request(generous).unwrap();
    assert_eq!(opened.change, 90);
    h.arbiter.open_request(request(50)).unwrap();

    assert_eq!(h.arbiter.get_model(&model()).unwrap().total_inferences, 2);
    assert_eq!(h.arbiter.withdraw_fees(&p("owner")).unwrap(), 20);
    assert!(matches!(h.arbiter.withdraw_fees(&p("owner")), Err(ArbiterError::NothingToClaim(_))));
}

#[test]
fn low_trust_agent_cannot_open_requests() {
    let mut cfg = config();
    cfg.params.min_agent_trust = 600;
    let h = harness_with(cfg, 3);
    let err = h.arbiter.open_request(request(300)).unwrap_err();
    assert!(matches!(
        err,
        ArbiterError::Verification(VerificationError::InsufficientTrust { score: 500, required: 600 })
    ));
    assert_eq!(err.class(), ErrorClass::Economic);
}

#[test]
fn content_hash_fingerprints_the_claim() {
    let h = harness();
    let a = h.arbiter.open_request(request(300)).unwrap();
    let mut other = request(300);
    other.expected_output = b"5".to_vec();
    let b = h.arbiter.open_request(other).unwrap();
    assert!(!a.content_hash.is_zero());
    assert_ne!(a.content_hash, b.content_hash);
    assert_eq!(h.arbiter.get_request(a.id).unwrap().content_hash, a.content_hash);
}

#[test]
fn collaborator_references_attach_once() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    assert!(matches!(
        h.arbiter.attach_payment_reference(&admin(), id, "pay-1".into()),
        Err(ArbiterError::Verification(VerificationError::RequestNotVerified(_)))
    ));
    assert!(matches!(
        h.arbiter.attach_receipt_reference(&admin(), id, "rcpt-1".into()),
        Err(ArbiterError::RequestNotCompleted(_))
    ));

    finalize(&h, id, [("v1", true, 9_000), ("v2", true, 9_000), ("v3", true, 9_000)]);
    assert!(matches!(
        h.arbiter.attach_payment_reference(&p("mallory"), id, "pay-1".into()),
        Err(ArbiterError::Unauthorized(_))
    ));
    h.arbiter.attach_payment_reference(&admin(), id, "pay-1".into()).unwrap();
    h.arbiter.attach_receipt_reference(&admin(), id, "rcpt-1".into()).unwrap();
    assert!(matches!(
        h.arbiter.attach_payment_reference(&admin(), id, "pay-2".into()),
        Err(ArbiterError::ReferenceAlreadyAttached { kind: "payment", .. })
    ));
    assert!(matches!(
        h.arbiter.attach_receipt_reference(&admin(), id, "rcpt-2".into()),
        Err(ArbiterError::ReferenceAlreadyAttached { kind: "receipt", .. })
    ));
    let req = h.arbiter.get_request(id).unwrap();
    assert_eq!(req.payment_ref.as_deref(), Some("pay-1"));
    assert_eq!(req.receipt_ref.as_deref(), Some("rcpt-1"));
}

// ---------------------------------------------------------------------------
// Staking
// ---------------------------------------------------------------------------

#[test]
fn exposure_blocks_unstaking_below_commitment() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    h.arbiter.submit_verification(id, vote("v1", true, 9_000)).unwrap();

    let err = h.arbiter.unstake(&p("v1"), 9_500).unwrap_err();
    assert!(matches!(
        err,
        ArbiterError::Staking(StakingError::ExposureLocked { committed: 1_000, remaining: 500 })
    ));
    assert_eq!(h.arbiter.unstake(&p("v1"), 9_000).unwrap(), 9_000);
    assert_eq!(h.arbiter.get_stake(&p("v1")).unwrap().self_stake, 1_000);
    assert!(h.arbiter.is_validator(&p("v1")));
}

#[test]
fn minimum_stake_change_reevaluates_validators() {
    let h = harness();
    assert!(h.arbiter.is_validator(&p("v1")));
    h.arbiter.set_minimum_stake(&admin(), 20_000).unwrap();
    assert!(!h.arbiter.is_validator(&p("v1")));
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    assert!(matches!(
        h.arbiter.submit_verification(id, vote("v1", true, 9_000)),
        Err(ArbiterError::Verification(VerificationError::NotAValidator(_)))
    ));
    h.arbiter.stake(&p("v1"), 10_000).unwrap();
    assert!(h.arbiter.is_validator(&p("v1")));
}

#[test]
fn delegation_round_trip() {
    let h = harness();
    h.arbiter.delegate(&p("fan"), &p("v1"), 500).unwrap();
    assert_eq!(h.arbiter.get_stake(&p("v1")).unwrap().total_stake(), STAKE + 500);
    assert!(matches!(
        h.arbiter.delegate(&p("fan"), &p("nobody"), 1),
        Err(ArbiterError::Staking(StakingError::ValidatorInactive(_)))
    ));
    assert!(matches!(
        h.arbiter.undelegate(&p("fan"), &p("v1"), 501),
        Err(ArbiterError::Staking(StakingError::InsufficientDelegation { .. }))
    ));
    assert_eq!(h.arbiter.undelegate(&p("fan"), &p("v1"), 500).unwrap(), 500);
    assert_eq!(h.arbiter.delegation(&p("fan"), &p("v1")), 0);
}

#[test]
fn rewards_are_claimed_from_the_pool() {
    let h = harness();
    verified_request(&h, 300);
    assert_eq!(h.arbiter.claim_rewards(&p("v1")).unwrap(), 100);
    assert!(matches!(
        h.arbiter.claim_rewards(&p("v1")),
        Err(ArbiterError::Staking(StakingError::NothingToClaim(_)))
    ));
    assert_eq!(h.arbiter.treasury().reward_pool, 200);
}

// ---------------------------------------------------------------------------
// Challenges
// ---------------------------------------------------------------------------

#[test]
fn challenge_after_window_fails_regardless_of_bond() {
    let h = harness();
    let id = verified_request(&h, 300);
    let window = h.arbiter.params().challenge_window_secs;
    h.clock.advance(window + 1);
    for bond in [0, 1_000, u128::MAX] {
        assert!(matches!(
            h.arbiter.open_challenge(id, filing(bond)),
            Err(ArbiterError::Verification(VerificationError::ChallengeWindowClosed { .. }))
        ));
    }
}

#[test]
fn challenge_needs_verified_request_and_bond() {
    let h = harness();
    let open = h.arbiter.open_request(request(300)).unwrap().id;
    assert!(matches!(
        h.arbiter.open_challenge(open, filing(1_000)),
        Err(ArbiterError::Verification(VerificationError::RequestNotVerified(_)))
    ));
    let id = verified_request(&h, 300);
    assert!(matches!(
        h.arbiter.open_challenge(id, filing(999)),
        Err(ArbiterError::Verification(VerificationError::BondTooLow { bond: 999, minimum: 1_000 }))
    ));
    h.arbiter.open_challenge(id, filing(1_000)).unwrap();
    assert!(matches!(
        h.arbiter.open_challenge(id, filing(1_000)),
        Err(ArbiterError::Verification(VerificationError::ChallengePending(_)))
    ));
    assert_eq!(h.arbiter.treasury().bonds, 1_000);
}

#[test]
fn upheld_challenge_slashes_majority_and_pays_challenger() {
    let h = harness();
    let id = verified_request(&h, 300);
    h.clock.advance(HOUR);
    let cid = h.arbiter.open_challenge(id, filing(1_000)).unwrap();
    assert_eq!(h.arbiter.get_request(id).unwrap().phase, RequestPhase::Disputed);
    assert!(h.arbiter.get_request(id).unwrap().verified());

    assert!(matches!(
        h.arbiter.resolve_challenge(cid, true, &p("v4")),
        Err(ArbiterError::Verification(VerificationError::NotArbitrator(_)))
    ));
    let resolution = h.arbiter.resolve_challenge(cid, true, &p("arb")).unwrap();
    assert_eq!(resolution.slashed.len(), 3);
    assert_eq!(resolution.challenger_payout, 1_000 + 3 * 1_000);

    for v in ["v1", "v2", "v3"] {
        assert_eq!(h.arbiter.get_stake(&p(v)).unwrap().self_stake, 9_000);
        let history = h.arbiter.slash_history(&p(v));
        assert_eq!(history[0].reason, SlashReason::UpheldChallenge { challenge_id: cid });
    }
    assert_eq!(h.arbiter.get_stake(&p("v4")).unwrap().self_stake, STAKE);
    let req = h.arbiter.get_request(id).unwrap();
    assert_eq!(req.phase, RequestPhase::Reversed);
    assert!(!req.verified());
    assert_eq!(h.arbiter.get_model(&model()).unwrap().successful_verifications, 0);
    assert_eq!(h.arbiter.get_score(&p("agent")), 490);

    let challenge = h.arbiter.get_challenge(cid).unwrap();
    assert_eq!(challenge.status, ChallengeStatus::Upheld);
    assert_eq!(challenge.arbitrator, Some(p("arb")));
    assert!(matches!(
        h.arbiter.resolve_challenge(cid, false, &p("arb")),
        Err(ArbiterError::Verification(VerificationError::AlreadyResolved(_)))
    ));

    assert_eq!(h.arbiter.claim_challenge_payout(&p("challenger")).unwrap(), 4_000);
    assert!(matches!(
        h.arbiter.claim_challenge_payout(&p("challenger")),
        Err(ArbiterError::NothingToClaim(_))
    ));
    assert_eq!(h.arbiter.treasury().bonds, 0);
}

#[test]
fn majority_cannot_unstake_while_a_challenge_is_pending() {
    let h = harness();
    let id = verified_request(&h, 300);
    assert!(matches!(
        h.arbiter.unstake(&p("v1"), STAKE),
        Err(ArbiterError::Staking(StakingError::ExposureLocked { committed: 1_000, remaining: 0 }))
    ));
    h.clock.advance(HOUR);
    let cid = h.arbiter.open_challenge(id, filing(1_000)).unwrap();

    h.clock.advance(h.arbiter.params().challenge_window_secs);
    assert!(matches!(
        h.arbiter.unstake(&p("v1"), STAKE),
        Err(ArbiterError::Staking(StakingError::ExposureLocked { committed: 1_000, remaining: 0 }))
    ));
    assert_eq!(h.arbiter.unstake(&p("v1"), 9_000).unwrap(), 9_000);

    let resolution = h.arbiter.resolve_challenge(cid, true, &p("arb")).unwrap();
    assert!(resolution.slashed.contains(&(p("v1"), 1_000)));
    assert_eq!(resolution.challenger_payout, 1_000 + 3 * 1_000);
    let stake = h.arbiter.get_stake(&p("v1")).unwrap();
    assert_eq!(stake.self_stake, 0);
    assert!(stake.exposure.is_empty());
    assert_eq!(h.arbiter.claim_challenge_payout(&p("challenger")).unwrap(), 4_000);
}

#[test]
fn rejected_challenge_compensates_majority() {
    let h = harness();
    let id = verified_request(&h, 300);
    let cid = h.arbiter.open_challenge(id, filing(1_001)).unwrap();
    let resolution = h.arbiter.resolve_challenge(cid, false, &p("arb")).unwrap();
    assert_eq!(resolution.retained, 2);
    assert_eq!(h.arbiter.get_stake(&p("v1")).unwrap().accrued_rewards, 100 + 333);
    assert_eq!(
        h.arbiter.get_request(id).unwrap().phase,
        RequestPhase::Finalized { verified: true }
    );
    assert_eq!(h.arbiter.challenges_for(id).len(), 1);
    assert!(h.events().iter().any(|e| matches!(
        e,
        ArbiterEvent::ChallengeResolved { upheld: false, .. }
    )));

    h.clock.advance(h.arbiter.params().challenge_window_secs + 1);
    assert_eq!(h.arbiter.unstake(&p("v1"), STAKE).unwrap(), STAKE);
}

#[test]
fn unknown_challenge_is_not_found() {
    let h = harness();
    assert!(matches!(
        h.arbiter.resolve_challenge(poi_types::ChallengeId::new(5), true, &p("arb")),
        Err(ArbiterError::Verification(VerificationError::ChallengeNotFound(_)))
    ));
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

#[test]
fn emergency_withdrawal_bounded_by_unallocated_funds() {
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    finalize(&h, id, [("v1", true, 8_000), ("v2", false, 7_000), ("v3", false, 6_000)]);

    assert!(matches!(h.arbiter.emergency_withdraw(&admin(), 1), Err(ArbiterError::NotPaused)));
    h.arbiter.pause(&admin()).unwrap();
    assert!(matches!(
        h.arbiter.emergency_withdraw(&admin(), 1_001),
        Err(ArbiterError::InsufficientTreasury { requested: 1_001, available: 1_000 })
    ));
    assert_eq!(h.arbiter.emergency_withdraw(&admin(), 1_000).unwrap(), 1_000);
    let books = h.arbiter.treasury();
    assert_eq!(books.escrow, 300);
    assert_eq!(books.slashed_pool, 0);
    assert!(h.events().contains(&ArbiterEvent::Paused));
}

#[test]
fn duplicate_model_is_a_state_conflict() {
    let h = harness();
    let err = h
        .arbiter
        .register_model(&admin(), model(), p("owner"), 10)
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::StateConflict);
}

#[test]
fn metrics_track_activity() {
    let h = harness();
    verified_request(&h, 300);
    h.arbiter.open_request(request(300)).unwrap();
    let m = h.arbiter.metrics();
    assert_eq!(m.requests_opened.get(), 2);
    assert_eq!(m.submissions.get(), 3);
    assert_eq!(m.finalized_verified.get(), 1);
    assert_eq!(m.open_requests.get(), 1);
    assert!(m.encode().unwrap().contains("poi_finalized_verified_total 1"));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn racing_submissions_finalize_exactly_once() {
    let h = harness_with(config(), 8);
    let id = h.arbiter.open_request(request(300)).unwrap().id;

    let outcomes: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let arbiter = Arc::clone(&h.arbiter);
                s.spawn(move || arbiter.submit_verification(id, vote(&format!("v{i}"), true, 9_000)))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let finalized = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(Submitted::Finalized(_))))
        .count();
    let late = outcomes
        .iter()
        .filter(|o| {
            matches!(
                o,
                Err(ArbiterError::Verification(VerificationError::RequestAlreadyFinalized(_)))
            )
        })
        .count();
    assert_eq!(finalized, 1);
    assert_eq!(late, 5);
    assert_eq!(h.arbiter.get_results(id).unwrap().len(), 3);

    let paid: u128 = (1..=8)
        .map(|i| h.arbiter.get_stake(&p(&format!("v{i}"))).unwrap().accrued_rewards)
        .sum();
    assert_eq!(paid, 300);
}

#[test]
fn independent_requests_settle_in_parallel() {
    let h = harness_with(config(), 3);
    let ids: Vec<_> = (0..6)
        .map(|_| h.arbiter.open_request(request(30)).unwrap().id)
        .collect();

    std::thread::scope(|s| {
        for &id in &ids {
            let arbiter = Arc::clone(&h.arbiter);
            s.spawn(move || {
                for v in ["v1", "v2", "v3"] {
                    arbiter.submit_verification(id, vote(v, true, 9_000)).unwrap();
                }
            });
        }
    });

    for id in ids {
        assert!(h.arbiter.get_request(id).unwrap().verified());
    }
    assert_eq!(h.arbiter.get_stake(&p("v1")).unwrap().accrued_rewards, 6 * 10);
    assert_eq!(h.arbiter.get_model(&model()).unwrap().successful_verifications, 6);
    assert_eq!(h.arbiter.get_score(&p("agent")), 560);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn restored_arbiter_continues_where_it_stopped() {
    let h = harness();
    let done = verified_request(&h, 300);
    let pending = h.arbiter.open_request(request(300)).unwrap().id;
    h.arbiter.submit_verification(pending, vote("v1", true, 9_000)).unwrap();
    h.arbiter.submit_verification(pending, vote("v2", false, 9_000)).unwrap();
    let cid = h.arbiter.open_challenge(done, filing(1_000)).unwrap();

    let store = NullStore::new();
    let stats = h.arbiter.checkpoint(&store).unwrap();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.results, 5);
    assert_eq!(stats.challenges, 1);

    let restored = Arbiter::restore(config(), h.clock.clone(), &store).unwrap();
    assert_eq!(restored.treasury(), h.arbiter.treasury());
    assert_eq!(restored.get_request(done), h.arbiter.get_request(done));
    assert_eq!(restored.get_results(pending).unwrap().len(), 2);
    // v1 holds a submission lock on `pending` and a held challenge lock on `done`.
    assert_eq!(restored.get_stake(&p("v1")).unwrap().committed_exposure(restored.now()), 2_000);
    assert_eq!(restored.metrics().open_requests.get(), 1);

    match restored.submit_verification(pending, vote("v3", true, 9_000)).unwrap() {
        Submitted::Finalized(s) => assert!(s.verified),
        other => panic!("expected finalization, got {other:?}"),
    }
    assert_eq!(restored.open_request(request(1)).unwrap().id, RequestId::new(3));
    restored.resolve_challenge(cid, true, &p("arb")).unwrap();
    assert_eq!(restored.get_request(done).unwrap().phase, RequestPhase::Reversed);
}

#[test]
fn lmdb_checkpoint_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let h = harness();
    let id = h.arbiter.open_request(request(300)).unwrap().id;
    finalize(&h, id, [("v1", true, 8_000), ("v2", false, 7_000), ("v3", false, 6_000)]);
    h.arbiter.delegate(&p("fan"), &p("v2"), 250).unwrap();

    {
        let env = LmdbEnvironment::open_default(dir.path()).expect("open env");
        h.arbiter.checkpoint(&env).unwrap();
    }

    let env = LmdbEnvironment::open_default(dir.path()).expect("reopen env");
    let restored = Arbiter::restore(config(), h.clock.clone(), &env).unwrap();
    assert_eq!(restored.slash_history(&p("v1")).len(), 1);
    assert_eq!(restored.get_stake(&p("v1")).unwrap().self_stake, 9_000);
    assert_eq!(restored.delegation(&p("fan"), &p("v2")), 250);
    assert_eq!(restored.get_score(&p("agent")), 480);
    assert_eq!(restored.treasury().slashed_pool, 1_000);
    assert_eq!(restored.refund_expired(id).unwrap(), 300);
}
