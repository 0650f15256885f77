//! Integration test: attestation lifecycle across the three ledgers.
//!
//! Exercises:
//! 1. Quorum of three staked attestors verifying a claim
//! 2. Fee validation on submission
//! 3. Unregistered attestors
//! 4. Idempotent attestation
//! 5. Pull-based reward claiming across several claims
//! 6. Reward accounting invariants after every step
//!
//! This test uses yieldgate-protocol (the aggregate), yieldgate-attestor,
//! yieldgate-registry and yieldgate-types.

use yieldgate_attestor::{AttestorError, SlashPolicy};
use yieldgate_protocol::{PayoutJournal, Protocol, ProtocolError};
use yieldgate_registry::{ClaimSubmission, RegistryError};
use yieldgate_types::constants::{ATTESTATION_FEE, MIN_QUORUM, REWARD_PER_ATTESTOR};
use yieldgate_types::{AccountId, Amount, ClaimId, ClaimStatus, UNITS_PER_TOKEN};

const AUTHORITY: AccountId = AccountId::new([0xAA; 32]);
const ISSUER: AccountId = AccountId::new([0x11; 32]);

fn attestor(n: u8) -> AccountId {
    AccountId::new([n; 32])
}

fn submission(period: &str) -> ClaimSubmission {
    ClaimSubmission {
        asset_id: "TBILL-6M".to_string(),
        period: period.to_string(),
        yield_amount: 498,
        document_hash: yieldgate_crypto::blake3::document_reference(period.as_bytes()),
    }
}

/// Protocol with attestors 1..=n registered at 2.0 tokens each.
fn protocol_with_attestors(n: u8) -> Protocol<PayoutJournal> {
    let mut p = Protocol::new(AUTHORITY, SlashPolicy::RewardPool, PayoutJournal::new());
    for i in 1..=n {
        p.register(attestor(i), 2 * UNITS_PER_TOKEN)
            .expect("register attestor");
    }
    p
}

fn submit(p: &mut Protocol<PayoutJournal>, period: &str) -> ClaimId {
    p.submit_claim(ISSUER, submission(period), ATTESTATION_FEE)
        .expect("submit claim")
}

/// Sum of earned plus claimed rewards over attestors 1..=n.
fn credited(p: &Protocol<PayoutJournal>, n: u8) -> Amount {
    (1..=n)
        .map(|i| p.rewards_earned(&attestor(i)) + p.total_claimed(&attestor(i)))
        .sum()
}

#[test]
fn three_attestors_verify_claim() {
    // =========================================================
    // Setup: three attestors with stake 2.0 each
    // =========================================================
    let mut p = protocol_with_attestors(3);
    let claim_id = submit(&mut p, "2025-10");
    assert_eq!(p.claim_status(claim_id), Some(ClaimStatus::Submitted));

    // =========================================================
    // Attest: quorum moves the claim to Attesting, not Verified
    // =========================================================
    for i in 1..=3 {
        let count = p.attest_to_claim(attestor(i), claim_id).expect("attest");
        assert_eq!(count, usize::from(i));
    }
    assert_eq!(p.claim_status(claim_id), Some(ClaimStatus::Attesting));
    assert_eq!(p.total_stake_per_claim(claim_id), 6 * UNITS_PER_TOKEN);
    assert_eq!(credited(&p, 3), 0);

    // =========================================================
    // Finalize: Verified, each attestor credited the fixed reward
    // =========================================================
    let disbursed = p.finalize_and_reward(claim_id).expect("finalize");
    assert_eq!(disbursed, ATTESTATION_FEE);
    assert_eq!(p.claim_status(claim_id), Some(ClaimStatus::Verified));
    for i in 1..=3 {
        assert_eq!(p.rewards_earned(&attestor(i)), REWARD_PER_ATTESTOR);
        let stats = p.attestor_stats(&attestor(i)).expect("stats");
        assert_eq!(stats.successful_attestations, 1);
    }
    assert_eq!(credited(&p, 3), p.claim(claim_id).expect("claim").fee_paid);
    assert_eq!(p.reward_pool().balance(), 0);

    // Second finalize is refused
    assert_eq!(
        p.finalize_and_reward(claim_id),
        Err(ProtocolError::Attestor(AttestorError::AlreadyFinalized(
            claim_id
        )))
    );
    p.audit().expect("audit");
}

#[test]
fn underpaid_fee_creates_no_claim() {
    let mut p = protocol_with_attestors(3);
    let before = p.total_claims();
    let err = p
        .submit_claim(ISSUER, submission("2025-10"), ATTESTATION_FEE - 1)
        .expect_err("underpaid");
    assert_eq!(
        err,
        ProtocolError::Registry(RegistryError::InsufficientFee {
            required: ATTESTATION_FEE,
            paid: ATTESTATION_FEE - 1,
        })
    );
    assert_eq!(p.total_claims(), before);
    assert_eq!(p.reward_pool().total_fees(), 0);

    // Overpayment is refused as well
    assert!(matches!(
        p.submit_claim(ISSUER, submission("2025-10"), ATTESTATION_FEE + 1),
        Err(ProtocolError::Registry(RegistryError::ExcessFee { .. }))
    ));
    assert_eq!(p.total_claims(), before);
}

#[test]
fn unregistered_attestor_cannot_attest() {
    let mut p = protocol_with_attestors(3);
    let claim_id = submit(&mut p, "2025-10");
    let stranger = attestor(0x77);

    assert_eq!(
        p.attest_to_claim(stranger, claim_id),
        Err(ProtocolError::Attestor(AttestorError::NotRegistered))
    );
    assert_eq!(p.claim_status(claim_id), Some(ClaimStatus::Submitted));
    assert_eq!(p.attestor_count_per_claim(claim_id), 0);
    assert_eq!(p.total_stake_per_claim(claim_id), 0);
    assert!(!p.has_attested(claim_id, &stranger));
}

#[test]
fn attestation_is_idempotent() {
    let mut p = protocol_with_attestors(4);
    let claim_id = submit(&mut p, "2025-10");
    p.attest_to_claim(attestor(1), claim_id).expect("attest");
    let stake = p.total_stake_per_claim(claim_id);

    for _ in 0..3 {
        assert_eq!(
            p.attest_to_claim(attestor(1), claim_id),
            Err(ProtocolError::Attestor(AttestorError::AlreadyAttested(
                claim_id
            )))
        );
        assert_eq!(p.total_stake_per_claim(claim_id), stake);
        assert_eq!(p.attestor_count_per_claim(claim_id), 1);
    }

    // Count never decreases and stops at the quorum
    p.attest_to_claim(attestor(2), claim_id).expect("attest");
    p.attest_to_claim(attestor(3), claim_id).expect("attest");
    assert_eq!(p.attestor_count_per_claim(claim_id), MIN_QUORUM);
    assert_eq!(
        p.attest_to_claim(attestor(4), claim_id),
        Err(ProtocolError::Attestor(AttestorError::QuorumFull(claim_id)))
    );
    assert_eq!(p.attestor_count_per_claim(claim_id), MIN_QUORUM);
}

#[test]
fn rewards_accumulate_across_claims() {
    let mut p = protocol_with_attestors(3);

    for period in ["2025-09", "2025-10"] {
        let claim_id = submit(&mut p, period);
        for i in 1..=3 {
            p.attest_to_claim(attestor(i), claim_id).expect("attest");
        }
        p.finalize_and_reward(claim_id).expect("finalize");

        let claimed = p.claim_rewards(attestor(1)).expect("claim rewards");
        assert_eq!(claimed, REWARD_PER_ATTESTOR);
        assert_eq!(
            p.claim_rewards(attestor(1)),
            Err(ProtocolError::Attestor(AttestorError::NothingToClaim))
        );
    }

    assert_eq!(p.total_claimed(&attestor(1)), REWARD_PER_ATTESTOR * 2);
    assert_eq!(p.rewards_earned(&attestor(1)), 0);
    // Attestors 2 and 3 never pulled
    assert_eq!(p.rewards_earned(&attestor(2)), REWARD_PER_ATTESTOR * 2);

    // Earned + claimed equals reward * quorum over every finalized claim
    assert_eq!(credited(&p, 3), REWARD_PER_ATTESTOR * MIN_QUORUM as Amount * 2);

    // Pool balance + disbursed equals fees collected
    let pool = p.reward_pool();
    assert_eq!(pool.balance() + pool.total_disbursed(), pool.total_fees());

    let paid: Amount = p.payouts().pending().iter().map(|x| x.amount).sum();
    assert_eq!(paid, REWARD_PER_ATTESTOR * 2);
    p.audit().expect("audit");
}

#[test]
fn finalize_requires_quorum() {
    let mut p = protocol_with_attestors(2);
    let claim_id = submit(&mut p, "2025-10");
    p.attest_to_claim(attestor(1), claim_id).expect("attest");
    p.attest_to_claim(attestor(2), claim_id).expect("attest");
    assert_eq!(
        p.finalize_and_reward(claim_id),
        Err(ProtocolError::Attestor(AttestorError::QuorumNotMet {
            required: MIN_QUORUM,
            actual: 2,
        }))
    );
    assert_eq!(p.claim_status(claim_id), Some(ClaimStatus::Submitted));
    assert_eq!(credited(&p, 2), 0);
}

#[test]
fn flagged_claim_cannot_be_finalized() {
    let mut p = protocol_with_attestors(3);
    let claim_id = submit(&mut p, "2025-10");
    for i in 1..=2 {
        p.attest_to_claim(attestor(i), claim_id).expect("attest");
    }
    p.flag_claim(attestor(3), claim_id).expect("flag");
    assert_eq!(p.claim_status(claim_id), Some(ClaimStatus::Flagged));
    assert!(p.finalize_and_reward(claim_id).is_err());
    assert!(p.attest_to_claim(attestor(3), claim_id).is_err());
    // The fee stays in the pool
    assert_eq!(p.reward_pool().balance(), ATTESTATION_FEE);
    p.audit().expect("audit");
}
