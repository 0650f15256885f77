//! Per-attestor balances and statistics.
//!
//! `rewards_earned` is the unclaimed balance and `total_claimed` the
//! lifetime amount paid out. Together they always reconcile with
//! `total_rewarded`, the lifetime sum of reward grants.

use serde::{Deserialize, Serialize};
use yieldgate_types::constants::MAX_TRUST_SCORE;
use yieldgate_types::Amount;

/// Successful attestations after which the volume component of the trust
/// score saturates.
pub const TRUST_VOLUME_CAP: u64 = 50;

/// A registered attestor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestor {
    pub stake: Amount,
    pub rewards_earned: Amount,
    pub total_claimed: Amount,
    pub total_rewarded: Amount,
    pub total_attestations: u64,
    pub successful_attestations: u64,
    /// Registration order, starting at 0.
    pub registered_seq: u64,
}

impl Attestor {
    pub(crate) fn new(stake: Amount, registered_seq: u64) -> Self {
        Self {
            stake,
            rewards_earned: 0,
            total_claimed: 0,
            total_rewarded: 0,
            total_attestations: 0,
            successful_attestations: 0,
            registered_seq,
        }
    }

    /// An attestor whose stake was slashed to zero may not attest.
    pub fn is_active(&self) -> bool {
        self.stake > 0
    }

    /// Informational trust score in `[0, 100]`.
    ///
    /// `accuracy / 2 + min(successful, 50)` where
    /// `accuracy = successful * 100 / total`. Monotone in both successful
    /// attestations and accuracy; zero before the first attestation.
    pub fn trust_score(&self) -> u8 {
        if self.total_attestations == 0 {
            return 0;
        }
        let successful = self.successful_attestations.min(self.total_attestations);
        let accuracy = successful.saturating_mul(100) / self.total_attestations;
        let volume = successful.min(TRUST_VOLUME_CAP);
        let score = (accuracy / 2 + volume).min(u64::from(MAX_TRUST_SCORE));
        score as u8
    }

    /// Lifetime reconciliation: grants == unclaimed + claimed.
    pub fn reconciles(&self) -> bool {
        self.rewards_earned.checked_add(self.total_claimed) == Some(self.total_rewarded)
    }

    /// Read-only stats view.
    pub fn stats(&self) -> AttestorStats {
        AttestorStats {
            stake: self.stake,
            rewards_earned: self.rewards_earned,
            total_claimed: self.total_claimed,
            total_attestations: self.total_attestations,
            successful_attestations: self.successful_attestations,
            trust_score: self.trust_score(),
        }
    }
}

/// Snapshot returned by the `attestor_stats` query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestorStats {
    pub stake: Amount,
    pub rewards_earned: Amount,
    pub total_claimed: Amount,
    pub total_attestations: u64,
    pub successful_attestations: u64,
    pub trust_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_counts(total: u64, successful: u64) -> Attestor {
        let mut a = Attestor::new(1, 0);
        a.total_attestations = total;
        a.successful_attestations = successful;
        a
    }

    #[test]
    fn test_trust_score_zero_without_history() {
        assert_eq!(with_counts(0, 0).trust_score(), 0);
    }

    #[test]
    fn test_trust_score_pending_attestations() {
        // Attested but nothing finalized yet: accuracy 0, volume 0.
        assert_eq!(with_counts(4, 0).trust_score(), 0);
    }

    #[test]
    fn test_trust_score_perfect_record() {
        assert_eq!(with_counts(1, 1).trust_score(), 51);
        assert_eq!(with_counts(50, 50).trust_score(), 100);
        assert_eq!(with_counts(500, 500).trust_score(), 100);
    }

    #[test]
    fn test_trust_score_monotone_in_successes() {
        let mut prev = 0;
        for s in 0..=60 {
            let score = with_counts(60, s).trust_score();
            assert!(score >= prev, "score dropped at {s}");
            prev = score;
        }
    }

    #[test]
    fn test_trust_score_bounded() {
        for total in [1, 7, 100, u64::MAX] {
            for successful in [0, 1, total / 2, total] {
                assert!(with_counts(total, successful).trust_score() <= 100);
            }
        }
    }

    #[test]
    fn test_reconciles() {
        let mut a = Attestor::new(10, 0);
        a.total_rewarded = 30;
        a.rewards_earned = 10;
        a.total_claimed = 20;
        assert!(a.reconciles());
        a.total_claimed = 21;
        assert!(!a.reconciles());
    }

    #[test]
    fn test_inactive_after_full_slash() {
        let mut a = Attestor::new(10, 0);
        assert!(a.is_active());
        a.stake = 0;
        assert!(!a.is_active());
    }
}
