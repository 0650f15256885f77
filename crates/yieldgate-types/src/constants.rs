//! Fixed protocol constants.
//!
//! The fee and reward are tied together: a finalized claim pays exactly
//! `MIN_QUORUM * REWARD_PER_ATTESTOR`, which equals [`ATTESTATION_FEE`], so
//! total rewards disbursed can never exceed total fees collected.

use serde::{Deserialize, Serialize};

use crate::{Amount, UNITS_PER_TOKEN};

/// Distinct staked attestors required before a claim can be finalized.
pub const MIN_QUORUM: usize = 3;

/// Reward credited to each attestor of a finalized claim (0.01 token).
pub const REWARD_PER_ATTESTOR: Amount = UNITS_PER_TOKEN / 100;

/// Fee an issuer must pay to submit a claim (0.03 token).
pub const ATTESTATION_FEE: Amount = REWARD_PER_ATTESTOR * MIN_QUORUM as Amount;

/// Aggregate attested stake required before a claim's escrow can unlock (3 tokens).
pub const MIN_TOTAL_STAKE: Amount = 3 * UNITS_PER_TOKEN;

/// Decimal places in a claim's fixed-point `yield_amount` (525 = 5.25%).
pub const YIELD_DECIMALS: u32 = 2;

/// Upper bound of the informational trust score.
pub const MAX_TRUST_SCORE: u8 = 100;

/// Constants exposed to collaborators for discovery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConstants {
    pub min_quorum: usize,
    pub attestation_fee: Amount,
    pub reward_per_attestor: Amount,
    pub min_total_stake: Amount,
    pub yield_decimals: u32,
    pub units_per_token: Amount,
}

impl ProtocolConstants {
    /// The constants this build was compiled with.
    pub const fn current() -> Self {
        Self {
            min_quorum: MIN_QUORUM,
            attestation_fee: ATTESTATION_FEE,
            reward_per_attestor: REWARD_PER_ATTESTOR,
            min_total_stake: MIN_TOTAL_STAKE,
            yield_decimals: YIELD_DECIMALS,
            units_per_token: UNITS_PER_TOKEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_funds_exactly_one_quorum() {
        assert_eq!(REWARD_PER_ATTESTOR * MIN_QUORUM as Amount, ATTESTATION_FEE);
    }

    #[test]
    fn test_constant_values() {
        assert_eq!(MIN_QUORUM, 3);
        assert_eq!(ATTESTATION_FEE, 3_000_000);
        assert_eq!(REWARD_PER_ATTESTOR, 1_000_000);
        assert_eq!(MIN_TOTAL_STAKE, 300_000_000);
    }

    #[test]
    fn test_current_matches_consts() {
        let c = ProtocolConstants::current();
        assert_eq!(c.min_quorum, MIN_QUORUM);
        assert_eq!(c.attestation_fee, ATTESTATION_FEE);
        assert_eq!(c.min_total_stake, MIN_TOTAL_STAKE);
    }
}
