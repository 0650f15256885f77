//! Events emitted by the ledgers when a command commits.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, ClaimId, ClaimStatus};

/// A committed ledger state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    AttestorRegistered {
        attestor: AccountId,
        stake: Amount,
    },
    StakeAdded {
        attestor: AccountId,
        amount: Amount,
        total: Amount,
    },
    ClaimSubmitted {
        claim_id: ClaimId,
        issuer: AccountId,
        asset_id: String,
        fee: Amount,
    },
    ClaimAttested {
        claim_id: ClaimId,
        attestor: AccountId,
        stake: Amount,
        attestor_count: usize,
    },
    ClaimStatusChanged {
        claim_id: ClaimId,
        from: ClaimStatus,
        to: ClaimStatus,
    },
    ClaimFinalized {
        claim_id: ClaimId,
        reward_per_attestor: Amount,
        attestor_count: usize,
    },
    RewardsClaimed {
        attestor: AccountId,
        amount: Amount,
    },
    AttestorSlashed {
        attestor: AccountId,
        amount: Amount,
        remaining: Amount,
    },
    Deposited {
        account: AccountId,
        amount: Amount,
    },
    Withdrawn {
        account: AccountId,
        amount: Amount,
    },
    CapitalCommitted {
        claim_id: ClaimId,
        investor: AccountId,
        amount: Amount,
    },
    CommitmentRefunded {
        claim_id: ClaimId,
        investor: AccountId,
        amount: Amount,
    },
    YieldUnlocked {
        claim_id: ClaimId,
        beneficiary: AccountId,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Event name in the form used by subscribers (e.g. `ClaimFinalized`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::AttestorRegistered { .. } => "AttestorRegistered",
            Self::StakeAdded { .. } => "StakeAdded",
            Self::ClaimSubmitted { .. } => "ClaimSubmitted",
            Self::ClaimAttested { .. } => "ClaimAttested",
            Self::ClaimStatusChanged { .. } => "ClaimStatusChanged",
            Self::ClaimFinalized { .. } => "ClaimFinalized",
            Self::RewardsClaimed { .. } => "RewardsClaimed",
            Self::AttestorSlashed { .. } => "AttestorSlashed",
            Self::Deposited { .. } => "Deposited",
            Self::Withdrawn { .. } => "Withdrawn",
            Self::CapitalCommitted { .. } => "CapitalCommitted",
            Self::CommitmentRefunded { .. } => "CommitmentRefunded",
            Self::YieldUnlocked { .. } => "YieldUnlocked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let ev = LedgerEvent::ClaimFinalized {
            claim_id: 4,
            reward_per_attestor: 10,
            attestor_count: 3,
        };
        let json = serde_json::to_value(&ev).expect("serialize");
        assert_eq!(json["type"], "claim_finalized");
        assert_eq!(json["claim_id"], 4);
        assert_eq!(ev.name(), "ClaimFinalized");
    }
}
