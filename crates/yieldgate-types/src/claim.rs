//! Yield claim record and its status state machine.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, ClaimId};

/// Lifecycle status of a yield claim.
///
/// ```text
/// Submitted ──► Attesting ──► Verified
///     │             │
///     └──► Flagged / Rejected ◄──┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Submitted,
    Attesting,
    Verified,
    Flagged,
    Rejected,
}

impl ClaimStatus {
    /// Whether no further transition is possible from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Flagged | Self::Rejected)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self, next),
            (Submitted, Attesting)
                | (Attesting, Verified)
                | (Submitted | Attesting, Flagged)
                | (Submitted | Attesting, Rejected)
        )
    }
}

/// A status change the state machine refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("claim {claim_id}: cannot move from {from:?} to {to:?}")]
pub struct TransitionError {
    pub claim_id: ClaimId,
    /// `None` when the claim does not exist.
    pub from: Option<ClaimStatus>,
    pub to: ClaimStatus,
}

/// A yield claim asserted by an issuer.
///
/// Everything except `status` is fixed at submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub issuer: AccountId,
    pub asset_id: String,
    pub period: String,
    /// Fixed-point yield, scaled by 10^[`YIELD_DECIMALS`](crate::constants::YIELD_DECIMALS).
    pub yield_amount: u64,
    /// Opaque reference returned by the document store.
    pub document_hash: String,
    pub fee_paid: Amount,
    pub status: ClaimStatus,
}
