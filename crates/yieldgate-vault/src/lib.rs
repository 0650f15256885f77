//! # yieldgate-vault
//!
//! Investor capital: free balances, per-claim escrow and the unlock gate.
//!
//! Capital moves in three steps. A deposit credits the investor's free
//! balance; a commitment moves part of it into one claim's escrow; an
//! unlock releases that escrow to the claim's issuer once the claim is
//! verified and backed by enough attested stake.
//!
//! ## Modules
//!
//! - [`escrow`] — Per-claim escrow and investor commitments
//! - [`vault`] — The [`Vault`] aggregate and the unlock gate

pub mod escrow;
pub mod vault;

use yieldgate_types::{Amount, ClaimId, ClaimStatus};

pub use escrow::ClaimEscrow;
pub use vault::{Release, Vault};

/// Error types for vault operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// Amount of zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Free balance below the requested amount.
    #[error("insufficient balance: have {balance}, requested {requested}")]
    InsufficientBalance { balance: Amount, requested: Amount },

    /// Unlock gate is closed for this claim.
    #[error("claim {0} cannot be unlocked")]
    CannotUnlock(ClaimId),

    /// Escrow for this claim was already released.
    #[error("claim {0} already unlocked")]
    AlreadyUnlocked(ClaimId),

    /// Claim does not exist.
    #[error("unknown claim {0}")]
    UnknownClaim(ClaimId),

    /// Claim status does not allow this operation.
    #[error("claim {claim_id} is {status:?}")]
    ClaimNotActive {
        claim_id: ClaimId,
        status: ClaimStatus,
    },

    /// Unlock of a claim with nothing committed.
    #[error("claim {0} has no escrow to release")]
    EmptyEscrow(ClaimId),

    /// Caller has no commitment to refund.
    #[error("nothing to refund for claim {0}")]
    NothingToRefund(ClaimId),

    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Capital conservation does not hold.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
