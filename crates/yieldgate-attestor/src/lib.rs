//! # yieldgate-attestor
//!
//! The attestor ledger: registration and stake, per-claim attestation
//! records, the shared reward pool funded by submission fees, pull-based
//! reward claiming and slashing.
//!
//! This crate is the leaf of the ledger graph. It learns about claims only
//! through the [`ClaimBook`] trait, which the claim registry implements.
//!
//! ## Modules
//!
//! - [`attestor`] — Per-attestor balances, counters and trust score
//! - [`pool`] — Reward pool and its lifetime totals
//! - [`record`] — Per-claim attestation records
//! - [`ledger`] — The [`AttestorLedger`] aggregate and its commands

pub mod attestor;
pub mod ledger;
pub mod pool;
pub mod record;

use yieldgate_types::{Amount, ClaimId, ClaimStatus, TransitionError};

pub use attestor::{Attestor, AttestorStats};
pub use ledger::{AttestorLedger, SlashOutcome, SlashPolicy};
pub use pool::RewardPool;
pub use record::AttestationRecord;

/// Read and transition access to claim status.
///
/// Implemented by the claim registry. The attestor ledger is the only
/// caller of [`ClaimBook::advance`].
pub trait ClaimBook {
    /// Current status of a claim, or `None` if it does not exist.
    fn claim_status(&self, claim_id: ClaimId) -> Option<ClaimStatus>;

    /// Move a claim to `next`, returning its previous status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the claim does not exist or the state
    /// machine does not allow the move. No state changes on error.
    fn advance(
        &mut self,
        claim_id: ClaimId,
        next: ClaimStatus,
    ) -> std::result::Result<ClaimStatus, TransitionError>;
}

/// Error types for attestor ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestorError {
    /// Identity already holds an attestor record.
    #[error("attestor already registered")]
    AlreadyRegistered,

    /// Registration stake of zero.
    #[error("stake must be greater than zero")]
    ZeroStake,

    /// Amount of zero where a positive amount is required.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Caller is not a registered attestor with non-zero stake.
    #[error("caller is not a registered attestor")]
    NotRegistered,

    /// Claim does not exist or is no longer open for attestation.
    #[error("unknown claim {0}")]
    UnknownClaim(ClaimId),

    /// Caller already attested to this claim.
    #[error("already attested to claim {0}")]
    AlreadyAttested(ClaimId),

    /// Claim already holds a full quorum of attestations.
    #[error("claim {0} already has a full quorum")]
    QuorumFull(ClaimId),

    /// Claim has already been finalized.
    #[error("claim {0} already finalized")]
    AlreadyFinalized(ClaimId),

    /// Claim was flagged or rejected and can no longer be finalized.
    #[error("claim {claim_id} is {status:?}")]
    ClaimNotActive {
        claim_id: ClaimId,
        status: ClaimStatus,
    },

    /// Not enough attestors for finalization.
    #[error("quorum not met: need {required}, have {actual}")]
    QuorumNotMet { required: usize, actual: usize },

    /// Reward pool cannot cover the full distribution.
    #[error("insufficient reward pool: need {required}, have {available}")]
    InsufficientPool { required: Amount, available: Amount },

    /// No unclaimed rewards.
    #[error("nothing to claim")]
    NothingToClaim,

    /// Slash larger than the attestor's stake.
    #[error("insufficient stake: have {stake}, requested {requested}")]
    InsufficientStake { stake: Amount, requested: Amount },

    /// Caller is not the slashing authority.
    #[error("caller is not the protocol authority")]
    Unauthorized,

    /// The claim state machine refused a transition.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// A lifetime accounting invariant does not hold.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

/// Convenience result type for attestor ledger operations.
pub type Result<T> = std::result::Result<T, AttestorError>;
