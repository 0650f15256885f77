//! # yieldgate-registry
//!
//! The claim registry: fee-bearing claim submission and the claim status
//! state machine. Fees are forwarded to the attestor ledger's reward pool
//! in the same command that creates the claim.
//!
//! ## Modules
//!
//! - [`submission`] — Input validation for new claims
//! - [`registry`] — The [`ClaimRegistry`] aggregate

pub mod registry;
pub mod submission;

use yieldgate_attestor::AttestorError;
use yieldgate_types::{Amount, ClaimId, TransitionError};

pub use registry::ClaimRegistry;
pub use submission::ClaimSubmission;

/// Error types for claim registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Asset identifier is empty.
    #[error("asset id must not be empty")]
    EmptyAssetId,

    /// Reporting period is empty.
    #[error("period must not be empty")]
    EmptyPeriod,

    /// Document reference is empty.
    #[error("document hash must not be empty")]
    EmptyDocumentHash,

    /// A text field exceeds its length limit.
    #[error("{field} exceeds {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },

    /// Yield amount is zero.
    #[error("yield amount must be greater than zero")]
    InvalidYieldAmount,

    /// Payment below the attestation fee.
    #[error("insufficient fee: required {required}, paid {paid}")]
    InsufficientFee { required: Amount, paid: Amount },

    /// Payment above the attestation fee. Overpayment is refused rather
    /// than retained.
    #[error("excess fee: required {required}, paid {paid}")]
    ExcessFee { required: Amount, paid: Amount },

    /// Claim id outside `[0, total_claims)`.
    #[error("unknown claim {0}")]
    UnknownClaim(ClaimId),

    /// Caller is not the protocol authority.
    #[error("caller is not the protocol authority")]
    Unauthorized,

    /// The state machine refused a transition.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Fee routing into the reward pool failed.
    #[error("fee routing failed: {0}")]
    FeeRouting(#[from] AttestorError),
}

/// Convenience result type for claim registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
