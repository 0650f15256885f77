//! # yieldgate-protocol
//!
//! Composes the attestor ledger, claim registry and vault into a single
//! [`Protocol`] aggregate. Every command runs with exclusive access to all
//! three ledgers, so cross-ledger commands never observe a torn state.
//!
//! External value transfers (reward claims, withdrawals, escrow releases)
//! go through the [`Payouts`] trait after the ledger entry is final. A
//! failed transfer is reverted and surfaces as
//! [`ProtocolError::PayoutFailed`].
//!
//! ## Modules
//!
//! - [`payouts`] — The outbound transfer seam and an in-memory journal
//! - [`protocol`] — The [`Protocol`] aggregate

pub mod payouts;
pub mod protocol;

use yieldgate_attestor::AttestorError;
use yieldgate_registry::RegistryError;
use yieldgate_types::{AccountId, Amount};
use yieldgate_vault::VaultError;

pub use payouts::{Payout, PayoutError, PayoutJournal, PayoutReason, Payouts};
pub use protocol::Protocol;

/// Error types for protocol commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Attestor(#[from] AttestorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    /// The outbound transfer failed and the ledger entry was reverted.
    #[error("payout of {amount} to {recipient} failed: {reason}")]
    PayoutFailed {
        recipient: AccountId,
        amount: Amount,
        reason: String,
    },
}

/// Convenience result type for protocol commands.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Error taxonomy shared by every command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed input: zero amounts, empty strings, out-of-range ids.
    Validation,
    /// Caller lacks the required role.
    Authorization,
    /// Current state forbids the command.
    Precondition,
    /// A pool or balance cannot cover the request.
    Resource,
    /// Transfer or internal accounting failure.
    Internal,
}

impl ProtocolError {
    /// Taxonomy class of this error.
    pub fn class(&self) -> ErrorClass {
        use ErrorClass::*;
        match self {
            Self::Attestor(e) => match e {
                AttestorError::ZeroStake | AttestorError::ZeroAmount => Validation,
                AttestorError::UnknownClaim(_) => Validation,
                AttestorError::NotRegistered | AttestorError::Unauthorized => Authorization,
                AttestorError::AlreadyRegistered
                | AttestorError::AlreadyAttested(_)
                | AttestorError::QuorumFull(_)
                | AttestorError::AlreadyFinalized(_)
                | AttestorError::ClaimNotActive { .. }
                | AttestorError::QuorumNotMet { .. }
                | AttestorError::NothingToClaim
                | AttestorError::InvalidTransition(_) => Precondition,
                AttestorError::InsufficientPool { .. }
                | AttestorError::InsufficientStake { .. }
                | AttestorError::Overflow => Resource,
                AttestorError::InvariantViolation(_) => Internal,
            },
            Self::Registry(e) => match e {
                RegistryError::EmptyAssetId
                | RegistryError::EmptyPeriod
                | RegistryError::EmptyDocumentHash
                | RegistryError::FieldTooLong { .. }
                | RegistryError::InvalidYieldAmount
                | RegistryError::InsufficientFee { .. }
                | RegistryError::ExcessFee { .. }
                | RegistryError::UnknownClaim(_) => Validation,
                RegistryError::Unauthorized => Authorization,
                RegistryError::InvalidTransition(_) => Precondition,
                RegistryError::FeeRouting(_) => Resource,
            },
            Self::Vault(e) => match e {
                VaultError::ZeroAmount | VaultError::UnknownClaim(_) => Validation,
                VaultError::CannotUnlock(_)
                | VaultError::AlreadyUnlocked(_)
                | VaultError::ClaimNotActive { .. }
                | VaultError::EmptyEscrow(_)
                | VaultError::NothingToRefund(_) => Precondition,
                VaultError::InsufficientBalance { .. } | VaultError::Overflow => Resource,
                VaultError::InvariantViolation(_) => Internal,
            },
            Self::PayoutFailed { .. } => Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            ProtocolError::from(AttestorError::NotRegistered).class(),
            ErrorClass::Authorization
        );
        assert_eq!(
            ProtocolError::from(RegistryError::InsufficientFee {
                required: 3,
                paid: 1
            })
            .class(),
            ErrorClass::Validation
        );
        assert_eq!(
            ProtocolError::from(AttestorError::InsufficientPool {
                required: 3,
                available: 0
            })
            .class(),
            ErrorClass::Resource
        );
        assert_eq!(
            ProtocolError::from(VaultError::AlreadyUnlocked(1)).class(),
            ErrorClass::Precondition
        );
        assert_eq!(
            ProtocolError::from(VaultError::EmptyEscrow(1)).class(),
            ErrorClass::Precondition
        );
    }

    #[test]
    fn test_transparent_display() {
        let err = ProtocolError::from(AttestorError::NothingToClaim);
        assert_eq!(err.to_string(), "nothing to claim");
    }
}
