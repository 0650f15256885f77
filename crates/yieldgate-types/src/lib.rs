//! # yieldgate-types
//!
//! Shared domain types used across the Yieldgate workspace: account
//! identities, amounts, claim status, ledger events and the fixed protocol
//! constants.

pub mod claim;
pub mod constants;
pub mod events;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

pub use claim::{Claim, ClaimStatus, TransitionError};
pub use constants::ProtocolConstants;
pub use events::LedgerEvent;

/// Amount in base units of the native staking token.
pub type Amount = u64;

/// Sequential claim identifier, zero-based.
pub type ClaimId = u64;

/// 32-byte content or transaction digest.
pub type Hash = [u8; 32];

/// Base units per whole token (1 token = 100,000,000 base units).
pub const UNITS_PER_TOKEN: Amount = 100_000_000;

/// Identity of a protocol participant.
///
/// Wraps the 32-byte Ed25519 public key supplied by the wallet/session
/// provider. Serialized as lowercase hex.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(#[serde_as(as = "serde_with::hex::Hex")] pub [u8; 32]);

/// Error returned when parsing an [`AccountId`] from hex.
#[derive(Debug, thiserror::Error)]
pub enum ParseAccountIdError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("account id must be 32 bytes, got {0}")]
    Length(usize),
}

impl AccountId {
    /// Create an account id from raw key bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, ParseAccountIdError> {
        let bytes = hex::decode(s)?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseAccountIdError::Length(len))?;
        Ok(Self(arr))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "{}", &hex::encode(&self.0[..6]))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}
