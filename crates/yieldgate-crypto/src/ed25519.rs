//! Ed25519 caller keys.
//!
//! A participant's [`AccountId`] is the raw bytes of their Ed25519 public
//! key, so verifying a request needs nothing but the account it names and
//! the signature over its [`request_digest`](crate::blake3::request_digest).

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use yieldgate_types::AccountId;

use crate::{CryptoError, Result};

/// Length of an encoded signature.
pub const SIGNATURE_LEN: usize = 64;

/// An Ed25519 signature over a request digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    /// Parse a signature, rejecting anything but exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; SIGNATURE_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidLength {
                expected: SIGNATURE_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&raw)))
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0.to_bytes()
    }
}

/// A participant's signing key. The secret is wiped when dropped.
pub struct KeyPair {
    secret: SigningKey,
}

impl KeyPair {
    /// Fresh key from the operating system's RNG.
    pub fn generate() -> Self {
        Self {
            secret: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Key derived from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            secret: SigningKey::from_bytes(seed),
        }
    }

    /// The account this key controls.
    pub fn account_id(&self) -> AccountId {
        AccountId::new(self.secret.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.secret.sign(message))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("account", &self.account_id())
            .finish_non_exhaustive()
    }
}

/// Check that `account` signed `message`.
///
/// Uses strict verification, which rejects small-order keys and
/// malleable signatures.
///
/// # Errors
///
/// - [`CryptoError::InvalidInput`] if the account bytes are not a valid key
/// - [`CryptoError::SignatureVerification`] if the signature does not verify
pub fn verify_account_signature(
    account: &AccountId,
    message: &[u8],
    signature: &Signature,
) -> Result<()> {
    let key = VerifyingKey::from_bytes(account.as_bytes())
        .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
    key.verify_strict(message, &signature.0)
        .map_err(|_| CryptoError::SignatureVerification)
}
