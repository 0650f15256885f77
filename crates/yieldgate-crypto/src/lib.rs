//! # yieldgate-crypto
//!
//! Cryptographic primitives used at the Yieldgate boundary.
//!
//! The ledgers themselves never verify signatures; the daemon uses this
//! crate to authenticate every mutating request before it reaches them.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing (request digests, tx hashes)
//! - [`ed25519`] — Ed25519 caller keys and signature verification

pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid key or signature length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
