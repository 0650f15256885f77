//! Domain-separated BLAKE3 hashing.
//!
//! ## Modes
//!
//! - [`hash`] — Pure hashing: document references
//! - [`derive_key`] — Per-purpose keys from a registered context string
//! - [`keyed_hash`] — Keyed digests for request signing and tx hashes

/// Registered BLAKE3 context strings. Using an unregistered context is a
/// protocol violation.
pub mod contexts {
    pub const REQUEST_DIGEST: &str = "Yieldgate v1 request-digest";
    pub const TRANSACTION_HASH: &str = "Yieldgate v1 transaction-hash";
    pub const DOCUMENT_REFERENCE: &str = "Yieldgate v1 document-reference";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[REQUEST_DIGEST, TRANSACTION_HASH, DOCUMENT_REFERENCE];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a key using BLAKE3's built-in key derivation mode.
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Compute a keyed BLAKE3 hash (MAC/PRF).
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, message).as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}

/// Digest a caller signs to authorize one request.
///
/// `keyed_hash(K_req, method || params || LE64(nonce))`, length-prefixed so
/// that no two distinct requests share a digest.
pub fn request_digest(method: &str, params: &[u8], nonce: u64) -> [u8; 32] {
    let key = derive_key(contexts::REQUEST_DIGEST, b"");
    let message = encode_multi_field(&[method.as_bytes(), params, &nonce.to_le_bytes()]);
    keyed_hash(&key, &message)
}

/// Hash identifying one committed command in the transaction log.
pub fn transaction_hash(caller: &[u8; 32], method: &str, seq: u64) -> [u8; 32] {
    let key = derive_key(contexts::TRANSACTION_HASH, b"");
    let message = encode_multi_field(&[caller, method.as_bytes(), &seq.to_le_bytes()]);
    keyed_hash(&key, &message)
}

/// Content reference for a document, in the hex form stored on a claim.
pub fn document_reference(document: &[u8]) -> String {
    hex::encode(derive_key(contexts::DOCUMENT_REFERENCE, document))
}
