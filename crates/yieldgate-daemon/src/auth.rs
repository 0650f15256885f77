//! Request authentication.
//!
//! Mutating calls carry an `auth` object next to their parameters:
//!
//! ```json
//! {"amount": 100, "auth": {"caller": "<hex pubkey>", "nonce": 7, "signature": "<hex>"}}
//! ```
//!
//! The signature covers [`request_digest`] of the method, the parameters
//! without `auth` in canonical JSON (sorted keys, no whitespace) and the
//! nonce. Nonce freshness is checked against storage by the executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use yieldgate_crypto::blake3::request_digest;
use yieldgate_crypto::ed25519::{verify_account_signature, KeyPair, Signature};
use yieldgate_types::AccountId;

/// The `auth` member of a mutating request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthEnvelope {
    /// Hex Ed25519 public key.
    pub caller: String,
    pub nonce: u64,
    /// Hex Ed25519 signature.
    pub signature: String,
}

/// A request whose signature verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authenticated {
    pub caller: AccountId,
    pub nonce: u64,
    /// Parameters with the envelope removed.
    pub params: Value,
}

/// Authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing auth envelope")]
    Missing,

    #[error("malformed auth envelope: {0}")]
    Malformed(String),

    #[error("signature does not verify")]
    BadSignature,
}

/// Canonical bytes of request parameters.
pub fn canonical_params(params: &Value) -> Vec<u8> {
    // serde_json maps are sorted, so re-serialising a Value is canonical.
    serde_json::to_vec(params).unwrap_or_default()
}

/// Verify the envelope on a mutating request.
///
/// # Errors
///
/// - [`AuthError::Missing`] if there is no `auth` member
/// - [`AuthError::Malformed`] on undecodable caller, nonce or signature
/// - [`AuthError::BadSignature`] if the signature does not verify
pub fn verify(method: &str, params: &Value) -> Result<Authenticated, AuthError> {
    let mut params = match params {
        Value::Object(map) => map.clone(),
        Value::Null => return Err(AuthError::Missing),
        _ => return Err(AuthError::Malformed("params must be an object".into())),
    };
    let envelope = params.remove("auth").ok_or(AuthError::Missing)?;
    let envelope: AuthEnvelope =
        serde_json::from_value(envelope).map_err(|e| AuthError::Malformed(e.to_string()))?;

    let caller = AccountId::from_hex(&envelope.caller)
        .map_err(|e| AuthError::Malformed(format!("caller: {e}")))?;
    let signature = hex::decode(&envelope.signature)
        .map_err(|e| AuthError::Malformed(format!("signature: {e}")))?;
    let signature = Signature::from_slice(&signature)
        .map_err(|e| AuthError::Malformed(format!("signature: {e}")))?;

    let params = Value::Object(params);
    let digest = request_digest(method, &canonical_params(&params), envelope.nonce);
    verify_account_signature(&caller, &digest, &signature).map_err(|_| AuthError::BadSignature)?;

    tracing::trace!(method, caller = %caller, nonce = envelope.nonce, "request authenticated");
    Ok(Authenticated {
        caller,
        nonce: envelope.nonce,
        params,
    })
}

/// Attach a signed envelope to `params` (client side). `null` signs as
/// an empty object.
///
/// # Errors
///
/// - [`AuthError::Malformed`] if `params` is neither an object nor `null`
pub fn sign_request(
    keypair: &KeyPair,
    method: &str,
    params: Value,
    nonce: u64,
) -> Result<Value, AuthError> {
    let mut map = match params {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        _ => return Err(AuthError::Malformed("params must be an object".into())),
    };
    map.remove("auth");
    let unsigned = Value::Object(map.clone());
    let digest = request_digest(method, &canonical_params(&unsigned), nonce);
    let signature = keypair.sign(&digest);
    let envelope = AuthEnvelope {
        caller: keypair.account_id().to_hex(),
        nonce,
        signature: hex::encode(signature.to_bytes()),
    };
    let envelope =
        serde_json::to_value(envelope).map_err(|e| AuthError::Malformed(e.to_string()))?;
    map.insert("auth".to_string(), envelope);
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_signed_request_verifies() {
        let kp = KeyPair::generate();
        let params = sign_request(&kp, "deposit", json!({"amount": 100}), 1).expect("sign");
        let auth = verify("deposit", &params).expect("verify");
        assert_eq!(auth.caller, kp.account_id());
        assert_eq!(auth.nonce, 1);
        assert_eq!(auth.params, json!({"amount": 100}));
    }

    #[test]
    fn test_method_is_bound() {
        let kp = KeyPair::generate();
        let params = sign_request(&kp, "deposit", json!({"amount": 100}), 1).expect("sign");
        assert!(matches!(
            verify("withdraw", &params),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_tampered_params_rejected() {
        let kp = KeyPair::generate();
        let mut params =
            sign_request(&kp, "deposit", json!({"amount": 100}), 1).expect("sign");
        params["amount"] = json!(1_000_000);
        assert!(matches!(
            verify("deposit", &params),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_nonce_is_bound() {
        let kp = KeyPair::generate();
        let mut params =
            sign_request(&kp, "deposit", json!({"amount": 100}), 1).expect("sign");
        params["auth"]["nonce"] = json!(2);
        assert!(matches!(
            verify("deposit", &params),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn test_missing_and_malformed() {
        assert!(matches!(
            verify("deposit", &json!({"amount": 1})),
            Err(AuthError::Missing)
        ));
        assert!(matches!(verify("deposit", &Value::Null), Err(AuthError::Missing)));
        let bad = json!({"auth": {"caller": "00", "nonce": 1, "signature": "00"}});
        assert!(matches!(
            verify("deposit", &bad),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let kp = KeyPair::generate();
        let signed =
            sign_request(&kp, "submit_claim", json!({"b": 1, "a": 2}), 3).expect("sign");
        let text = serde_json::to_string(&signed).expect("encode");
        let reparsed: Value = serde_json::from_str(&text).expect("decode");
        verify("submit_claim", &reparsed).expect("verify");
    }

    #[test]
    fn test_non_object_params_refused() {
        let kp = KeyPair::generate();
        for params in [json!([1, 2]), json!(100), json!("amount")] {
            assert!(matches!(
                sign_request(&kp, "deposit", params, 1),
                Err(AuthError::Malformed(_))
            ));
        }
        let signed = sign_request(&kp, "claim_rewards", Value::Null, 1).expect("sign");
        let auth = verify("claim_rewards", &signed).expect("verify");
        assert_eq!(auth.params, json!({}));
    }
}
