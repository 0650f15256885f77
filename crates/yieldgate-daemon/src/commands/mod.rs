//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Mutating
//! commands go through [`execute`], which authenticates the caller, runs
//! the command against the ledgers and persists the result before the
//! response is produced.

pub mod attestor;
pub mod claims;
pub mod queries;
pub mod system;
pub mod vault;

use serde::de::DeserializeOwned;
use serde_json::Value;
use yieldgate_crypto::blake3::transaction_hash;
use yieldgate_db::queries::nonces;
use yieldgate_db::state::{self, Commit};
use yieldgate_protocol::{PayoutJournal, Protocol};
use yieldgate_types::AccountId;

use crate::auth::{self, Authenticated};
use crate::rpc::RpcError;
use crate::DaemonState;

pub(crate) type Result = std::result::Result<Value, RpcError>;

/// Decode method parameters. Missing params decode as an empty object.
pub(crate) fn parse<T: DeserializeOwned>(params: &Value) -> std::result::Result<T, RpcError> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(&e.to_string()))
}

fn db_error(e: yieldgate_db::DbError) -> RpcError {
    RpcError::internal_error(&format!("db error: {e}"))
}

/// Verify the caller's signature and nonce against storage.
///
/// Storage must be locked by the caller.
pub(crate) fn authenticate(
    db: &rusqlite::Connection,
    method: &str,
    params: &Value,
) -> std::result::Result<Authenticated, RpcError> {
    let auth = auth::verify(method, params)?;
    if let Some(last) = nonces::get(db, auth.caller.as_bytes()).map_err(db_error)? {
        if auth.nonce <= last {
            return Err(RpcError::nonce_replayed(auth.nonce, last));
        }
    }
    Ok(auth)
}

/// Burn the nonce of a rejected request so it cannot be replayed.
pub(crate) fn burn_nonce(db: &rusqlite::Connection, auth: &Authenticated) {
    if let Err(e) = state::burn_nonce(db, auth.caller.as_bytes(), auth.nonce) {
        tracing::warn!(caller = %auth.caller, nonce = auth.nonce, error = %e, "failed to burn nonce");
    }
}

/// Run an authenticated ledger command and commit it.
///
/// `run` receives the protocol, the verified caller and the parameters
/// without the auth envelope. On success the command's events, payouts and
/// the new ledger state are written in one transaction, then the events are
/// broadcast. On failure nothing but the nonce is recorded.
pub(crate) async fn execute<F>(state: &DaemonState, method: &'static str, params: &Value, run: F) -> Result
where
    F: FnOnce(&mut Protocol<PayoutJournal>, AccountId, &Value) -> Result,
{
    let mut guard = state.core.lock().await;
    let core = &mut *guard;

    let auth = authenticate(&core.db, method, params)?;
    let value = match run(&mut core.protocol, auth.caller, &auth.params) {
        Ok(value) => value,
        Err(e) => {
            burn_nonce(&core.db, &auth);
            return Err(e);
        }
    };

    let events = core.protocol.drain_events();
    let payouts = core.protocol.payouts_mut().drain();
    let seq = core.seq + 1;
    let tx_hash = transaction_hash(auth.caller.as_bytes(), method, seq);
    let committed_at = yieldgate_db::unix_now();

    let commit = Commit {
        seq,
        tx_hash,
        caller: Some(*auth.caller.as_bytes()),
        nonce: Some(auth.nonce),
        method,
        params: &auth.params,
        events: &events,
        payouts: &payouts,
        committed_at,
    };
    if let Err(e) = state::persist_commit(&mut core.db, &core.protocol, &commit) {
        tracing::error!(method, seq, error = %e, "commit failed; restoring last snapshot");
        if let Err(reload) = core.reload() {
            tracing::error!(error = %reload, "snapshot reload failed");
        }
        return Err(db_error(e));
    }
    core.seq = seq;
    drop(guard);

    tracing::info!(
        method,
        seq,
        caller = %auth.caller,
        events = events.len(),
        payouts = payouts.len(),
        "command committed"
    );
    state.event_bus.emit_committed(seq, committed_at, &events);

    let mut value = value;
    if let Value::Object(ref mut map) = value {
        map.insert("seq".to_string(), Value::from(seq));
        map.insert("tx_hash".to_string(), Value::from(hex::encode(tx_hash)));
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::Value;
    use yieldgate_crypto::ed25519::KeyPair;

    use crate::auth::sign_request;
    use crate::config::DaemonConfig;
    use crate::rpc::{dispatch_request, RpcRequest, RpcResponse};
    use crate::DaemonState;

    /// A daemon with an in-memory database and a known authority key.
    pub(crate) struct Harness {
        pub state: Arc<DaemonState>,
        pub authority: KeyPair,
    }

    impl Harness {
        pub(crate) fn new() -> Self {
            let authority = KeyPair::generate();
            let mut config = DaemonConfig::default();
            config.protocol.authority = authority.account_id().to_hex();
            let state = DaemonState::in_memory(config).expect("state");
            Self {
                state: Arc::new(state),
                authority,
            }
        }

        pub(crate) async fn call(&self, method: &str, params: Value) -> RpcResponse {
            dispatch_request(
                self.state.clone(),
                RpcRequest {
                    jsonrpc: "2.0".to_string(),
                    id: Value::from(1),
                    method: method.to_string(),
                    params,
                },
            )
            .await
        }

        pub(crate) async fn signed(
            &self,
            key: &KeyPair,
            nonce: u64,
            method: &str,
            params: Value,
        ) -> RpcResponse {
            let params = sign_request(key, method, params, nonce).expect("sign");
            self.call(method, params).await
        }
    }

    pub(crate) fn ok(resp: RpcResponse) -> Value {
        assert!(resp.error.is_none(), "unexpected error: {:?}", resp.error);
        resp.result.expect("result")
    }

    pub(crate) fn err_code(resp: RpcResponse) -> i32 {
        resp.error.expect("error response").code
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use yieldgate_crypto::ed25519::KeyPair;

    use super::test_support::{err_code, ok, Harness};

    #[tokio::test]
    async fn test_commit_advances_seq_and_logs() {
        let h = Harness::new();
        let investor = KeyPair::generate();
        let first = ok(h.signed(&investor, 1, "deposit", json!({"amount": 100})).await);
        assert_eq!(first["seq"], 1);
        assert_eq!(first["balance"], 100);
        let second = ok(h.signed(&investor, 2, "deposit", json!({"amount": 50})).await);
        assert_eq!(second["seq"], 2);
        assert_ne!(first["tx_hash"], second["tx_hash"]);

        let core = h.state.core.lock().await;
        assert_eq!(core.seq, 2);
        let stored = yieldgate_db::state::load(&core.db)
            .expect("load")
            .expect("snapshot");
        assert_eq!(stored.seq, 2);
        assert_eq!(stored.vault.balance(&investor.account_id()), 150);
    }

    #[tokio::test]
    async fn test_replayed_request_rejected() {
        let h = Harness::new();
        let investor = KeyPair::generate();
        ok(h.signed(&investor, 5, "deposit", json!({"amount": 100})).await);
        assert_eq!(
            err_code(h.signed(&investor, 5, "deposit", json!({"amount": 100})).await),
            -32012
        );
        assert_eq!(
            err_code(h.signed(&investor, 4, "deposit", json!({"amount": 100})).await),
            -32012
        );
        let core = h.state.core.lock().await;
        assert_eq!(core.protocol.balance(&investor.account_id()), 100);
    }

    #[tokio::test]
    async fn test_rejected_command_burns_nonce() {
        let h = Harness::new();
        let investor = KeyPair::generate();
        assert_eq!(
            err_code(h.signed(&investor, 1, "withdraw", json!({"amount": 1})).await),
            -32023
        );
        assert_eq!(
            err_code(h.signed(&investor, 1, "deposit", json!({"amount": 1})).await),
            -32012
        );
        ok(h.signed(&investor, 2, "deposit", json!({"amount": 1})).await);
        assert_eq!(h.state.core.lock().await.seq, 1);
    }

    #[tokio::test]
    async fn test_unsigned_mutation_rejected() {
        let h = Harness::new();
        assert_eq!(err_code(h.call("deposit", json!({"amount": 1})).await), -32010);
    }

    #[tokio::test]
    async fn test_committed_events_broadcast() {
        let h = Harness::new();
        let mut rx = h.state.event_bus.subscribe();
        let investor = KeyPair::generate();
        ok(h.signed(&investor, 1, "deposit", json!({"amount": 9})).await);
        let event = rx.try_recv().expect("event");
        assert_eq!(event.event_type, "Deposited");
        assert_eq!(event.seq, 1);
        assert!(rx.try_recv().is_err());
    }
}
