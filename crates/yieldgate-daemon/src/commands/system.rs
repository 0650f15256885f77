//! Diagnostics and lifecycle command handlers.

use serde::Deserialize;
use serde_json::{json, Value};
use yieldgate_db::queries::{payouts, transactions};
use yieldgate_types::{AccountId, LedgerEvent};

use super::{authenticate, burn_nonce, db_error, parse, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

#[derive(Deserialize)]
struct RecentParams {
    #[serde(default = "default_recent")]
    limit: u32,
}

fn default_recent() -> u32 {
    20
}

#[derive(Deserialize)]
struct AccountParams {
    account: AccountId,
}

/// Daemon version, ledger sequence and subscriber counters.
pub async fn get_daemon_status(state: &DaemonState) -> Result {
    let core = state.core.lock().await;
    let ledger = core.protocol.ledger();
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "seq": core.seq,
        "authority": ledger.authority(),
        "slash_policy": ledger.slash_policy(),
        "attestors": ledger.attestor_count(),
        "claims": core.protocol.total_claims(),
        "events_emitted": state.event_bus.sequence(),
    }))
}

/// Most recent committed commands, newest first.
pub async fn get_recent_transactions(state: &DaemonState, params: &Value) -> Result {
    let p: RecentParams = parse(params)?;
    let core = state.core.lock().await;
    let rows = transactions::recent(&core.db, p.limit.min(500)).map_err(db_error)?;

    let result: Vec<Value> = rows
        .iter()
        .map(|tx| {
            json!({
                "seq": tx.seq,
                "tx_hash": hex::encode(tx.tx_hash),
                "caller": tx.caller.map(hex::encode),
                "method": tx.method,
                "params": serde_json::from_str::<Value>(&tx.params).unwrap_or(Value::Null),
                "events": serde_json::from_str::<Vec<LedgerEvent>>(&tx.events).unwrap_or_default(),
                "committed_at": tx.committed_at,
            })
        })
        .collect();

    Ok(json!(result))
}

/// Transfers made to an account.
pub async fn get_payouts(state: &DaemonState, params: &Value) -> Result {
    let p: AccountParams = parse(params)?;
    let core = state.core.lock().await;
    let rows = payouts::list_for(&core.db, p.account.as_bytes()).map_err(db_error)?;
    let total = payouts::total_for(&core.db, p.account.as_bytes()).map_err(db_error)?;

    let list: Vec<Value> = rows
        .iter()
        .map(|row| json!({ "seq": row.seq, "amount": row.amount, "reason": row.reason }))
        .collect();
    Ok(json!({ "account": p.account, "total": total, "payouts": list }))
}

/// Check every accounting invariant across the ledgers.
pub async fn audit(state: &DaemonState) -> Result {
    let core = state.core.lock().await;
    match core.protocol.audit() {
        Ok(()) => Ok(json!({ "ok": true, "seq": core.seq })),
        Err(e) => {
            tracing::error!(seq = core.seq, error = %e, "audit failed");
            Ok(json!({ "ok": false, "seq": core.seq, "violation": e.to_string() }))
        }
    }
}

/// Stop the daemon. Authority only.
pub async fn shutdown(state: &DaemonState, params: &Value) -> Result {
    let core = state.core.lock().await;
    let auth = authenticate(&core.db, "shutdown", params)?;
    burn_nonce(&core.db, &auth);
    if auth.caller != core.protocol.ledger().authority() {
        return Err(RpcError::unauthorized("caller is not the protocol authority"));
    }
    tracing::info!(caller = %auth.caller, "shutdown requested");
    let _ = state.shutdown_tx.send(());
    Ok(json!({ "shutting_down": true }))
}
