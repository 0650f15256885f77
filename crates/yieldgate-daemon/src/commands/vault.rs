//! Vault command handlers.

use serde::Deserialize;
use serde_json::{json, Value};
use yieldgate_types::{Amount, ClaimId};

use super::{execute, parse, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

#[derive(Deserialize)]
struct AmountParams {
    amount: Amount,
}

#[derive(Deserialize)]
struct ClaimParams {
    claim_id: ClaimId,
}

#[derive(Deserialize)]
struct CommitParams {
    claim_id: ClaimId,
    amount: Amount,
}

/// Deposit the attached amount.
pub async fn deposit(state: &DaemonState, params: &Value) -> Result {
    execute(state, "deposit", params, |protocol, caller, params| {
        let p: AmountParams = parse(params)?;
        let balance = protocol.deposit(caller, p.amount).map_err(RpcError::from)?;
        Ok(json!({ "balance": balance }))
    })
    .await
}

/// Withdraw free capital.
pub async fn withdraw(state: &DaemonState, params: &Value) -> Result {
    execute(state, "withdraw", params, |protocol, caller, params| {
        let p: AmountParams = parse(params)?;
        let amount = protocol.withdraw(caller, p.amount).map_err(RpcError::from)?;
        Ok(json!({ "amount": amount, "balance": protocol.balance(&caller) }))
    })
    .await
}

/// Commit free capital to a claim's escrow.
pub async fn commit_to_claim(state: &DaemonState, params: &Value) -> Result {
    execute(state, "commit_to_claim", params, |protocol, caller, params| {
        let p: CommitParams = parse(params)?;
        let committed = protocol
            .commit_to_claim(caller, p.claim_id, p.amount)
            .map_err(RpcError::from)?;
        Ok(json!({ "claim_id": p.claim_id, "committed": committed }))
    })
    .await
}

/// Refund the caller's commitment to a flagged or rejected claim.
pub async fn refund_commitment(state: &DaemonState, params: &Value) -> Result {
    execute(state, "refund_commitment", params, |protocol, caller, params| {
        let p: ClaimParams = parse(params)?;
        let amount = protocol
            .refund_commitment(caller, p.claim_id)
            .map_err(RpcError::from)?;
        Ok(json!({ "claim_id": p.claim_id, "refunded": amount }))
    })
    .await
}

/// Release a verified claim's escrow to its issuer.
pub async fn unlock_yield(state: &DaemonState, params: &Value) -> Result {
    execute(state, "unlock_yield", params, |protocol, _caller, params| {
        let p: ClaimParams = parse(params)?;
        let release = protocol.unlock_yield(p.claim_id).map_err(RpcError::from)?;
        Ok(json!({
            "claim_id": release.claim_id,
            "beneficiary": release.beneficiary,
            "amount": release.amount,
        }))
    })
    .await
}
