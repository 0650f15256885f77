//! Read-only ledger queries. Unauthenticated.

use serde::Deserialize;
use serde_json::{json, Value};
use yieldgate_types::{AccountId, ClaimId};

use super::{parse, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// Page size when `list_claims` is called without a limit.
const DEFAULT_PAGE: usize = 50;
const MAX_PAGE: usize = 500;

#[derive(Deserialize)]
struct ClaimParams {
    claim_id: ClaimId,
}

#[derive(Deserialize)]
struct PageParams {
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct AttestorParams {
    attestor: AccountId,
}

#[derive(Deserialize)]
struct HasAttestedParams {
    claim_id: ClaimId,
    attestor: AccountId,
}

#[derive(Deserialize)]
struct AccountParams {
    account: AccountId,
}

/// Number of claims ever submitted.
pub async fn total_claims(state: &DaemonState) -> Result {
    let core = state.core.lock().await;
    Ok(json!({ "total_claims": core.protocol.total_claims() }))
}

/// A claim by id.
pub async fn get_claim(state: &DaemonState, params: &Value) -> Result {
    let p: ClaimParams = parse(params)?;
    let core = state.core.lock().await;
    let claim = core.protocol.claim(p.claim_id).map_err(RpcError::from)?;
    Ok(json!(claim))
}

/// A page of claims in id order.
pub async fn list_claims(state: &DaemonState, params: &Value) -> Result {
    let p: PageParams = parse(params)?;
    let limit = p.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
    let core = state.core.lock().await;
    let claims = core.protocol.registry().claims(p.offset, limit);
    Ok(json!({
        "total_claims": core.protocol.total_claims(),
        "claims": claims,
    }))
}

/// Stake, rewards, counters and trust score of an attestor.
pub async fn get_attestor_stats(state: &DaemonState, params: &Value) -> Result {
    let p: AttestorParams = parse(params)?;
    let core = state.core.lock().await;
    let stats = core.protocol.attestor_stats(&p.attestor);
    Ok(json!({
        "attestor": p.attestor,
        "registered": stats.is_some(),
        "stats": stats,
    }))
}

/// Whether an attestor has attested to a claim.
pub async fn has_attested(state: &DaemonState, params: &Value) -> Result {
    let p: HasAttestedParams = parse(params)?;
    let core = state.core.lock().await;
    Ok(json!({ "has_attested": core.protocol.has_attested(p.claim_id, &p.attestor) }))
}

/// Attestation totals for a claim.
pub async fn get_claim_attestations(state: &DaemonState, params: &Value) -> Result {
    let p: ClaimParams = parse(params)?;
    let core = state.core.lock().await;
    let record = core.protocol.ledger().record(p.claim_id);
    Ok(json!({
        "claim_id": p.claim_id,
        "attestor_count": core.protocol.attestor_count_per_claim(p.claim_id),
        "total_stake": core.protocol.total_stake_per_claim(p.claim_id),
        "attestors": record.map(|r| r.attestors().to_vec()).unwrap_or_default(),
        "finalized": record.is_some_and(|r| r.is_finalized()),
    }))
}

/// Whether a claim's escrow may be released.
pub async fn can_unlock_yield(state: &DaemonState, params: &Value) -> Result {
    let p: ClaimParams = parse(params)?;
    let core = state.core.lock().await;
    Ok(json!({
        "claim_id": p.claim_id,
        "can_unlock": core.protocol.can_unlock_yield(p.claim_id),
        "unlocked": core.protocol.vault().is_unlocked(p.claim_id),
    }))
}

/// Free vault balance of an account.
pub async fn get_balance(state: &DaemonState, params: &Value) -> Result {
    let p: AccountParams = parse(params)?;
    let core = state.core.lock().await;
    Ok(json!({ "account": p.account, "balance": core.protocol.balance(&p.account) }))
}

/// Escrow held for a claim.
pub async fn get_escrow(state: &DaemonState, params: &Value) -> Result {
    let p: ClaimParams = parse(params)?;
    let core = state.core.lock().await;
    let escrow = core.protocol.escrow(p.claim_id);
    Ok(json!({
        "claim_id": p.claim_id,
        "balance": escrow.map_or(0, |e| e.balance()),
        "released": escrow.map_or(0, |e| e.released()),
        "investors": escrow.map_or(0, |e| e.investor_count()),
        "unlocked": escrow.is_some_and(|e| e.is_unlocked()),
    }))
}

/// Reward pool balance and lifetime totals.
pub async fn get_reward_pool(state: &DaemonState) -> Result {
    let core = state.core.lock().await;
    let pool = core.protocol.reward_pool();
    Ok(json!({
        "balance": pool.balance(),
        "total_fees": pool.total_fees(),
        "total_slashed_in": pool.total_slashed_in(),
        "total_disbursed": pool.total_disbursed(),
        "total_burned": core.protocol.ledger().total_burned(),
    }))
}

/// Vault lifetime totals.
pub async fn get_vault_totals(state: &DaemonState) -> Result {
    let core = state.core.lock().await;
    let vault = core.protocol.vault();
    Ok(json!({
        "total_deposits": vault.total_deposits(),
        "total_withdrawn": vault.total_withdrawn(),
        "total_released": vault.total_released(),
        "accounts": vault.account_count(),
    }))
}

/// Compile-time protocol constants.
pub async fn get_protocol_constants(state: &DaemonState) -> Result {
    let core = state.core.lock().await;
    Ok(json!(core.protocol.protocol_constants()))
}
