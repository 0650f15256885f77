//! Attestor command handlers.

use serde::Deserialize;
use serde_json::{json, Value};
use yieldgate_types::{AccountId, Amount, ClaimId};

use super::{execute, parse, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

#[derive(Deserialize)]
struct StakeParams {
    stake: Amount,
}

#[derive(Deserialize)]
struct AmountParams {
    amount: Amount,
}

#[derive(Deserialize)]
struct ClaimParams {
    claim_id: ClaimId,
}

#[derive(Deserialize)]
struct SlashParams {
    attestor: AccountId,
    amount: Amount,
}

/// Register the caller as an attestor with the attached stake.
pub async fn register(state: &DaemonState, params: &Value) -> Result {
    execute(state, "register", params, |protocol, caller, params| {
        let p: StakeParams = parse(params)?;
        protocol.register(caller, p.stake).map_err(RpcError::from)?;
        Ok(json!({ "attestor": caller, "stake": p.stake }))
    })
    .await
}

/// Add the attached amount to the caller's stake.
pub async fn add_stake(state: &DaemonState, params: &Value) -> Result {
    execute(state, "add_stake", params, |protocol, caller, params| {
        let p: AmountParams = parse(params)?;
        let stake = protocol
            .add_stake(caller, p.amount)
            .map_err(RpcError::from)?;
        Ok(json!({ "stake": stake }))
    })
    .await
}

/// Attest to a claim.
pub async fn attest_to_claim(state: &DaemonState, params: &Value) -> Result {
    execute(state, "attest_to_claim", params, |protocol, caller, params| {
        let p: ClaimParams = parse(params)?;
        let count = protocol
            .attest_to_claim(caller, p.claim_id)
            .map_err(RpcError::from)?;
        Ok(json!({
            "claim_id": p.claim_id,
            "attestor_count": count,
            "total_stake": protocol.total_stake_per_claim(p.claim_id),
        }))
    })
    .await
}

/// Finalize a claim that reached quorum and credit its attestors.
pub async fn finalize_and_reward(state: &DaemonState, params: &Value) -> Result {
    execute(state, "finalize_and_reward", params, |protocol, _caller, params| {
        let p: ClaimParams = parse(params)?;
        let disbursed = protocol
            .finalize_and_reward(p.claim_id)
            .map_err(RpcError::from)?;
        Ok(json!({
            "claim_id": p.claim_id,
            "disbursed": disbursed,
            "attestor_count": protocol.attestor_count_per_claim(p.claim_id),
        }))
    })
    .await
}

/// Pay out the caller's accumulated rewards.
pub async fn claim_rewards(state: &DaemonState, params: &Value) -> Result {
    execute(state, "claim_rewards", params, |protocol, caller, _params| {
        let amount = protocol.claim_rewards(caller).map_err(RpcError::from)?;
        Ok(json!({ "amount": amount }))
    })
    .await
}

/// Slash an attestor. Authority only.
pub async fn slash(state: &DaemonState, params: &Value) -> Result {
    execute(state, "slash", params, |protocol, caller, params| {
        let p: SlashParams = parse(params)?;
        let outcome = protocol
            .slash(caller, p.attestor, p.amount)
            .map_err(RpcError::from)?;
        Ok(json!({
            "attestor": p.attestor,
            "slashed": outcome.slashed,
            "remaining_stake": outcome.remaining_stake,
            "policy": outcome.policy,
        }))
    })
    .await
}

/// Flag an open claim as disputed.
pub async fn flag_claim(state: &DaemonState, params: &Value) -> Result {
    execute(state, "flag_claim", params, |protocol, caller, params| {
        let p: ClaimParams = parse(params)?;
        protocol
            .flag_claim(caller, p.claim_id)
            .map_err(RpcError::from)?;
        Ok(json!({ "claim_id": p.claim_id, "status": protocol.claim_status(p.claim_id) }))
    })
    .await
}
