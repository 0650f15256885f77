//! Claim command handlers.

use serde::Deserialize;
use serde_json::{json, Value};
use yieldgate_registry::ClaimSubmission;
use yieldgate_types::{Amount, ClaimId};

use super::{execute, parse, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

#[derive(Deserialize)]
struct SubmitParams {
    #[serde(flatten)]
    submission: ClaimSubmission,
    /// Value attached to the submission.
    fee: Amount,
}

#[derive(Deserialize)]
struct ClaimParams {
    claim_id: ClaimId,
}

/// Submit a yield claim paying the attestation fee.
pub async fn submit_claim(state: &DaemonState, params: &Value) -> Result {
    execute(state, "submit_claim", params, |protocol, caller, params| {
        let p: SubmitParams = parse(params)?;
        let claim_id = protocol
            .submit_claim(caller, p.submission, p.fee)
            .map_err(RpcError::from)?;
        Ok(json!({ "claim_id": claim_id }))
    })
    .await
}

/// Reject an open claim. Authority only.
pub async fn reject_claim(state: &DaemonState, params: &Value) -> Result {
    execute(state, "reject_claim", params, |protocol, caller, params| {
        let p: ClaimParams = parse(params)?;
        protocol
            .reject_claim(caller, p.claim_id)
            .map_err(RpcError::from)?;
        Ok(json!({ "claim_id": p.claim_id, "status": protocol.claim_status(p.claim_id) }))
    })
    .await
}
