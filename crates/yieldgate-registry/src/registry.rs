//! The claim registry aggregate.
//!
//! Claims are append-only; only their status changes, and only through the
//! [`ClaimBook`] transitions the attestor ledger drives or an authority
//! rejection.

use serde::{Deserialize, Serialize};
use yieldgate_attestor::{AttestorLedger, ClaimBook};
use yieldgate_types::{
    AccountId, Amount, Claim, ClaimId, ClaimStatus, LedgerEvent, TransitionError,
};

use crate::submission::{check_fee, ClaimSubmission};
use crate::{RegistryError, Result};

/// Append-only store of yield claims.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimRegistry {
    authority: AccountId,
    claims: Vec<Claim>,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl ClaimRegistry {
    /// Create an empty registry. `authority` may reject claims.
    pub fn new(authority: AccountId) -> Self {
        Self {
            authority,
            claims: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Submit a claim, paying exactly the attestation fee.
    ///
    /// The fee is forwarded to `ledger`'s reward pool. On any error neither
    /// the registry nor the pool changes and the caller keeps `paid`.
    ///
    /// # Errors
    ///
    /// - Validation errors from [`ClaimSubmission::validate`]
    /// - [`RegistryError::InsufficientFee`] / [`RegistryError::ExcessFee`]
    pub fn submit_claim(
        &mut self,
        ledger: &mut AttestorLedger,
        issuer: AccountId,
        submission: ClaimSubmission,
        paid: Amount,
    ) -> Result<ClaimId> {
        submission.validate()?;
        check_fee(paid)?;

        let id = self.claims.len() as ClaimId;
        ledger.credit_fee(id, paid)?;

        let ClaimSubmission {
            asset_id,
            period,
            yield_amount,
            document_hash,
        } = submission;

        tracing::info!(
            claim_id = id,
            issuer = %issuer,
            asset_id = %asset_id,
            period = %period,
            yield_amount,
            "claim submitted"
        );
        self.events.push(LedgerEvent::ClaimSubmitted {
            claim_id: id,
            issuer,
            asset_id: asset_id.clone(),
            fee: paid,
        });
        self.claims.push(Claim {
            id,
            issuer,
            asset_id,
            period,
            yield_amount,
            document_hash,
            fee_paid: paid,
            status: ClaimStatus::Submitted,
        });
        Ok(id)
    }

    /// Reject an open claim. Authority only.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Unauthorized`] if `caller` is not the authority
    /// - [`RegistryError::UnknownClaim`] if the id is out of range
    /// - [`RegistryError::InvalidTransition`] if the claim is terminal
    pub fn reject_claim(&mut self, caller: AccountId, claim_id: ClaimId) -> Result<()> {
        if caller != self.authority {
            return Err(RegistryError::Unauthorized);
        }
        self.claim(claim_id)?;
        let from = self.advance(claim_id, ClaimStatus::Rejected)?;
        tracing::warn!(claim_id, ?from, "claim rejected");
        self.events.push(LedgerEvent::ClaimStatusChanged {
            claim_id,
            from,
            to: ClaimStatus::Rejected,
        });
        Ok(())
    }

    /// Number of claims ever submitted.
    pub fn total_claims(&self) -> u64 {
        self.claims.len() as u64
    }

    /// Claim by id.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownClaim`] if `claim_id >= total_claims()`
    pub fn claim(&self, claim_id: ClaimId) -> Result<&Claim> {
        usize::try_from(claim_id)
            .ok()
            .and_then(|idx| self.claims.get(idx))
            .ok_or(RegistryError::UnknownClaim(claim_id))
    }

    /// A page of claims in id order.
    pub fn claims(&self, offset: u64, limit: usize) -> &[Claim] {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.claims.len());
        let end = start.saturating_add(limit).min(self.claims.len());
        &self.claims[start..end]
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop events from a command that is being rolled back.
    pub fn discard_events(&mut self) {
        self.events.clear();
    }

    fn claim_mut(&mut self, claim_id: ClaimId) -> Option<&mut Claim> {
        usize::try_from(claim_id)
            .ok()
            .and_then(|idx| self.claims.get_mut(idx))
    }
}

impl ClaimBook for ClaimRegistry {
    fn claim_status(&self, claim_id: ClaimId) -> Option<ClaimStatus> {
        self.claim(claim_id).ok().map(|c| c.status)
    }

    fn advance(
        &mut self,
        claim_id: ClaimId,
        next: ClaimStatus,
    ) -> std::result::Result<ClaimStatus, TransitionError> {
        let Some(claim) = self.claim_mut(claim_id) else {
            return Err(TransitionError {
                claim_id,
                from: None,
                to: next,
            });
        };
        let from = claim.status;
        if !from.can_transition_to(next) {
            return Err(TransitionError {
                claim_id,
                from: Some(from),
                to: next,
            });
        }
        claim.status = next;
        tracing::debug!(claim_id, ?from, to = ?next, "claim status advanced");
        Ok(from)
    }
}
