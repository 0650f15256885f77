//! Outbound value transfers.

use serde::{Deserialize, Serialize};
use yieldgate_types::{AccountId, Amount};

/// Why a transfer is being made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutReason {
    /// Attestor pulled their rewards.
    Rewards,
    /// Investor withdrew free capital.
    Withdrawal,
    /// Claim escrow released to the issuer.
    YieldRelease,
}

impl PayoutReason {
    /// Stable name for storage and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rewards => "rewards",
            Self::Withdrawal => "withdrawal",
            Self::YieldRelease => "yield_release",
        }
    }
}

/// A completed transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: AccountId,
    pub amount: Amount,
    pub reason: PayoutReason,
}

/// A transfer the payout layer could not make.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PayoutError(pub String);

/// Moves value out of the protocol.
///
/// Called only after the ledger entry for the amount is final.
pub trait Payouts {
    /// Transfer `amount` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`PayoutError`] if the transfer did not happen. The caller
    /// reverts its ledger entry.
    fn transfer(
        &mut self,
        recipient: AccountId,
        amount: Amount,
        reason: PayoutReason,
    ) -> std::result::Result<(), PayoutError>;
}

/// Records transfers in memory for a host to settle.
#[derive(Clone, Debug, Default)]
pub struct PayoutJournal {
    pending: Vec<Payout>,
    total_paid: Amount,
}

impl PayoutJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfers recorded since the last [`drain`](Self::drain).
    pub fn pending(&self) -> &[Payout] {
        &self.pending
    }

    /// Take the recorded transfers.
    pub fn drain(&mut self) -> Vec<Payout> {
        std::mem::take(&mut self.pending)
    }

    /// Lifetime amount recorded.
    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }
}

impl Payouts for PayoutJournal {
    fn transfer(
        &mut self,
        recipient: AccountId,
        amount: Amount,
        reason: PayoutReason,
    ) -> std::result::Result<(), PayoutError> {
        let total = self
            .total_paid
            .checked_add(amount)
            .ok_or_else(|| PayoutError("journal total overflow".to_string()))?;
        self.total_paid = total;
        self.pending.push(Payout {
            recipient,
            amount,
            reason,
        });
        tracing::debug!(recipient = %recipient, amount, reason = reason.as_str(), "payout recorded");
        Ok(())
    }
}
