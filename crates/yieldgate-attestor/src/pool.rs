//! Reward pool.
//!
//! A single balance credited by submission fees (and, under the
//! reward-pool slash policy, by slashed stake) and debited by finalization.
//! The lifetime totals let an auditor check conservation at any point:
//!
//! ```text
//! balance + total_disbursed == total_fees + total_slashed_in
//! ```

use serde::{Deserialize, Serialize};
use yieldgate_types::Amount;

use crate::{AttestorError, Result};

/// The shared reward pool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPool {
    balance: Amount,
    total_fees: Amount,
    total_slashed_in: Amount,
    total_disbursed: Amount,
}

impl RewardPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Lifetime submission fees credited.
    pub fn total_fees(&self) -> Amount {
        self.total_fees
    }

    /// Lifetime slashed stake credited.
    pub fn total_slashed_in(&self) -> Amount {
        self.total_slashed_in
    }

    /// Lifetime rewards debited by finalization.
    pub fn total_disbursed(&self) -> Amount {
        self.total_disbursed
    }

    /// Credit a submission fee.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::Overflow`] if either balance would overflow
    pub fn credit_fee(&mut self, fee: Amount) -> Result<()> {
        let balance = self.balance.checked_add(fee).ok_or(AttestorError::Overflow)?;
        let total_fees = self.total_fees.checked_add(fee).ok_or(AttestorError::Overflow)?;
        self.balance = balance;
        self.total_fees = total_fees;
        Ok(())
    }

    /// Credit slashed stake.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::Overflow`] if either balance would overflow
    pub fn credit_slash(&mut self, amount: Amount) -> Result<()> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(AttestorError::Overflow)?;
        let total = self
            .total_slashed_in
            .checked_add(amount)
            .ok_or(AttestorError::Overflow)?;
        self.balance = balance;
        self.total_slashed_in = total;
        Ok(())
    }

    /// Check that `amount` can be debited without touching state.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::InsufficientPool`] if the balance is too small
    pub fn ensure_covers(&self, amount: Amount) -> Result<()> {
        if self.balance < amount {
            return Err(AttestorError::InsufficientPool {
                required: amount,
                available: self.balance,
            });
        }
        if self.total_disbursed.checked_add(amount).is_none() {
            return Err(AttestorError::Overflow);
        }
        Ok(())
    }

    /// Debit a reward distribution. All-or-nothing.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::InsufficientPool`] if the balance is too small
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        self.ensure_covers(amount)?;
        self.balance -= amount;
        self.total_disbursed += amount;
        Ok(())
    }

    /// Whether the conservation equation holds.
    pub fn is_conserved(&self) -> bool {
        let outflow = self.balance.checked_add(self.total_disbursed);
        let inflow = self.total_fees.checked_add(self.total_slashed_in);
        outflow.is_some() && outflow == inflow
    }
}
