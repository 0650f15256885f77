//! Per-claim escrow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use yieldgate_types::{AccountId, Amount};

use crate::{Result, VaultError};

/// Capital committed to one claim.
///
/// `balance` is the sum of `commitments` until the escrow is unlocked, after
/// which the balance is zero and `released` records what went to the issuer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEscrow {
    balance: Amount,
    commitments: BTreeMap<AccountId, Amount>,
    released: Amount,
    unlocked: bool,
}

impl ClaimEscrow {
    /// Capital currently held for the claim.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Amount released to the issuer on unlock.
    pub fn released(&self) -> Amount {
        self.released
    }

    /// Whether the escrow has been unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// An investor's outstanding commitment.
    pub fn commitment(&self, investor: &AccountId) -> Amount {
        self.commitments.get(investor).copied().unwrap_or(0)
    }

    /// Number of investors with an outstanding commitment.
    pub fn investor_count(&self) -> usize {
        self.commitments.len()
    }

    pub(crate) fn commit(&mut self, investor: AccountId, amount: Amount) -> Result<()> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        let committed = self
            .commitment(&investor)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.balance = balance;
        self.commitments.insert(investor, committed);
        Ok(())
    }

    /// Remove and return an investor's whole commitment.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvariantViolation`] if the balance does not cover it;
    ///   the escrow is left unchanged
    pub(crate) fn take_commitment(&mut self, investor: &AccountId) -> Result<Amount> {
        let amount = self.commitment(investor);
        let balance = self.balance.checked_sub(amount).ok_or_else(|| {
            VaultError::InvariantViolation(format!(
                "escrow balance {} below commitment {amount}",
                self.balance
            ))
        })?;
        self.commitments.remove(investor);
        self.balance = balance;
        Ok(amount)
    }

    /// Release the whole balance. Commitments are settled.
    pub(crate) fn release(&mut self) -> Amount {
        let amount = self.balance;
        self.balance = 0;
        self.released = amount;
        self.unlocked = true;
        amount
    }

    /// Put back a release whose payout failed.
    pub(crate) fn restore(&mut self, amount: Amount) {
        self.balance = amount;
        self.released = 0;
        self.unlocked = false;
    }

    /// Whether the balance matches the outstanding commitments.
    pub(crate) fn reconciles(&self) -> bool {
        if self.unlocked {
            return self.balance == 0;
        }
        let committed: u128 = self.commitments.values().map(|a| u128::from(*a)).sum();
        committed == u128::from(self.balance)
    }
}
