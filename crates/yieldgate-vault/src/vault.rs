//! The vault aggregate.
//!
//! Withdrawals and unlocks follow the same discipline as reward claims:
//! the vault entry is final before the amount is handed to the payout
//! layer, and a failed payout is undone with the matching `revert_*` call.
//!
//! Capital conservation, checked by [`Vault::audit`]:
//!
//! ```text
//! sum(balances) + sum(escrow) + total_released == total_deposits - total_withdrawn
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use yieldgate_attestor::AttestorLedger;
use yieldgate_registry::ClaimRegistry;
use yieldgate_types::constants::MIN_TOTAL_STAKE;
use yieldgate_types::{AccountId, Amount, ClaimId, ClaimStatus, LedgerEvent};

use crate::escrow::ClaimEscrow;
use crate::{Result, VaultError};

/// Escrow released by an unlock, owed to the claim's issuer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub claim_id: ClaimId,
    pub beneficiary: AccountId,
    pub amount: Amount,
}

/// Investor balances and per-claim escrow.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vault {
    balances: BTreeMap<AccountId, Amount>,
    escrows: BTreeMap<ClaimId, ClaimEscrow>,
    total_deposits: Amount,
    total_withdrawn: Amount,
    total_released: Amount,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl Vault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `caller`'s free balance.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount` is zero
    /// - [`VaultError::Overflow`] on balance overflow
    pub fn deposit(&mut self, caller: AccountId, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let balance = self
            .balance(&caller)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        let total = self
            .total_deposits
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;

        self.balances.insert(caller, balance);
        self.total_deposits = total;

        tracing::info!(account = %caller, amount, balance, "deposit");
        self.events.push(LedgerEvent::Deposited {
            account: caller,
            amount,
        });
        Ok(balance)
    }

    /// Debit `caller`'s free balance and return the amount to pay out.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount` is zero
    /// - [`VaultError::InsufficientBalance`] if the balance is too small
    pub fn withdraw(&mut self, caller: AccountId, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let balance = self.balance(&caller);
        if amount > balance {
            return Err(VaultError::InsufficientBalance {
                balance,
                requested: amount,
            });
        }
        let withdrawn = self
            .total_withdrawn
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;

        self.balances.insert(caller, balance - amount);
        self.total_withdrawn = withdrawn;

        tracing::info!(account = %caller, amount, balance = balance - amount, "withdrawal");
        self.events.push(LedgerEvent::Withdrawn {
            account: caller,
            amount,
        });
        Ok(amount)
    }

    /// Undo a [`withdraw`](Self::withdraw) whose payout failed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvariantViolation`] if `amount` was never withdrawn
    pub fn revert_withdraw(&mut self, caller: AccountId, amount: Amount) -> Result<()> {
        let withdrawn = self.total_withdrawn.checked_sub(amount).ok_or_else(|| {
            VaultError::InvariantViolation(format!(
                "revert of {amount} exceeds withdrawn total {}",
                self.total_withdrawn
            ))
        })?;
        let balance = self
            .balance(&caller)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.balances.insert(caller, balance);
        self.total_withdrawn = withdrawn;
        tracing::warn!(account = %caller, amount, "withdrawal reverted");
        Ok(())
    }

    /// Move free capital into a claim's escrow.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAmount`] if `amount` is zero
    /// - [`VaultError::UnknownClaim`] if the claim does not exist
    /// - [`VaultError::AlreadyUnlocked`] if the escrow was already released
    /// - [`VaultError::ClaimNotActive`] if the claim's escrow can never be
    ///   released (see [`refund_commitment`](Self::refund_commitment))
    /// - [`VaultError::InsufficientBalance`] if the free balance is too small
    pub fn commit_to_claim(
        &mut self,
        registry: &ClaimRegistry,
        ledger: &AttestorLedger,
        caller: AccountId,
        claim_id: ClaimId,
        amount: Amount,
    ) -> Result<Amount> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let status = claim_status(registry, claim_id)?;
        if self.is_unlocked(claim_id) {
            return Err(VaultError::AlreadyUnlocked(claim_id));
        }
        if escrow_stranded(ledger, claim_id, status) {
            return Err(VaultError::ClaimNotActive { claim_id, status });
        }
        let balance = self.balance(&caller);
        if amount > balance {
            return Err(VaultError::InsufficientBalance {
                balance,
                requested: amount,
            });
        }

        let mut escrow = self.escrows.get(&claim_id).cloned().unwrap_or_default();
        escrow.commit(caller, amount)?;
        let committed = escrow.commitment(&caller);
        self.escrows.insert(claim_id, escrow);
        self.balances.insert(caller, balance - amount);

        tracing::info!(claim_id, investor = %caller, amount, committed, "capital committed");
        self.events.push(LedgerEvent::CapitalCommitted {
            claim_id,
            investor: caller,
            amount,
        });
        Ok(committed)
    }

    /// Return `caller`'s commitment to a claim whose escrow can never be
    /// released: flagged, rejected, or verified with less than
    /// [`MIN_TOTAL_STAKE`] attested.
    ///
    /// # Errors
    ///
    /// - [`VaultError::UnknownClaim`] if the claim does not exist
    /// - [`VaultError::ClaimNotActive`] while the claim can still unlock
    /// - [`VaultError::NothingToRefund`] if `caller` has no commitment
    /// - [`VaultError::InvariantViolation`] if the escrow does not cover the
    ///   commitment
    pub fn refund_commitment(
        &mut self,
        registry: &ClaimRegistry,
        ledger: &AttestorLedger,
        caller: AccountId,
        claim_id: ClaimId,
    ) -> Result<Amount> {
        let status = claim_status(registry, claim_id)?;
        if !escrow_stranded(ledger, claim_id, status) {
            return Err(VaultError::ClaimNotActive { claim_id, status });
        }
        let committed = self
            .escrows
            .get(&claim_id)
            .map_or(0, |e| e.commitment(&caller));
        if committed == 0 {
            return Err(VaultError::NothingToRefund(claim_id));
        }
        let balance = self
            .balance(&caller)
            .checked_add(committed)
            .ok_or(VaultError::Overflow)?;

        if let Some(escrow) = self.escrows.get_mut(&claim_id) {
            escrow.take_commitment(&caller)?;
        }
        self.balances.insert(caller, balance);

        tracing::info!(claim_id, investor = %caller, amount = committed, "commitment refunded");
        self.events.push(LedgerEvent::CommitmentRefunded {
            claim_id,
            investor: caller,
            amount: committed,
        });
        Ok(committed)
    }

    /// The unlock gate: the claim is `Verified` and its attested stake is at
    /// least [`MIN_TOTAL_STAKE`].
    pub fn can_unlock_yield(
        &self,
        registry: &ClaimRegistry,
        ledger: &AttestorLedger,
        claim_id: ClaimId,
    ) -> bool {
        let verified = registry
            .claim(claim_id)
            .is_ok_and(|c| c.status == ClaimStatus::Verified);
        verified && ledger.total_stake_per_claim(claim_id) >= MIN_TOTAL_STAKE
    }

    /// Release a claim's escrow to its issuer. Permissionless; happens once.
    ///
    /// An empty escrow is left untouched, so the claim stays open to
    /// commitments.
    ///
    /// # Errors
    ///
    /// - [`VaultError::UnknownClaim`] if the claim does not exist
    /// - [`VaultError::CannotUnlock`] if the gate is closed
    /// - [`VaultError::AlreadyUnlocked`] on a second unlock
    /// - [`VaultError::EmptyEscrow`] if nothing is committed
    pub fn unlock_yield(
        &mut self,
        registry: &ClaimRegistry,
        ledger: &AttestorLedger,
        claim_id: ClaimId,
    ) -> Result<Release> {
        let beneficiary = registry
            .claim(claim_id)
            .map_err(|_| VaultError::UnknownClaim(claim_id))?
            .issuer;
        if !self.can_unlock_yield(registry, ledger, claim_id) {
            return Err(VaultError::CannotUnlock(claim_id));
        }
        if self.is_unlocked(claim_id) {
            return Err(VaultError::AlreadyUnlocked(claim_id));
        }
        let pending = self.escrows.get(&claim_id).map_or(0, ClaimEscrow::balance);
        if pending == 0 {
            return Err(VaultError::EmptyEscrow(claim_id));
        }
        let released = self
            .total_released
            .checked_add(pending)
            .ok_or(VaultError::Overflow)?;

        let amount = self.escrows.entry(claim_id).or_default().release();
        self.total_released = released;

        tracing::info!(claim_id, beneficiary = %beneficiary, amount, "yield unlocked");
        self.events.push(LedgerEvent::YieldUnlocked {
            claim_id,
            beneficiary,
            amount,
        });
        Ok(Release {
            claim_id,
            beneficiary,
            amount,
        })
    }

    /// Undo an [`unlock_yield`](Self::unlock_yield) whose payout failed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvariantViolation`] if the release does not match
    pub fn revert_unlock(&mut self, release: &Release) -> Result<()> {
        let escrow = self
            .escrows
            .get_mut(&release.claim_id)
            .filter(|e| e.is_unlocked() && e.released() == release.amount)
            .ok_or_else(|| {
                VaultError::InvariantViolation(format!(
                    "no release of {} for claim {}",
                    release.amount, release.claim_id
                ))
            })?;
        let released = self
            .total_released
            .checked_sub(release.amount)
            .ok_or_else(|| VaultError::InvariantViolation("released total underflow".into()))?;
        escrow.restore(release.amount);
        self.total_released = released;
        tracing::warn!(claim_id = release.claim_id, amount = release.amount, "unlock reverted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Free balance (zero for unknown accounts).
    pub fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Lifetime deposits.
    pub fn total_deposits(&self) -> Amount {
        self.total_deposits
    }

    /// Lifetime withdrawals.
    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }

    /// Lifetime escrow released to issuers.
    pub fn total_released(&self) -> Amount {
        self.total_released
    }

    /// Escrow for a claim, if any capital was ever committed or released.
    pub fn escrow(&self, claim_id: ClaimId) -> Option<&ClaimEscrow> {
        self.escrows.get(&claim_id)
    }

    /// Whether a claim's escrow has been released.
    pub fn is_unlocked(&self, claim_id: ClaimId) -> bool {
        self.escrows
            .get(&claim_id)
            .is_some_and(ClaimEscrow::is_unlocked)
    }

    /// Number of accounts that ever deposited.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop events from a command that is being rolled back.
    pub fn discard_events(&mut self) {
        self.events.clear();
    }

    /// Check capital conservation and escrow consistency.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvariantViolation`] naming the first failure
    pub fn audit(&self) -> Result<()> {
        let free: u128 = self.balances.values().map(|a| u128::from(*a)).sum();
        let mut escrowed: u128 = 0;
        let mut released: u128 = 0;
        for (claim_id, escrow) in &self.escrows {
            if !escrow.reconciles() {
                return Err(VaultError::InvariantViolation(format!(
                    "escrow {claim_id}: balance does not match commitments"
                )));
            }
            escrowed += u128::from(escrow.balance());
            released += u128::from(escrow.released());
        }
        if released != u128::from(self.total_released) {
            return Err(VaultError::InvariantViolation(format!(
                "escrow releases {released} != total released {}",
                self.total_released
            )));
        }
        let held = free + escrowed + released;
        let net = i128::from(self.total_deposits) - i128::from(self.total_withdrawn);
        if i128::try_from(held).ok() != Some(net) {
            return Err(VaultError::InvariantViolation(format!(
                "held {held} != deposits {} - withdrawn {}",
                self.total_deposits, self.total_withdrawn
            )));
        }
        Ok(())
    }
}

fn claim_status(registry: &ClaimRegistry, claim_id: ClaimId) -> Result<ClaimStatus> {
    registry
        .claim(claim_id)
        .map(|c| c.status)
        .map_err(|_| VaultError::UnknownClaim(claim_id))
}

/// A claim in a final state whose escrow can never reach the issuer.
fn escrow_stranded(ledger: &AttestorLedger, claim_id: ClaimId, status: ClaimStatus) -> bool {
    match status {
        ClaimStatus::Flagged | ClaimStatus::Rejected => true,
        ClaimStatus::Verified => ledger.total_stake_per_claim(claim_id) < MIN_TOTAL_STAKE,
        ClaimStatus::Submitted | ClaimStatus::Attesting => false,
    }
}

#[cfg(test)]
mod tests {
    use yieldgate_attestor::SlashPolicy;
    use yieldgate_registry::ClaimSubmission;
    use yieldgate_types::constants::ATTESTATION_FEE;
    use yieldgate_types::UNITS_PER_TOKEN;

    use super::*;

    const AUTHORITY: AccountId = AccountId::new([0xAA; 32]);
    const ISSUER: AccountId = AccountId::new([0x10; 32]);
    const INVESTOR: AccountId = AccountId::new([0x20; 32]);

    fn id(b: u8) -> AccountId {
        AccountId::new([b; 32])
    }

    struct World {
        ledger: AttestorLedger,
        registry: ClaimRegistry,
        vault: Vault,
    }

    impl World {
        fn new(stake: Amount) -> Self {
            let mut ledger = AttestorLedger::new(AUTHORITY, SlashPolicy::RewardPool);
            for b in 1..=3 {
                ledger.register(id(b), stake).expect("register");
            }
            Self {
                ledger,
                registry: ClaimRegistry::new(AUTHORITY),
                vault: Vault::new(),
            }
        }

        fn submit(&mut self) -> ClaimId {
            let submission = ClaimSubmission {
                asset_id: "RWA-1".to_string(),
                period: "2025-Q3".to_string(),
                yield_amount: 525,
                document_hash: "doc".to_string(),
            };
            self.registry
                .submit_claim(&mut self.ledger, ISSUER, submission, ATTESTATION_FEE)
                .expect("submit")
        }

        fn verify(&mut self, claim_id: ClaimId) {
            for b in 1..=3 {
                self.ledger
                    .attest_to_claim(&mut self.registry, id(b), claim_id)
                    .expect("attest");
            }
            self.ledger
                .finalize_and_reward(&mut self.registry, claim_id)
                .expect("finalize");
        }
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let mut vault = Vault::new();
        assert_eq!(vault.deposit(INVESTOR, 0), Err(VaultError::ZeroAmount));
        assert_eq!(vault.deposit(INVESTOR, 100), Ok(100));
        assert_eq!(vault.deposit(INVESTOR, 50), Ok(150));
        assert_eq!(vault.total_deposits(), 150);

        assert_eq!(
            vault.withdraw(INVESTOR, 151),
            Err(VaultError::InsufficientBalance {
                balance: 150,
                requested: 151
            })
        );
        assert_eq!(vault.withdraw(INVESTOR, 150), Ok(150));
        assert_eq!(vault.balance(&INVESTOR), 0);
        assert_eq!(vault.account_count(), 1);
        vault.audit().expect("audit");
    }

    #[test]
    fn test_revert_withdraw() {
        let mut vault = Vault::new();
        vault.deposit(INVESTOR, 80).expect("deposit");
        let amount = vault.withdraw(INVESTOR, 30).expect("withdraw");
        vault.revert_withdraw(INVESTOR, amount).expect("revert");
        assert_eq!(vault.balance(&INVESTOR), 80);
        assert_eq!(vault.total_withdrawn(), 0);
        vault.audit().expect("audit");
    }

    #[test]
    fn test_gate_requires_verified_status() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        for b in 1..=3 {
            w.ledger
                .attest_to_claim(&mut w.registry, id(b), claim_id)
                .expect("attest");
        }
        assert!(!w.vault.can_unlock_yield(&w.registry, &w.ledger, claim_id));
        assert_eq!(
            w.vault.unlock_yield(&w.registry, &w.ledger, claim_id),
            Err(VaultError::CannotUnlock(claim_id))
        );
        w.ledger
            .finalize_and_reward(&mut w.registry, claim_id)
            .expect("finalize");
        assert!(w.vault.can_unlock_yield(&w.registry, &w.ledger, claim_id));
    }

    #[test]
    fn test_gate_requires_minimum_stake() {
        let mut w = World::new(UNITS_PER_TOKEN / 2);
        let claim_id = w.submit();
        w.verify(claim_id);
        assert_eq!(
            w.registry.claim(claim_id).map(|c| c.status),
            Ok(ClaimStatus::Verified)
        );
        assert!(!w.vault.can_unlock_yield(&w.registry, &w.ledger, claim_id));
    }

    #[test]
    fn test_unlock_releases_escrow_once() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        w.vault.deposit(INVESTOR, 1_000).expect("deposit");
        w.vault
            .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 600)
            .expect("commit");
        w.verify(claim_id);

        let release = w
            .vault
            .unlock_yield(&w.registry, &w.ledger, claim_id)
            .expect("unlock");
        assert_eq!(release.beneficiary, ISSUER);
        assert_eq!(release.amount, 600);
        assert_eq!(
            w.vault.unlock_yield(&w.registry, &w.ledger, claim_id),
            Err(VaultError::AlreadyUnlocked(claim_id))
        );
        assert_eq!(w.vault.balance(&INVESTOR), 400);
        assert_eq!(w.vault.total_released(), 600);
        w.vault.audit().expect("audit");
    }

    #[test]
    fn test_unlock_empty_escrow_leaves_claim_open() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        w.verify(claim_id);
        assert_eq!(
            w.vault.unlock_yield(&w.registry, &w.ledger, claim_id),
            Err(VaultError::EmptyEscrow(claim_id))
        );
        assert!(!w.vault.is_unlocked(claim_id));
        assert!(w.vault.drain_events().is_empty());

        w.vault.deposit(INVESTOR, 10).expect("deposit");
        w.vault
            .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 10)
            .expect("commit after empty unlock");
        let release = w
            .vault
            .unlock_yield(&w.registry, &w.ledger, claim_id)
            .expect("unlock");
        assert_eq!(release.amount, 10);
        w.vault.audit().expect("audit");
    }

    #[test]
    fn test_revert_unlock() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        w.vault.deposit(INVESTOR, 90).expect("deposit");
        w.vault
            .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 90)
            .expect("commit");
        w.verify(claim_id);
        let release = w
            .vault
            .unlock_yield(&w.registry, &w.ledger, claim_id)
            .expect("unlock");
        w.vault.revert_unlock(&release).expect("revert");
        assert!(!w.vault.is_unlocked(claim_id));
        assert_eq!(w.vault.escrow(claim_id).map(ClaimEscrow::balance), Some(90));
        w.vault.audit().expect("audit");
        w.vault
            .unlock_yield(&w.registry, &w.ledger, claim_id)
            .expect("unlock again");
    }

    #[test]
    fn test_commit_after_unlock_rejected() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        w.vault.deposit(INVESTOR, 20).expect("deposit");
        w.vault
            .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 10)
            .expect("commit");
        w.verify(claim_id);
        w.vault
            .unlock_yield(&w.registry, &w.ledger, claim_id)
            .expect("unlock");
        assert_eq!(
            w.vault
                .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 10),
            Err(VaultError::AlreadyUnlocked(claim_id))
        );
        assert_eq!(w.vault.balance(&INVESTOR), 10);
    }

    #[test]
    fn test_commit_validation() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        w.vault.deposit(INVESTOR, 10).expect("deposit");
        assert_eq!(
            w.vault.commit_to_claim(&w.registry, &w.ledger, INVESTOR, 42, 5),
            Err(VaultError::UnknownClaim(42))
        );
        assert_eq!(
            w.vault.commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 11),
            Err(VaultError::InsufficientBalance {
                balance: 10,
                requested: 11
            })
        );
        assert_eq!(
            w.vault.commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 0),
            Err(VaultError::ZeroAmount)
        );
        assert!(w.vault.escrow(claim_id).is_none());
    }

    #[test]
    fn test_refund_after_rejection() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        w.vault.deposit(INVESTOR, 500).expect("deposit");
        w.vault
            .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 300)
            .expect("commit");
        assert!(matches!(
            w.vault.refund_commitment(&w.registry, &w.ledger, INVESTOR, claim_id),
            Err(VaultError::ClaimNotActive { .. })
        ));

        w.registry.reject_claim(AUTHORITY, claim_id).expect("reject");
        assert_eq!(
            w.vault.refund_commitment(&w.registry, &w.ledger, INVESTOR, claim_id),
            Ok(300)
        );
        assert_eq!(w.vault.balance(&INVESTOR), 500);
        assert_eq!(
            w.vault.refund_commitment(&w.registry, &w.ledger, INVESTOR, claim_id),
            Err(VaultError::NothingToRefund(claim_id))
        );
        assert!(matches!(
            w.vault.commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 1),
            Err(VaultError::ClaimNotActive { .. })
        ));
        w.vault.audit().expect("audit");
    }

    #[test]
    fn test_refund_when_verified_below_minimum_stake() {
        let mut w = World::new(UNITS_PER_TOKEN / 2);
        let claim_id = w.submit();
        w.vault.deposit(INVESTOR, 1_500).expect("deposit");
        w.vault
            .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 1_000)
            .expect("commit");
        w.verify(claim_id);

        assert_eq!(
            w.vault.unlock_yield(&w.registry, &w.ledger, claim_id),
            Err(VaultError::CannotUnlock(claim_id))
        );
        assert_eq!(
            w.vault
                .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 500),
            Err(VaultError::ClaimNotActive {
                claim_id,
                status: ClaimStatus::Verified
            })
        );
        assert_eq!(
            w.vault.refund_commitment(&w.registry, &w.ledger, INVESTOR, claim_id),
            Ok(1_000)
        );
        assert_eq!(w.vault.balance(&INVESTOR), 1_500);
        assert_eq!(w.vault.escrow(claim_id).map(ClaimEscrow::balance), Some(0));
        w.vault.audit().expect("audit");
    }

    #[test]
    fn test_no_refund_when_gate_open() {
        let mut w = World::new(2 * UNITS_PER_TOKEN);
        let claim_id = w.submit();
        w.vault.deposit(INVESTOR, 100).expect("deposit");
        w.vault
            .commit_to_claim(&w.registry, &w.ledger, INVESTOR, claim_id, 100)
            .expect("commit");
        w.verify(claim_id);
        assert_eq!(
            w.vault.refund_commitment(&w.registry, &w.ledger, INVESTOR, claim_id),
            Err(VaultError::ClaimNotActive {
                claim_id,
                status: ClaimStatus::Verified
            })
        );
    }
}
