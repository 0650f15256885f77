//! The protocol aggregate.
//!
//! Each command either commits on every ledger it touches or on none.
//! Events from a committed command move into the outbox; events from a
//! rejected one are dropped.

use yieldgate_attestor::{
    AttestorLedger, AttestorStats, ClaimBook, RewardPool, SlashOutcome, SlashPolicy,
};
use yieldgate_registry::{ClaimRegistry, ClaimSubmission};
use yieldgate_types::{
    AccountId, Amount, Claim, ClaimId, ClaimStatus, LedgerEvent, ProtocolConstants,
};
use yieldgate_vault::{ClaimEscrow, Release, Vault};

use crate::payouts::{PayoutReason, Payouts};
use crate::{ProtocolError, Result};

/// The three ledgers plus the outbound payout layer.
#[derive(Debug)]
pub struct Protocol<P> {
    ledger: AttestorLedger,
    registry: ClaimRegistry,
    vault: Vault,
    payouts: P,
    outbox: Vec<LedgerEvent>,
}

impl<P: Payouts> Protocol<P> {
    /// Create a protocol with empty ledgers.
    pub fn new(authority: AccountId, slash_policy: SlashPolicy, payouts: P) -> Self {
        Self::from_parts(
            AttestorLedger::new(authority, slash_policy),
            ClaimRegistry::new(authority),
            Vault::new(),
            payouts,
        )
    }

    /// Reassemble a protocol from restored ledgers.
    pub fn from_parts(
        ledger: AttestorLedger,
        registry: ClaimRegistry,
        vault: Vault,
        payouts: P,
    ) -> Self {
        Self {
            ledger,
            registry,
            vault,
            payouts,
            outbox: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Attestor commands
    // ------------------------------------------------------------------

    /// Register `caller` as an attestor staking `stake`.
    ///
    /// # Errors
    ///
    /// See [`AttestorLedger::register`].
    pub fn register(&mut self, caller: AccountId, stake: Amount) -> Result<()> {
        let out = self.ledger.register(caller, stake).map_err(Into::into);
        self.settle_command("register", out)
    }

    /// Add stake to `caller`'s registration.
    ///
    /// # Errors
    ///
    /// See [`AttestorLedger::add_stake`].
    pub fn add_stake(&mut self, caller: AccountId, amount: Amount) -> Result<Amount> {
        let out = self.ledger.add_stake(caller, amount).map_err(Into::into);
        self.settle_command("add_stake", out)
    }

    /// Attest to a claim.
    ///
    /// # Errors
    ///
    /// See [`AttestorLedger::attest_to_claim`].
    pub fn attest_to_claim(&mut self, caller: AccountId, claim_id: ClaimId) -> Result<usize> {
        let out = self
            .ledger
            .attest_to_claim(&mut self.registry, caller, claim_id)
            .map_err(Into::into);
        self.settle_command("attest_to_claim", out)
    }

    /// Finalize a claim and credit its attestors. Permissionless.
    ///
    /// # Errors
    ///
    /// See [`AttestorLedger::finalize_and_reward`].
    pub fn finalize_and_reward(&mut self, claim_id: ClaimId) -> Result<Amount> {
        let out = self
            .ledger
            .finalize_and_reward(&mut self.registry, claim_id)
            .map_err(Into::into);
        self.settle_command("finalize_and_reward", out)
    }

    /// Pay out `caller`'s unclaimed rewards.
    ///
    /// # Errors
    ///
    /// - See [`AttestorLedger::claim_rewards`]
    /// - [`ProtocolError::PayoutFailed`] if the transfer fails; the rewards
    ///   stay claimable
    pub fn claim_rewards(&mut self, caller: AccountId) -> Result<Amount> {
        let out = match self.ledger.claim_rewards(caller) {
            Ok(amount) => match self.payouts.transfer(caller, amount, PayoutReason::Rewards) {
                Ok(()) => Ok(amount),
                Err(e) => self
                    .ledger
                    .revert_claim(caller, amount)
                    .map_err(ProtocolError::from)
                    .and_then(|()| Err(payout_failed(caller, amount, e.0))),
            },
            Err(e) => Err(e.into()),
        };
        self.settle_command("claim_rewards", out)
    }

    /// Slash an attestor's stake. Authority only.
    ///
    /// # Errors
    ///
    /// See [`AttestorLedger::slash`].
    pub fn slash(
        &mut self,
        caller: AccountId,
        target: AccountId,
        amount: Amount,
    ) -> Result<SlashOutcome> {
        let out = self.ledger.slash(caller, target, amount).map_err(Into::into);
        self.settle_command("slash", out)
    }

    /// Flag an open claim as disputed.
    ///
    /// # Errors
    ///
    /// See [`AttestorLedger::flag_claim`].
    pub fn flag_claim(&mut self, caller: AccountId, claim_id: ClaimId) -> Result<()> {
        let out = self
            .ledger
            .flag_claim(&mut self.registry, caller, claim_id)
            .map_err(Into::into);
        self.settle_command("flag_claim", out)
    }

    // ------------------------------------------------------------------
    // Claim commands
    // ------------------------------------------------------------------

    /// Submit a claim paying `paid`, which must equal the attestation fee.
    ///
    /// # Errors
    ///
    /// See [`ClaimRegistry::submit_claim`].
    pub fn submit_claim(
        &mut self,
        caller: AccountId,
        submission: ClaimSubmission,
        paid: Amount,
    ) -> Result<ClaimId> {
        let out = self
            .registry
            .submit_claim(&mut self.ledger, caller, submission, paid)
            .map_err(Into::into);
        self.settle_command("submit_claim", out)
    }

    /// Reject an open claim. Authority only.
    ///
    /// # Errors
    ///
    /// See [`ClaimRegistry::reject_claim`].
    pub fn reject_claim(&mut self, caller: AccountId, claim_id: ClaimId) -> Result<()> {
        let out = self
            .registry
            .reject_claim(caller, claim_id)
            .map_err(Into::into);
        self.settle_command("reject_claim", out)
    }

    // ------------------------------------------------------------------
    // Vault commands
    // ------------------------------------------------------------------

    /// Deposit capital.
    ///
    /// # Errors
    ///
    /// See [`Vault::deposit`].
    pub fn deposit(&mut self, caller: AccountId, amount: Amount) -> Result<Amount> {
        let out = self.vault.deposit(caller, amount).map_err(Into::into);
        self.settle_command("deposit", out)
    }

    /// Withdraw free capital.
    ///
    /// # Errors
    ///
    /// - See [`Vault::withdraw`]
    /// - [`ProtocolError::PayoutFailed`] if the transfer fails; the balance
    ///   is restored
    pub fn withdraw(&mut self, caller: AccountId, amount: Amount) -> Result<Amount> {
        let out = match self.vault.withdraw(caller, amount) {
            Ok(amount) => match self
                .payouts
                .transfer(caller, amount, PayoutReason::Withdrawal)
            {
                Ok(()) => Ok(amount),
                Err(e) => self
                    .vault
                    .revert_withdraw(caller, amount)
                    .map_err(ProtocolError::from)
                    .and_then(|()| Err(payout_failed(caller, amount, e.0))),
            },
            Err(e) => Err(e.into()),
        };
        self.settle_command("withdraw", out)
    }

    /// Commit free capital to a claim's escrow.
    ///
    /// # Errors
    ///
    /// See [`Vault::commit_to_claim`].
    pub fn commit_to_claim(
        &mut self,
        caller: AccountId,
        claim_id: ClaimId,
        amount: Amount,
    ) -> Result<Amount> {
        let out = self
            .vault
            .commit_to_claim(&self.registry, &self.ledger, caller, claim_id, amount)
            .map_err(Into::into);
        self.settle_command("commit_to_claim", out)
    }

    /// Refund `caller`'s commitment to a claim that can never unlock.
    ///
    /// # Errors
    ///
    /// See [`Vault::refund_commitment`].
    pub fn refund_commitment(&mut self, caller: AccountId, claim_id: ClaimId) -> Result<Amount> {
        let out = self
            .vault
            .refund_commitment(&self.registry, &self.ledger, caller, claim_id)
            .map_err(Into::into);
        self.settle_command("refund_commitment", out)
    }

    /// Release a verified claim's escrow to its issuer. Permissionless.
    ///
    /// # Errors
    ///
    /// - See [`Vault::unlock_yield`]
    /// - [`ProtocolError::PayoutFailed`] if the transfer fails; the escrow
    ///   stays locked
    pub fn unlock_yield(&mut self, claim_id: ClaimId) -> Result<Release> {
        let out = match self.vault.unlock_yield(&self.registry, &self.ledger, claim_id) {
            Ok(release) => match self.payouts.transfer(
                release.beneficiary,
                release.amount,
                PayoutReason::YieldRelease,
            ) {
                Ok(()) => Ok(release),
                Err(e) => self
                    .vault
                    .revert_unlock(&release)
                    .map_err(ProtocolError::from)
                    .and_then(|()| Err(payout_failed(release.beneficiary, release.amount, e.0))),
            },
            Err(e) => Err(e.into()),
        };
        self.settle_command("unlock_yield", out)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn total_claims(&self) -> u64 {
        self.registry.total_claims()
    }

    /// # Errors
    ///
    /// [`yieldgate_registry::RegistryError::UnknownClaim`] for ids out of range.
    pub fn claim(&self, claim_id: ClaimId) -> Result<&Claim> {
        Ok(self.registry.claim(claim_id)?)
    }

    pub fn claim_status(&self, claim_id: ClaimId) -> Option<ClaimStatus> {
        self.registry.claim_status(claim_id)
    }

    pub fn attestor_stats(&self, id: &AccountId) -> Option<AttestorStats> {
        self.ledger.attestor_stats(id)
    }

    pub fn has_attested(&self, claim_id: ClaimId, attestor: &AccountId) -> bool {
        self.ledger.has_attested(claim_id, attestor)
    }

    pub fn total_stake_per_claim(&self, claim_id: ClaimId) -> Amount {
        self.ledger.total_stake_per_claim(claim_id)
    }

    pub fn attestor_count_per_claim(&self, claim_id: ClaimId) -> usize {
        self.ledger.attestor_count_per_claim(claim_id)
    }

    pub fn rewards_earned(&self, id: &AccountId) -> Amount {
        self.ledger.rewards_earned(id)
    }

    pub fn total_claimed(&self, id: &AccountId) -> Amount {
        self.ledger.total_claimed(id)
    }

    pub fn can_unlock_yield(&self, claim_id: ClaimId) -> bool {
        self.vault
            .can_unlock_yield(&self.registry, &self.ledger, claim_id)
    }

    pub fn balance(&self, id: &AccountId) -> Amount {
        self.vault.balance(id)
    }

    pub fn total_deposits(&self) -> Amount {
        self.vault.total_deposits()
    }

    pub fn reward_pool(&self) -> &RewardPool {
        self.ledger.pool()
    }

    pub fn escrow(&self, claim_id: ClaimId) -> Option<&ClaimEscrow> {
        self.vault.escrow(claim_id)
    }

    pub fn protocol_constants(&self) -> ProtocolConstants {
        ProtocolConstants::current()
    }

    /// The attestor ledger.
    pub fn ledger(&self) -> &AttestorLedger {
        &self.ledger
    }

    /// The claim registry.
    pub fn registry(&self) -> &ClaimRegistry {
        &self.registry
    }

    /// The vault.
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// The payout layer.
    pub fn payouts(&self) -> &P {
        &self.payouts
    }

    /// Mutable access to the payout layer, for draining settled transfers.
    pub fn payouts_mut(&mut self) -> &mut P {
        &mut self.payouts
    }

    /// Take the events of every command committed since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Check every lifetime invariant across the three ledgers.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, wrapped in the failing ledger's
    /// error type.
    pub fn audit(&self) -> Result<()> {
        self.ledger.audit()?;
        self.vault.audit()?;

        let fees: u128 = (0..self.registry.total_claims())
            .filter_map(|id| self.registry.claim(id).ok())
            .map(|c| u128::from(c.fee_paid))
            .sum();
        if fees != u128::from(self.ledger.pool().total_fees()) {
            return Err(yieldgate_attestor::AttestorError::InvariantViolation(format!(
                "claim fees {fees} != pool fees {}",
                self.ledger.pool().total_fees()
            ))
            .into());
        }

        for id in 0..self.registry.total_claims() {
            let verified = self.claim_status(id) == Some(ClaimStatus::Verified);
            let finalized = self.ledger.record(id).is_some_and(|r| r.is_finalized());
            if verified != finalized {
                return Err(yieldgate_attestor::AttestorError::InvariantViolation(format!(
                    "claim {id}: verified {verified} but finalized {finalized}"
                ))
                .into());
            }
            if self.vault.is_unlocked(id) && !verified {
                return Err(yieldgate_vault::VaultError::InvariantViolation(format!(
                    "claim {id} unlocked without verification"
                ))
                .into());
            }
        }
        Ok(())
    }

    fn settle_command<T>(&mut self, command: &'static str, out: Result<T>) -> Result<T> {
        match out {
            Ok(value) => {
                let before = self.outbox.len();
                self.outbox.extend(self.ledger.drain_events());
                self.outbox.extend(self.registry.drain_events());
                self.outbox.extend(self.vault.drain_events());
                tracing::trace!(command, events = self.outbox.len() - before, "command committed");
                Ok(value)
            }
            Err(e) => {
                self.ledger.discard_events();
                self.registry.discard_events();
                self.vault.discard_events();
                tracing::debug!(command, error = %e, "command rejected");
                Err(e)
            }
        }
    }
}

fn payout_failed(recipient: AccountId, amount: Amount, reason: String) -> ProtocolError {
    tracing::warn!(recipient = %recipient, amount, reason = %reason, "payout failed");
    ProtocolError::PayoutFailed {
        recipient,
        amount,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use yieldgate_attestor::AttestorError;
    use yieldgate_registry::RegistryError;
    use yieldgate_types::constants::{ATTESTATION_FEE, REWARD_PER_ATTESTOR};
    use yieldgate_types::UNITS_PER_TOKEN;
    use yieldgate_vault::VaultError;

    use super::*;
    use crate::payouts::{PayoutError, PayoutJournal};

    const AUTHORITY: AccountId = AccountId::new([0xAA; 32]);
    const ISSUER: AccountId = AccountId::new([0x10; 32]);
    const INVESTOR: AccountId = AccountId::new([0x20; 32]);

    fn id(b: u8) -> AccountId {
        AccountId::new([b; 32])
    }

    /// Payout layer that fails while `down` is set.
    #[derive(Default)]
    struct FlakyPayouts {
        down: bool,
        paid: Vec<(AccountId, Amount)>,
    }

    impl Payouts for FlakyPayouts {
        fn transfer(
            &mut self,
            recipient: AccountId,
            amount: Amount,
            _reason: PayoutReason,
        ) -> std::result::Result<(), PayoutError> {
            if self.down {
                return Err(PayoutError("recipient unreachable".to_string()));
            }
            self.paid.push((recipient, amount));
            Ok(())
        }
    }

    fn submission() -> ClaimSubmission {
        ClaimSubmission {
            asset_id: "MMF-USD".to_string(),
            period: "2025-10".to_string(),
            yield_amount: 487,
            document_hash: "statement-oct".to_string(),
        }
    }

    fn with_attestors<P: Payouts>(payouts: P) -> Protocol<P> {
        let mut p = Protocol::new(AUTHORITY, SlashPolicy::RewardPool, payouts);
        for b in 1..=3 {
            p.register(id(b), 2 * UNITS_PER_TOKEN).expect("register");
        }
        p
    }

    fn verified_claim<P: Payouts>(p: &mut Protocol<P>) -> ClaimId {
        let claim_id = p
            .submit_claim(ISSUER, submission(), ATTESTATION_FEE)
            .expect("submit");
        for b in 1..=3 {
            p.attest_to_claim(id(b), claim_id).expect("attest");
        }
        p.finalize_and_reward(claim_id).expect("finalize");
        claim_id
    }

    #[test]
    fn test_full_lifecycle() {
        let mut p = with_attestors(PayoutJournal::new());
        p.deposit(INVESTOR, 5 * UNITS_PER_TOKEN).expect("deposit");
        let claim_id = p
            .submit_claim(ISSUER, submission(), ATTESTATION_FEE)
            .expect("submit");
        p.commit_to_claim(INVESTOR, claim_id, 2 * UNITS_PER_TOKEN)
            .expect("commit");
        for b in 1..=3 {
            p.attest_to_claim(id(b), claim_id).expect("attest");
        }
        assert!(!p.can_unlock_yield(claim_id));
        p.finalize_and_reward(claim_id).expect("finalize");
        assert!(p.can_unlock_yield(claim_id));

        let release = p.unlock_yield(claim_id).expect("unlock");
        assert_eq!(release.beneficiary, ISSUER);
        assert_eq!(release.amount, 2 * UNITS_PER_TOKEN);

        for b in 1..=3 {
            assert_eq!(p.claim_rewards(id(b)), Ok(REWARD_PER_ATTESTOR));
        }
        let paid: Amount = p.payouts().pending().iter().map(|x| x.amount).sum();
        assert_eq!(paid, 2 * UNITS_PER_TOKEN + ATTESTATION_FEE);
        p.audit().expect("audit");
    }

    #[test]
    fn test_events_only_for_committed_commands() {
        let mut p = with_attestors(PayoutJournal::new());
        p.drain_events();
        let _ = p.submit_claim(ISSUER, submission(), ATTESTATION_FEE - 1);
        assert!(p.drain_events().is_empty());

        verified_claim(&mut p);
        let names: Vec<&str> = p.drain_events().iter().map(LedgerEvent::name).collect();
        assert_eq!(names.first(), Some(&"ClaimSubmitted"));
        assert!(names.contains(&"ClaimFinalized"));
        assert_eq!(names.last(), Some(&"ClaimStatusChanged"));
    }

    #[test]
    fn test_failed_reward_payout_is_reverted() {
        let mut p = with_attestors(FlakyPayouts::default());
        verified_claim(&mut p);
        p.drain_events();

        p.payouts_mut().down = true;
        let err = p.claim_rewards(id(1)).expect_err("payout down");
        assert!(matches!(err, ProtocolError::PayoutFailed { .. }));
        assert_eq!(p.rewards_earned(&id(1)), REWARD_PER_ATTESTOR);
        assert_eq!(p.total_claimed(&id(1)), 0);
        assert!(p.drain_events().is_empty());
        p.audit().expect("audit");

        p.payouts_mut().down = false;
        assert_eq!(p.claim_rewards(id(1)), Ok(REWARD_PER_ATTESTOR));
        assert_eq!(p.payouts().paid, vec![(id(1), REWARD_PER_ATTESTOR)]);
    }

    #[test]
    fn test_failed_withdraw_restores_balance() {
        let mut p = with_attestors(FlakyPayouts {
            down: true,
            ..FlakyPayouts::default()
        });
        p.deposit(INVESTOR, 100).expect("deposit");
        assert!(matches!(
            p.withdraw(INVESTOR, 60),
            Err(ProtocolError::PayoutFailed { amount: 60, .. })
        ));
        assert_eq!(p.balance(&INVESTOR), 100);
        assert_eq!(p.vault().total_withdrawn(), 0);
        p.audit().expect("audit");
    }

    #[test]
    fn test_failed_release_keeps_escrow_locked() {
        let mut p = with_attestors(FlakyPayouts::default());
        p.deposit(INVESTOR, 100).expect("deposit");
        let claim_id = p
            .submit_claim(ISSUER, submission(), ATTESTATION_FEE)
            .expect("submit");
        p.commit_to_claim(INVESTOR, claim_id, 100).expect("commit");
        for b in 1..=3 {
            p.attest_to_claim(id(b), claim_id).expect("attest");
        }
        p.finalize_and_reward(claim_id).expect("finalize");

        p.payouts_mut().down = true;
        assert!(p.unlock_yield(claim_id).is_err());
        assert!(!p.vault().is_unlocked(claim_id));
        p.payouts_mut().down = false;
        assert_eq!(p.unlock_yield(claim_id).map(|r| r.amount), Ok(100));
        assert_eq!(
            p.unlock_yield(claim_id),
            Err(ProtocolError::Vault(VaultError::AlreadyUnlocked(claim_id)))
        );
        p.audit().expect("audit");
    }

    #[test]
    fn test_empty_release_rejected() {
        let mut p = with_attestors(FlakyPayouts::default());
        let claim_id = verified_claim(&mut p);
        p.drain_events();
        assert_eq!(
            p.unlock_yield(claim_id),
            Err(ProtocolError::Vault(VaultError::EmptyEscrow(claim_id)))
        );
        assert!(!p.vault().is_unlocked(claim_id));
        assert!(p.payouts().paid.is_empty());
        assert!(p.drain_events().is_empty());

        p.deposit(INVESTOR, 40).expect("deposit");
        p.commit_to_claim(INVESTOR, claim_id, 40).expect("commit");
        assert_eq!(p.unlock_yield(claim_id).map(|r| r.amount), Ok(40));
        p.audit().expect("audit");
    }

    #[test]
    fn test_underpaid_submission_creates_nothing() {
        let mut p = with_attestors(PayoutJournal::new());
        let err = p
            .submit_claim(ISSUER, submission(), ATTESTATION_FEE / 2)
            .expect_err("underpaid");
        assert!(matches!(
            err,
            ProtocolError::Registry(RegistryError::InsufficientFee { .. })
        ));
        assert_eq!(p.total_claims(), 0);
        assert_eq!(p.reward_pool().balance(), 0);
    }

    #[test]
    fn test_flag_then_refund() {
        let mut p = with_attestors(PayoutJournal::new());
        p.deposit(INVESTOR, 50).expect("deposit");
        let claim_id = p
            .submit_claim(ISSUER, submission(), ATTESTATION_FEE)
            .expect("submit");
        p.commit_to_claim(INVESTOR, claim_id, 50).expect("commit");
        p.flag_claim(id(2), claim_id).expect("flag");

        assert_eq!(
            p.attest_to_claim(id(1), claim_id),
            Err(ProtocolError::Attestor(AttestorError::UnknownClaim(claim_id)))
        );
        assert_eq!(p.refund_commitment(INVESTOR, claim_id), Ok(50));
        assert_eq!(p.balance(&INVESTOR), 50);
        assert!(!p.can_unlock_yield(claim_id));
        p.audit().expect("audit");
    }

    #[test]
    fn test_slash_then_pool_funds_rewards() {
        let mut p = with_attestors(PayoutJournal::new());
        p.slash(AUTHORITY, id(3), UNITS_PER_TOKEN).expect("slash");
        assert_eq!(p.reward_pool().balance(), UNITS_PER_TOKEN);
        verified_claim(&mut p);
        assert_eq!(p.reward_pool().balance(), UNITS_PER_TOKEN);
        p.audit().expect("audit");
    }

    #[test]
    fn test_constants_exposed() {
        let p = with_attestors(PayoutJournal::new());
        let c = p.protocol_constants();
        assert_eq!(c.min_quorum, 3);
        assert_eq!(c.attestation_fee, ATTESTATION_FEE);
    }
}
