//! The attestor ledger aggregate.
//!
//! Every command checks all of its preconditions before touching state, so
//! a returned error always means nothing changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use yieldgate_types::constants::{MIN_QUORUM, REWARD_PER_ATTESTOR};
use yieldgate_types::{AccountId, Amount, ClaimId, ClaimStatus, LedgerEvent};

use crate::attestor::{Attestor, AttestorStats};
use crate::pool::RewardPool;
use crate::record::AttestationRecord;
use crate::{AttestorError, ClaimBook, Result};

/// Where slashed stake goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashPolicy {
    /// Credit the reward pool.
    #[default]
    RewardPool,
    /// Remove from circulation.
    Burn,
}

/// Result of a successful slash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlashOutcome {
    pub slashed: Amount,
    pub remaining_stake: Amount,
    pub policy: SlashPolicy,
}

/// Attestor registry, attestation records and reward pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttestorLedger {
    authority: AccountId,
    slash_policy: SlashPolicy,
    attestors: BTreeMap<AccountId, Attestor>,
    records: BTreeMap<ClaimId, AttestationRecord>,
    pool: RewardPool,
    next_registration_seq: u64,
    total_staked_in: Amount,
    total_slashed: Amount,
    total_burned: Amount,
    #[serde(skip)]
    events: Vec<LedgerEvent>,
}

impl AttestorLedger {
    /// Create an empty ledger.
    ///
    /// `authority` is the only identity allowed to slash.
    pub fn new(authority: AccountId, slash_policy: SlashPolicy) -> Self {
        Self {
            authority,
            slash_policy,
            attestors: BTreeMap::new(),
            records: BTreeMap::new(),
            pool: RewardPool::new(),
            next_registration_seq: 0,
            total_staked_in: 0,
            total_slashed: 0,
            total_burned: 0,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Register `caller` as an attestor with an initial stake.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::AlreadyRegistered`] if `caller` already registered
    /// - [`AttestorError::ZeroStake`] if `stake` is zero
    pub fn register(&mut self, caller: AccountId, stake: Amount) -> Result<()> {
        if self.attestors.contains_key(&caller) {
            return Err(AttestorError::AlreadyRegistered);
        }
        if stake == 0 {
            return Err(AttestorError::ZeroStake);
        }
        let staked_in = self
            .total_staked_in
            .checked_add(stake)
            .ok_or(AttestorError::Overflow)?;

        let seq = self.next_registration_seq;
        self.attestors.insert(caller, Attestor::new(stake, seq));
        self.next_registration_seq += 1;
        self.total_staked_in = staked_in;

        tracing::info!(attestor = %caller, stake, "attestor registered");
        self.events.push(LedgerEvent::AttestorRegistered {
            attestor: caller,
            stake,
        });
        Ok(())
    }

    /// Add stake to an existing registration.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::NotRegistered`] if `caller` never registered
    /// - [`AttestorError::ZeroAmount`] if `amount` is zero
    pub fn add_stake(&mut self, caller: AccountId, amount: Amount) -> Result<Amount> {
        let attestor = self
            .attestors
            .get(&caller)
            .ok_or(AttestorError::NotRegistered)?;
        if amount == 0 {
            return Err(AttestorError::ZeroAmount);
        }
        let stake = attestor
            .stake
            .checked_add(amount)
            .ok_or(AttestorError::Overflow)?;
        let staked_in = self
            .total_staked_in
            .checked_add(amount)
            .ok_or(AttestorError::Overflow)?;

        if let Some(attestor) = self.attestors.get_mut(&caller) {
            attestor.stake = stake;
        }
        self.total_staked_in = staked_in;

        tracing::info!(attestor = %caller, amount, total = stake, "stake added");
        self.events.push(LedgerEvent::StakeAdded {
            attestor: caller,
            amount,
            total: stake,
        });
        Ok(stake)
    }

    /// Record `caller`'s attestation to a claim.
    ///
    /// The attestation reaching [`MIN_QUORUM`] moves the claim from
    /// `Submitted` to `Attesting`. Payout still requires
    /// [`finalize_and_reward`](Self::finalize_and_reward).
    ///
    /// # Errors
    ///
    /// - [`AttestorError::NotRegistered`] if `caller` has no active stake
    /// - [`AttestorError::UnknownClaim`] if the claim is missing or terminal
    /// - [`AttestorError::AlreadyAttested`] if `caller` already attested
    /// - [`AttestorError::QuorumFull`] if the quorum is already complete
    pub fn attest_to_claim(
        &mut self,
        book: &mut impl ClaimBook,
        caller: AccountId,
        claim_id: ClaimId,
    ) -> Result<usize> {
        let attestor = self
            .attestors
            .get(&caller)
            .filter(|a| a.is_active())
            .ok_or(AttestorError::NotRegistered)?;
        let stake = attestor.stake;

        let status = book
            .claim_status(claim_id)
            .filter(|s| !s.is_terminal())
            .ok_or(AttestorError::UnknownClaim(claim_id))?;

        let record = self.records.get(&claim_id);
        if record.is_some_and(|r| r.contains(&caller)) {
            return Err(AttestorError::AlreadyAttested(claim_id));
        }
        let count = record.map_or(0, AttestationRecord::count);
        if count >= MIN_QUORUM {
            return Err(AttestorError::QuorumFull(claim_id));
        }
        let current_total = record.map_or(0, AttestationRecord::total_stake);
        if current_total.checked_add(stake).is_none() {
            return Err(AttestorError::Overflow);
        }

        let new_count = count + 1;
        let reaches_quorum = new_count == MIN_QUORUM && status == ClaimStatus::Submitted;
        if reaches_quorum {
            book.advance(claim_id, ClaimStatus::Attesting)?;
        }

        let record = self.records.entry(claim_id).or_default();
        record.insert(caller, stake);
        if let Some(attestor) = self.attestors.get_mut(&caller) {
            attestor.total_attestations += 1;
        }

        tracing::info!(
            claim_id,
            attestor = %caller,
            stake,
            attestor_count = new_count,
            "claim attested"
        );
        self.events.push(LedgerEvent::ClaimAttested {
            claim_id,
            attestor: caller,
            stake,
            attestor_count: new_count,
        });
        if reaches_quorum {
            tracing::info!(claim_id, "quorum reached");
            self.events.push(LedgerEvent::ClaimStatusChanged {
                claim_id,
                from: ClaimStatus::Submitted,
                to: ClaimStatus::Attesting,
            });
        }
        Ok(new_count)
    }

    /// Check quorum, credit every attestor and mark the claim `Verified`.
    ///
    /// Callable by anyone. The whole distribution is checked against the
    /// pool before any attestor is credited.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::UnknownClaim`] if the claim does not exist
    /// - [`AttestorError::AlreadyFinalized`] if rewards were already paid
    /// - [`AttestorError::ClaimNotActive`] if the claim was flagged or rejected
    /// - [`AttestorError::QuorumNotMet`] if fewer than [`MIN_QUORUM`] attested
    /// - [`AttestorError::InsufficientPool`] if the pool cannot cover the payout
    pub fn finalize_and_reward(
        &mut self,
        book: &mut impl ClaimBook,
        claim_id: ClaimId,
    ) -> Result<Amount> {
        let status = book
            .claim_status(claim_id)
            .ok_or(AttestorError::UnknownClaim(claim_id))?;
        let record = self.records.get(&claim_id);
        if record.is_some_and(AttestationRecord::is_finalized) {
            return Err(AttestorError::AlreadyFinalized(claim_id));
        }
        if matches!(status, ClaimStatus::Flagged | ClaimStatus::Rejected) {
            return Err(AttestorError::ClaimNotActive { claim_id, status });
        }
        let count = record.map_or(0, AttestationRecord::count);
        if count < MIN_QUORUM {
            return Err(AttestorError::QuorumNotMet {
                required: MIN_QUORUM,
                actual: count,
            });
        }
        let Some(record) = record else {
            return Err(AttestorError::QuorumNotMet {
                required: MIN_QUORUM,
                actual: 0,
            });
        };

        let total = REWARD_PER_ATTESTOR
            .checked_mul(count as Amount)
            .ok_or(AttestorError::Overflow)?;
        self.pool.ensure_covers(total)?;

        // Pre-compute every credit so a late overflow cannot leave a
        // partial distribution behind.
        let mut credits = Vec::with_capacity(count);
        for id in record.attestors() {
            let attestor = self
                .attestors
                .get(id)
                .ok_or_else(|| AttestorError::InvariantViolation(format!("missing attestor {id}")))?;
            let earned = attestor
                .rewards_earned
                .checked_add(REWARD_PER_ATTESTOR)
                .ok_or(AttestorError::Overflow)?;
            let rewarded = attestor
                .total_rewarded
                .checked_add(REWARD_PER_ATTESTOR)
                .ok_or(AttestorError::Overflow)?;
            credits.push((*id, earned, rewarded));
        }

        let from = book.advance(claim_id, ClaimStatus::Verified)?;

        self.pool.debit(total)?;
        for (id, earned, rewarded) in credits {
            if let Some(attestor) = self.attestors.get_mut(&id) {
                attestor.rewards_earned = earned;
                attestor.total_rewarded = rewarded;
                attestor.successful_attestations += 1;
            }
        }
        if let Some(record) = self.records.get_mut(&claim_id) {
            record.mark_finalized();
        }

        tracing::info!(
            claim_id,
            attestor_count = count,
            disbursed = total,
            pool_balance = self.pool.balance(),
            "claim finalized"
        );
        self.events.push(LedgerEvent::ClaimFinalized {
            claim_id,
            reward_per_attestor: REWARD_PER_ATTESTOR,
            attestor_count: count,
        });
        self.events.push(LedgerEvent::ClaimStatusChanged {
            claim_id,
            from,
            to: ClaimStatus::Verified,
        });
        Ok(total)
    }

    /// Move the caller's full unclaimed balance to `total_claimed`.
    ///
    /// Returns the amount the caller must now be paid. The ledger entry is
    /// final before the amount is handed out, so a repeated call sees a
    /// zero balance.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::NothingToClaim`] if there is nothing to claim
    pub fn claim_rewards(&mut self, caller: AccountId) -> Result<Amount> {
        let attestor = self
            .attestors
            .get_mut(&caller)
            .filter(|a| a.rewards_earned > 0)
            .ok_or(AttestorError::NothingToClaim)?;
        let amount = attestor.rewards_earned;
        let claimed = attestor
            .total_claimed
            .checked_add(amount)
            .ok_or(AttestorError::Overflow)?;

        attestor.rewards_earned = 0;
        attestor.total_claimed = claimed;

        tracing::info!(attestor = %caller, amount, total_claimed = claimed, "rewards claimed");
        self.events.push(LedgerEvent::RewardsClaimed {
            attestor: caller,
            amount,
        });
        Ok(amount)
    }

    /// Undo a [`claim_rewards`](Self::claim_rewards) whose payout failed.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::InvariantViolation`] if the claimed total is
    ///   smaller than `amount`
    pub fn revert_claim(&mut self, caller: AccountId, amount: Amount) -> Result<()> {
        let attestor = self
            .attestors
            .get_mut(&caller)
            .ok_or(AttestorError::NotRegistered)?;
        let claimed = attestor.total_claimed.checked_sub(amount).ok_or_else(|| {
            AttestorError::InvariantViolation(format!(
                "revert of {amount} exceeds claimed total {}",
                attestor.total_claimed
            ))
        })?;
        let earned = attestor
            .rewards_earned
            .checked_add(amount)
            .ok_or(AttestorError::Overflow)?;
        attestor.total_claimed = claimed;
        attestor.rewards_earned = earned;
        tracing::warn!(attestor = %caller, amount, "reward claim reverted");
        Ok(())
    }

    /// Reduce an attestor's stake. Only the authority may slash.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::Unauthorized`] if `caller` is not the authority
    /// - [`AttestorError::ZeroAmount`] if `amount` is zero
    /// - [`AttestorError::NotRegistered`] if `target` never registered
    /// - [`AttestorError::InsufficientStake`] if `amount` exceeds the stake
    pub fn slash(
        &mut self,
        caller: AccountId,
        target: AccountId,
        amount: Amount,
    ) -> Result<SlashOutcome> {
        if caller != self.authority {
            return Err(AttestorError::Unauthorized);
        }
        if amount == 0 {
            return Err(AttestorError::ZeroAmount);
        }
        let attestor = self
            .attestors
            .get(&target)
            .ok_or(AttestorError::NotRegistered)?;
        if amount > attestor.stake {
            return Err(AttestorError::InsufficientStake {
                stake: attestor.stake,
                requested: amount,
            });
        }
        let remaining = attestor.stake - amount;
        let total_slashed = self
            .total_slashed
            .checked_add(amount)
            .ok_or(AttestorError::Overflow)?;

        match self.slash_policy {
            SlashPolicy::RewardPool => self.pool.credit_slash(amount)?,
            SlashPolicy::Burn => {
                self.total_burned = self
                    .total_burned
                    .checked_add(amount)
                    .ok_or(AttestorError::Overflow)?;
            }
        }
        if let Some(attestor) = self.attestors.get_mut(&target) {
            attestor.stake = remaining;
        }
        self.total_slashed = total_slashed;

        tracing::warn!(
            attestor = %target,
            amount,
            remaining,
            policy = ?self.slash_policy,
            "attestor slashed"
        );
        self.events.push(LedgerEvent::AttestorSlashed {
            attestor: target,
            amount,
            remaining,
        });
        Ok(SlashOutcome {
            slashed: amount,
            remaining_stake: remaining,
            policy: self.slash_policy,
        })
    }

    /// Raise a dispute flag on an open claim.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::NotRegistered`] if `caller` has no active stake
    /// - [`AttestorError::UnknownClaim`] if the claim does not exist
    /// - [`AttestorError::InvalidTransition`] if the claim is terminal
    pub fn flag_claim(
        &mut self,
        book: &mut impl ClaimBook,
        caller: AccountId,
        claim_id: ClaimId,
    ) -> Result<()> {
        if !self.attestors.get(&caller).is_some_and(Attestor::is_active) {
            return Err(AttestorError::NotRegistered);
        }
        if book.claim_status(claim_id).is_none() {
            return Err(AttestorError::UnknownClaim(claim_id));
        }
        let from = book.advance(claim_id, ClaimStatus::Flagged)?;

        tracing::warn!(claim_id, attestor = %caller, ?from, "claim flagged");
        self.events.push(LedgerEvent::ClaimStatusChanged {
            claim_id,
            from,
            to: ClaimStatus::Flagged,
        });
        Ok(())
    }

    /// Credit a submission fee to the reward pool.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::Overflow`] if the pool would overflow
    pub fn credit_fee(&mut self, claim_id: ClaimId, fee: Amount) -> Result<()> {
        self.pool.credit_fee(fee)?;
        tracing::debug!(claim_id, fee, pool_balance = self.pool.balance(), "fee credited");
        Ok(())
    }

    /// Check that a fee can be credited without changing state.
    pub fn can_credit_fee(&self, fee: Amount) -> bool {
        self.pool.balance().checked_add(fee).is_some()
            && self.pool.total_fees().checked_add(fee).is_some()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Attestor record, if registered.
    pub fn attestor(&self, id: &AccountId) -> Option<&Attestor> {
        self.attestors.get(id)
    }

    /// Stats view, if registered.
    pub fn attestor_stats(&self, id: &AccountId) -> Option<AttestorStats> {
        self.attestors.get(id).map(Attestor::stats)
    }

    /// Unclaimed rewards (zero if unregistered).
    pub fn rewards_earned(&self, id: &AccountId) -> Amount {
        self.attestors.get(id).map_or(0, |a| a.rewards_earned)
    }

    /// Lifetime claimed rewards (zero if unregistered).
    pub fn total_claimed(&self, id: &AccountId) -> Amount {
        self.attestors.get(id).map_or(0, |a| a.total_claimed)
    }

    /// Trust score (zero if unregistered).
    pub fn trust_score(&self, id: &AccountId) -> u8 {
        self.attestors.get(id).map_or(0, Attestor::trust_score)
    }

    /// Whether `attestor` attested to `claim_id`.
    pub fn has_attested(&self, claim_id: ClaimId, attestor: &AccountId) -> bool {
        self.records
            .get(&claim_id)
            .is_some_and(|r| r.contains(attestor))
    }

    /// Aggregate attested stake for a claim.
    pub fn total_stake_per_claim(&self, claim_id: ClaimId) -> Amount {
        self.records
            .get(&claim_id)
            .map_or(0, AttestationRecord::total_stake)
    }

    /// Distinct attestor count for a claim.
    pub fn attestor_count_per_claim(&self, claim_id: ClaimId) -> usize {
        self.records
            .get(&claim_id)
            .map_or(0, AttestationRecord::count)
    }

    /// Attestation record for a claim.
    pub fn record(&self, claim_id: ClaimId) -> Option<&AttestationRecord> {
        self.records.get(&claim_id)
    }

    /// The reward pool.
    pub fn pool(&self) -> &RewardPool {
        &self.pool
    }

    /// The slashing authority.
    pub fn authority(&self) -> AccountId {
        self.authority
    }

    /// Configured slash destination.
    pub fn slash_policy(&self) -> SlashPolicy {
        self.slash_policy
    }

    /// Lifetime stake burned by slashing.
    pub fn total_burned(&self) -> Amount {
        self.total_burned
    }

    /// Number of registered attestors.
    pub fn attestor_count(&self) -> usize {
        self.attestors.len()
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Drop events from a command that is being rolled back.
    pub fn discard_events(&mut self) {
        self.events.clear();
    }

    /// Check every lifetime accounting invariant.
    ///
    /// # Errors
    ///
    /// - [`AttestorError::InvariantViolation`] naming the first failure
    pub fn audit(&self) -> Result<()> {
        let violation = |msg: String| Err(AttestorError::InvariantViolation(msg));

        if !self.pool.is_conserved() {
            return violation(format!(
                "pool: balance {} + disbursed {} != fees {} + slashed {}",
                self.pool.balance(),
                self.pool.total_disbursed(),
                self.pool.total_fees(),
                self.pool.total_slashed_in()
            ));
        }

        let mut outstanding: u128 = 0;
        let mut stake: u128 = 0;
        for (id, attestor) in &self.attestors {
            if !attestor.reconciles() {
                return violation(format!("attestor {id}: rewards do not reconcile"));
            }
            outstanding += u128::from(attestor.total_rewarded);
            stake += u128::from(attestor.stake);
        }
        if outstanding != u128::from(self.pool.total_disbursed()) {
            return violation(format!(
                "rewards granted {outstanding} != pool disbursed {}",
                self.pool.total_disbursed()
            ));
        }

        let finalized = self.records.values().filter(|r| r.is_finalized()).count();
        let expected =
            u128::from(REWARD_PER_ATTESTOR) * MIN_QUORUM as u128 * finalized as u128;
        if outstanding != expected {
            return violation(format!(
                "rewards granted {outstanding} != {finalized} finalized claims x quorum reward"
            ));
        }

        let expected_stake =
            u128::from(self.total_staked_in) - u128::from(self.total_slashed.min(self.total_staked_in));
        if stake != expected_stake {
            return violation(format!(
                "stake held {stake} != staked {} - slashed {}",
                self.total_staked_in, self.total_slashed
            ));
        }
        Ok(())
    }
}
