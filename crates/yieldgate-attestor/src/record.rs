//! Per-claim attestation records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use yieldgate_types::{AccountId, Amount};

/// Who attested to a claim and with how much stake.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    members: BTreeSet<AccountId>,
    /// Insertion order, for enumeration.
    order: Vec<AccountId>,
    total_stake: Amount,
    finalized: bool,
}

impl AttestationRecord {
    /// Whether `attestor` is in the set.
    pub fn contains(&self, attestor: &AccountId) -> bool {
        self.members.contains(attestor)
    }

    /// Number of distinct attestors.
    pub fn count(&self) -> usize {
        self.order.len()
    }

    /// Aggregate stake of the attesting set, measured at attestation time.
    pub fn total_stake(&self) -> Amount {
        self.total_stake
    }

    /// Whether rewards for this claim have been paid.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Attestors in the order they attested.
    pub fn attestors(&self) -> &[AccountId] {
        &self.order
    }

    /// Add an attestor. Returns `false` (and changes nothing) if already
    /// present or if the stake total would overflow.
    pub(crate) fn insert(&mut self, attestor: AccountId, stake: Amount) -> bool {
        if self.members.contains(&attestor) {
            return false;
        }
        let Some(total) = self.total_stake.checked_add(stake) else {
            return false;
        };
        self.members.insert(attestor);
        self.order.push(attestor);
        self.total_stake = total;
        true
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }
}
