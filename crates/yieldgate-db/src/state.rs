//! Protocol state persistence.
//!
//! Each ledger is stored as its own snapshot row so the three stay
//! independently readable, but a commit always rewrites all of them in the
//! same SQLite transaction as the log row that produced them.

use rusqlite::Connection;
use yieldgate_attestor::AttestorLedger;
use yieldgate_protocol::{Payout, Payouts, Protocol};
use yieldgate_registry::ClaimRegistry;
use yieldgate_types::LedgerEvent;
use yieldgate_vault::Vault;

use crate::queries::{nonces, payouts, snapshots, transactions};
use crate::queries::payouts::PayoutRow;
use crate::queries::transactions::TxRow;
use crate::{cbor, DbError, Result};

const ATTESTOR_LEDGER: &str = "attestor_ledger";
const CLAIM_REGISTRY: &str = "claim_registry";
const VAULT: &str = "vault";

/// The restored ledgers.
#[derive(Debug)]
pub struct StoredLedgers {
    pub ledger: AttestorLedger,
    pub registry: ClaimRegistry,
    pub vault: Vault,
    /// Sequence number of the last committed command.
    pub seq: u64,
}

/// What a committed command writes alongside the snapshots.
#[derive(Debug)]
pub struct Commit<'a> {
    pub seq: u64,
    pub tx_hash: [u8; 32],
    pub caller: Option<[u8; 32]>,
    /// Authenticated callers advance their nonce in the same transaction.
    pub nonce: Option<u64>,
    pub method: &'a str,
    pub params: &'a serde_json::Value,
    pub events: &'a [LedgerEvent],
    pub payouts: &'a [Payout],
    pub committed_at: u64,
}

/// Write a committed command and the resulting ledger state atomically.
///
/// # Errors
///
/// - [`DbError::Constraint`] if the nonce was already used
/// - [`DbError::Serialization`] if a ledger cannot be encoded
/// - [`DbError::Sqlite`] on storage failure; nothing is written
pub fn persist_commit<P: Payouts>(
    conn: &mut Connection,
    protocol: &Protocol<P>,
    commit: &Commit<'_>,
) -> Result<()> {
    let ledger = cbor::to_vec(protocol.ledger(), ATTESTOR_LEDGER)?;
    let registry = cbor::to_vec(protocol.registry(), CLAIM_REGISTRY)?;
    let vault = cbor::to_vec(protocol.vault(), VAULT)?;
    let events = serde_json::to_string(commit.events)
        .map_err(|e| DbError::Serialization(format!("events: {e}")))?;

    let tx = conn.transaction()?;
    if let (Some(caller), Some(nonce)) = (commit.caller, commit.nonce) {
        nonces::advance(&tx, &caller, nonce)?;
    }
    transactions::record(
        &tx,
        &TxRow {
            seq: commit.seq,
            tx_hash: commit.tx_hash,
            caller: commit.caller,
            method: commit.method.to_string(),
            params: commit.params.to_string(),
            events,
            committed_at: commit.committed_at,
        },
    )?;
    for payout in commit.payouts {
        payouts::record(
            &tx,
            &PayoutRow {
                seq: commit.seq,
                recipient: *payout.recipient.as_bytes(),
                amount: payout.amount,
                reason: payout.reason.as_str().to_string(),
            },
        )?;
    }
    snapshots::save(&tx, ATTESTOR_LEDGER, commit.seq, &ledger, commit.committed_at)?;
    snapshots::save(&tx, CLAIM_REGISTRY, commit.seq, &registry, commit.committed_at)?;
    snapshots::save(&tx, VAULT, commit.seq, &vault, commit.committed_at)?;
    tx.commit()?;

    tracing::debug!(
        seq = commit.seq,
        method = commit.method,
        events = commit.events.len(),
        payouts = commit.payouts.len(),
        "commit persisted"
    );
    Ok(())
}

/// Load the stored ledgers, or `None` for a fresh database.
///
/// # Errors
///
/// - [`DbError::Constraint`] if only some ledgers are present or their
///   sequence numbers disagree
/// - [`DbError::Serialization`] if a snapshot does not decode
pub fn load(conn: &Connection) -> Result<Option<StoredLedgers>> {
    let ledger = snapshots::load(conn, ATTESTOR_LEDGER)?;
    let registry = snapshots::load(conn, CLAIM_REGISTRY)?;
    let vault = snapshots::load(conn, VAULT)?;

    match (ledger, registry, vault) {
        (None, None, None) => Ok(None),
        (Some((s1, l)), Some((s2, r)), Some((s3, v))) => {
            if s1 != s2 || s2 != s3 {
                return Err(DbError::Constraint(format!(
                    "snapshot sequence mismatch: {s1}/{s2}/{s3}"
                )));
            }
            let stored = StoredLedgers {
                ledger: cbor::from_slice(&l, ATTESTOR_LEDGER)?,
                registry: cbor::from_slice(&r, CLAIM_REGISTRY)?,
                vault: cbor::from_slice(&v, VAULT)?,
                seq: s1,
            };
            tracing::info!(
                seq = stored.seq,
                claims = stored.registry.total_claims(),
                attestors = stored.ledger.attestor_count(),
                "ledgers restored"
            );
            Ok(Some(stored))
        }
        _ => Err(DbError::Constraint("partial ledger snapshot set".into())),
    }
}

/// Record a rejected authenticated request's nonce so it cannot be replayed.
///
/// # Errors
///
/// - [`DbError::Constraint`] if the nonce was already used
pub fn burn_nonce(conn: &Connection, caller: &[u8; 32], nonce: u64) -> Result<()> {
    nonces::advance(conn, caller, nonce)
}
