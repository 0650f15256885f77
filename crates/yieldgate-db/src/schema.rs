//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Ledger state
-- ============================================================

CREATE TABLE IF NOT EXISTS ledger_snapshots (
    name TEXT PRIMARY KEY,
    seq INTEGER NOT NULL,
    data BLOB NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Command log
-- ============================================================

CREATE TABLE IF NOT EXISTS transaction_log (
    seq INTEGER PRIMARY KEY,
    tx_hash BLOB NOT NULL UNIQUE,
    caller BLOB,
    method TEXT NOT NULL,
    params TEXT NOT NULL,
    events TEXT NOT NULL,
    committed_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transaction_log_caller ON transaction_log(caller);

CREATE TABLE IF NOT EXISTS payouts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seq INTEGER NOT NULL REFERENCES transaction_log(seq),
    recipient BLOB NOT NULL,
    amount INTEGER NOT NULL,
    reason TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payouts_recipient ON payouts(recipient);

-- ============================================================
-- Replay protection
-- ============================================================

CREATE TABLE IF NOT EXISTS nonces (
    caller BLOB PRIMARY KEY,
    nonce INTEGER NOT NULL
);
"#;
