//! # yieldgate-db
//!
//! Durable storage for the yieldgate daemon: one SQLite file,
//! `$YIELDGATE_DATA_DIR/yieldgate.db`, holding the three ledger snapshots
//! (CBOR), the command log, the payout journal and per-caller nonces.
//!
//! A committed command writes all of these inside one SQLite transaction
//! (see [`state::persist_commit`]), so a crash leaves either the previous
//! state or the new one.
//!
//! ## Modules
//!
//! - [`cbor`] — Snapshot encoding
//! - [`migrations`] — `PRAGMA user_version` migration steps
//! - [`queries`] — One module per table
//! - [`schema`] — SQL definitions
//! - [`state`] — Commit and restore of the protocol ledgers

pub mod cbor;
pub mod migrations;
pub mod queries;
pub mod schema;
pub mod state;

use std::path::Path;

use rusqlite::Connection;

pub use migrations::SCHEMA_VERSION;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database file and bring its schema up to date.
///
/// # Errors
///
/// - [`DbError::Sqlite`] if the file cannot be opened or configured
/// - [`DbError::Migration`] if it was written by a newer build
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "FULL")?;
    prepare(conn)
}

/// In-memory database with the current schema.
///
/// # Errors
///
/// See [`open`].
pub fn open_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(mut conn: Connection) -> Result<Connection> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    migrations::run(&mut conn)?;
    Ok(conn)
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
