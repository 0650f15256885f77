//! Per-caller request nonces.

use rusqlite::{Connection, OptionalExtension};

use crate::{DbError, Result};

/// Last accepted nonce for `caller`.
pub fn get(conn: &Connection, caller: &[u8; 32]) -> Result<Option<u64>> {
    let nonce = conn
        .query_row(
            "SELECT nonce FROM nonces WHERE caller = ?1",
            [caller.as_slice()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(nonce.map(|n| n as u64))
}

/// Record `nonce` as the caller's latest.
///
/// # Errors
///
/// Returns [`DbError::Constraint`] if `nonce` does not exceed the stored one.
pub fn advance(conn: &Connection, caller: &[u8; 32], nonce: u64) -> Result<()> {
    let updated = conn.execute(
        "INSERT INTO nonces (caller, nonce) VALUES (?1, ?2)
         ON CONFLICT(caller) DO UPDATE SET nonce = excluded.nonce
         WHERE excluded.nonce > nonces.nonce",
        rusqlite::params![caller.as_slice(), nonce as i64],
    )?;
    if updated == 0 {
        return Err(DbError::Constraint(format!("nonce {nonce} already used")));
    }
    Ok(())
}
