//! Command log.

use rusqlite::Connection;

use crate::Result;

/// A committed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRow {
    pub seq: u64,
    pub tx_hash: [u8; 32],
    pub caller: Option<[u8; 32]>,
    pub method: String,
    /// JSON-encoded request parameters.
    pub params: String,
    /// JSON array of the events the command emitted.
    pub events: String,
    pub committed_at: u64,
}

/// Append a command to the log.
pub fn record(conn: &Connection, tx: &TxRow) -> Result<()> {
    conn.execute(
        "INSERT INTO transaction_log (seq, tx_hash, caller, method, params, events, committed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tx.seq as i64,
            tx.tx_hash.as_slice(),
            tx.caller.as_ref().map(|c| c.as_slice()),
            tx.method,
            tx.params,
            tx.events,
            tx.committed_at as i64,
        ],
    )?;
    Ok(())
}

/// Highest committed sequence number, or 0 for an empty log.
pub fn last_seq(conn: &Connection) -> Result<u64> {
    let seq: i64 = conn.query_row(
        "SELECT COALESCE(MAX(seq), 0) FROM transaction_log",
        [],
        |row| row.get(0),
    )?;
    Ok(seq as u64)
}

/// Most recent commands, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<TxRow>> {
    let mut stmt = conn.prepare(
        "SELECT seq, tx_hash, caller, method, params, events, committed_at
         FROM transaction_log ORDER BY seq DESC LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], |row| {
            Ok(TxRow {
                seq: row.get::<_, i64>(0)? as u64,
                tx_hash: row.get(1)?,
                caller: row.get(2)?,
                method: row.get(3)?,
                params: row.get(4)?,
                events: row.get(5)?,
                committed_at: row.get::<_, i64>(6)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
