//! Settled outbound transfers.

use rusqlite::Connection;

use crate::Result;

/// A stored payout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutRow {
    pub seq: u64,
    pub recipient: [u8; 32],
    pub amount: u64,
    pub reason: String,
}

/// Store a payout made by the command at `seq`.
pub fn record(conn: &Connection, row: &PayoutRow) -> Result<()> {
    conn.execute(
        "INSERT INTO payouts (seq, recipient, amount, reason) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            row.seq as i64,
            row.recipient.as_slice(),
            row.amount as i64,
            row.reason,
        ],
    )?;
    Ok(())
}

/// Total paid to `recipient`.
pub fn total_for(conn: &Connection, recipient: &[u8; 32]) -> Result<u64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM payouts WHERE recipient = ?1",
        [recipient.as_slice()],
        |row| row.get(0),
    )?;
    Ok(total as u64)
}

/// Payouts to `recipient`, oldest first.
pub fn list_for(conn: &Connection, recipient: &[u8; 32]) -> Result<Vec<PayoutRow>> {
    let mut stmt = conn.prepare(
        "SELECT seq, recipient, amount, reason FROM payouts
         WHERE recipient = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map([recipient.as_slice()], |row| {
            Ok(PayoutRow {
                seq: row.get::<_, i64>(0)? as u64,
                recipient: row.get(1)?,
                amount: row.get::<_, i64>(2)? as u64,
                reason: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
