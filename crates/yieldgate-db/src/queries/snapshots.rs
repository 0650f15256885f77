//! Ledger snapshot rows.

use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Insert or replace a snapshot.
pub fn save(conn: &Connection, name: &str, seq: u64, data: &[u8], updated_at: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO ledger_snapshots (name, seq, data, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET seq = excluded.seq, data = excluded.data,
             updated_at = excluded.updated_at",
        rusqlite::params![name, seq as i64, data, updated_at as i64],
    )?;
    Ok(())
}

/// Load a snapshot and the sequence number it was written at.
pub fn load(conn: &Connection, name: &str) -> Result<Option<(u64, Vec<u8>)>> {
    let row = conn
        .query_row(
            "SELECT seq, data FROM ledger_snapshots WHERE name = ?1",
            [name],
            |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, Vec<u8>>(1)?)),
        )
        .optional()?;
    Ok(row)
}
