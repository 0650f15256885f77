//! Forward-only schema migrations.
//!
//! `PRAGMA user_version` holds the number of steps applied. Step `n` moves
//! the database from version `n` to `n + 1`; each step and its version bump
//! commit together.

use rusqlite::Connection;

use crate::{schema, DbError, Result};

/// Ordered migration steps.
const STEPS: &[&str] = &[schema::SCHEMA_V1];

/// Schema version after every step has been applied.
pub const SCHEMA_VERSION: u32 = STEPS.len() as u32;

/// Version recorded in the database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Apply every step the database has not seen yet.
///
/// # Errors
///
/// - [`DbError::Migration`] if the database is newer than this build
/// - [`DbError::Sqlite`] if a step fails; that step is rolled back
pub fn run(conn: &mut Connection) -> Result<()> {
    let from = current_version(conn)?;
    if from > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database is at v{from}, this build supports up to v{SCHEMA_VERSION}"
        )));
    }

    for (index, step) in STEPS.iter().enumerate().skip(from as usize) {
        let to = index as u32 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(step)?;
        tx.pragma_update(None, "user_version", to)?;
        tx.commit()?;
        tracing::info!(from = to - 1, to, "schema migrated");
    }
    Ok(())
}
