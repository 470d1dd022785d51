//! Registry schema history.
//!
//! 1. `identities` with the unique wallet index.
//! 2. `cohorts` and `members` with their unique name/code/email indexes.
//! 3. `memberships`, the member↔cohort join table.
//!
//! The applied step is mirrored to `PRAGMA user_version`; steps are never
//! edited once released, only appended.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct Step {
    version: u32,
    sql: &'static str,
}

const SCHEMA_HISTORY: &[Step] = &[
    Step {
        version: 1,
        sql: include_str!("0001_identities.sql"),
    },
    Step {
        version: 2,
        sql: include_str!("0002_cohorts_members.sql"),
    },
    Step {
        version: 3,
        sql: include_str!("0003_memberships.sql"),
    },
];

/// Schema version this build migrates to.
pub fn latest_version() -> u32 {
    SCHEMA_HISTORY.last().map_or(0, |step| step.version)
}

/// Steps still to run on a database at `found`.
fn pending_steps(found: u32) -> DbResult<&'static [Step]> {
    let supported = latest_version();
    if found > supported {
        return Err(DbError::UnsupportedSchemaVersion { found, supported });
    }
    let first_pending = SCHEMA_HISTORY.partition_point(|step| step.version <= found);
    Ok(&SCHEMA_HISTORY[first_pending..])
}

/// Brings the connection's schema up to [`latest_version`] in one
/// transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = current_user_version(conn)?;
    let pending = pending_steps(found)?;
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={found} to_version={} steps={}",
        latest_version(),
        pending.len()
    );
    Ok(())
}

/// Reads the schema version recorded on the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
