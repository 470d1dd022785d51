//! Repository layer: the storage contract the registries consume, and its
//! SQLite implementation.
//!
//! # Responsibility
//! - Define per-entity data access traits plus the `UnitOfWork` primitive.
//! - Isolate SQL details from registry orchestration.
//! - Classify native constraint failures into semantic repository errors.
//!
//! # Invariants
//! - Repositories never enforce uniqueness themselves; the storage engine's
//!   unique indexes are the last line of defense and surface as
//!   `RepoError::UniqueViolation`.
//! - Repositories built on one connection share one unit of work.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::ffi;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod cohort_repo;
pub mod identity_repo;
pub mod member_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for registry persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Single-row write targeted a missing row.
    NotFound { table: &'static str, id: Uuid },
    /// Storage rejected a duplicate value on a unique index.
    UniqueViolation { table: String, column: String },
    /// Storage rejected a write referencing a missing row.
    ForeignKeyViolation,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, id } => write!(f, "row not found in `{table}`: {id}"),
            Self::UniqueViolation { table, column } => {
                write!(f, "unique constraint rejected `{table}.{column}`")
            }
            Self::ForeignKeyViolation => write!(f, "foreign key constraint rejected write"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "roster repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "roster repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted roster data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation {
                match failure.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        if let Some((table, column)) =
                            message.as_deref().and_then(parse_unique_target)
                        {
                            return Self::UniqueViolation { table, column };
                        }
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::ForeignKeyViolation,
                    _ => {}
                }
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Atomic-unit primitive of the storage contract.
pub trait UnitOfWork {
    /// Runs `work` inside one transaction: commit on `Ok`, rollback on `Err`.
    ///
    /// Nested calls join the enclosing transaction.
    fn run_in_transaction<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>;
}

/// Shared transaction driver for every SQLite repository.
pub(crate) fn run_in_transaction<T, E>(
    conn: &Connection,
    work: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<RepoError>,
{
    if !conn.is_autocommit() {
        return work();
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(RepoError::from)?;
    match work() {
        Ok(value) => {
            tx.commit().map_err(RepoError::from)?;
            Ok(value)
        }
        Err(err) => {
            debug!("event=tx_rollback module=repo status=rolled_back");
            drop(tx);
            Err(err)
        }
    }
}

/// SQLite reports `UNIQUE constraint failed: table.column[, table.column]`.
fn parse_unique_target(message: &str) -> Option<(String, String)> {
    let targets = message.strip_prefix("UNIQUE constraint failed: ")?;
    let first = targets.split(',').next()?.trim();
    let (table, column) = first.split_once('.')?;
    Some((table.to_string(), column.to_string()))
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(*table));
        }
    }

    Ok(())
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_timestamp(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp value `{value}` in {column}"))
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Ids bound per `IN (...)` query; far below SQLite's host parameter limit.
const ID_CHUNK_SIZE: usize = 500;

/// Builds `?, ?, ...` placeholders and bind values for an `IN (...)` list.
fn id_list_params(ids: &[Uuid]) -> (String, Vec<Value>) {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let values = ids.iter().map(|id| Value::Text(id.to_string())).collect();
    (placeholders, values)
}

/// Returns the subset of `ids` present in `table.id`.
///
/// Large sets are resolved in chunks on the caller's connection, so the
/// reads stay inside the caller's unit of work.
pub(crate) fn select_existing_ids(
    conn: &Connection,
    table: &'static str,
    ids: &BTreeSet<Uuid>,
) -> RepoResult<BTreeSet<Uuid>> {
    let ids: Vec<Uuid> = ids.iter().copied().collect();
    let column = format!("{table}.id");
    let mut found = BTreeSet::new();

    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let (placeholders, values) = id_list_params(chunk);
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT id FROM {table} WHERE id IN ({placeholders});"
        ))?;
        let mut rows = stmt.query(params_from_iter(values))?;
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            found.insert(parse_uuid(&value, &column)?);
        }
    }
    Ok(found)
}

pub(crate) fn to_count(count: i64) -> RepoResult<u64> {
    u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count `{count}`")))
}
