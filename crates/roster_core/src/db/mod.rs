//! Registry storage: connection bootstrap and schema versioning.
//!
//! Connections handed out by [`open_db`] / [`open_db_in_memory`] are ready
//! for the repositories: foreign keys enforced, busy timeout set, schema at
//! [`migrations::latest_version`]. Anything short of that is a [`DbError`]
//! naming the step that failed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Connection setting applied during bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    ForeignKeys,
    BusyTimeout,
}

impl Setting {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForeignKeys => "foreign_keys",
            Self::BusyTimeout => "busy_timeout",
        }
    }
}

#[derive(Debug)]
pub enum DbError {
    /// SQLite refused to open the file or memory database.
    Connect(rusqlite::Error),
    /// A connection setting could not be applied.
    Bootstrap {
        setting: Setting,
        source: rusqlite::Error,
    },
    /// `PRAGMA foreign_keys` reads back off; membership edges would go
    /// unchecked.
    ForeignKeysNotEnforced,
    /// One migration step failed; every pending step was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file was migrated by a newer build.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    /// Any other statement failure (schema version reads, transaction
    /// control).
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(err) => write!(f, "cannot open registry database: {err}"),
            Self::Bootstrap { setting, source } => {
                write!(f, "cannot apply `{}`: {source}", setting.as_str())
            }
            Self::ForeignKeysNotEnforced => {
                write!(f, "foreign key enforcement could not be enabled")
            }
            Self::Migration { version, source } => {
                write!(f, "registry migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "registry schema version {found} is newer than supported {supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connect(err) | Self::Sqlite(err) => Some(err),
            Self::Bootstrap { source, .. } | Self::Migration { source, .. } => Some(source),
            Self::ForeignKeysNotEnforced | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
