//! Runtime configuration read from environment variables.
//!
//! | Variable           | Meaning                         | Default              |
//! |--------------------|---------------------------------|----------------------|
//! | `ROSTER_DB_PATH`   | SQLite database file            | in-memory database   |
//! | `ROSTER_LOG_LEVEL` | trace/debug/info/warn/error     | build-mode default   |
//! | `ROSTER_LOG_DIR`   | absolute directory for log files| logging disabled     |

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_PATH_VAR: &str = "ROSTER_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "ROSTER_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "ROSTER_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { var: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { var, reason } => write!(f, "invalid `{var}`: {reason}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConfig {
    /// `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: &'static str,
    /// `None` leaves file logging off.
    pub log_dir: Option<PathBuf>,
}

impl RosterConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let db_path = read(DB_PATH_VAR).map(|value| PathBuf::from(value.trim()));

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(|reason| ConfigError::InvalidValue {
                var: LOG_LEVEL_VAR,
                reason,
            })?,
            None => default_log_level(),
        };

        let log_dir = match read(LOG_DIR_VAR) {
            Some(value) => {
                let path = Path::new(value.trim());
                if !path.is_absolute() {
                    return Err(ConfigError::InvalidValue {
                        var: LOG_DIR_VAR,
                        reason: format!("expected an absolute path, got `{}`", value.trim()),
                    });
                }
                Some(path.to_path_buf())
            }
            None => None,
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RosterConfig, LOG_DIR_VAR, LOG_LEVEL_VAR};
    use crate::logging::default_log_level;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = RosterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, None);
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn values_are_trimmed_and_normalized() {
        let config = RosterConfig::from_lookup(lookup(&[
            ("ROSTER_DB_PATH", " /var/lib/roster.db "),
            ("ROSTER_LOG_LEVEL", "WARNING"),
        ]))
        .unwrap();
        assert_eq!(
            config.db_path.as_deref(),
            Some(std::path::Path::new("/var/lib/roster.db"))
        );
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn rejects_unknown_level_and_relative_log_dir() {
        let err = RosterConfig::from_lookup(lookup(&[(LOG_LEVEL_VAR, "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == LOG_LEVEL_VAR));

        let err = RosterConfig::from_lookup(lookup(&[(LOG_DIR_VAR, "logs")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == LOG_DIR_VAR));
    }
}
