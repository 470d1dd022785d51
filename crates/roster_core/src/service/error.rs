//! Error taxonomy shared by every registry operation.
//!
//! # Invariants
//! - Each operation fails with exactly one `ErrorKind`.
//! - Storage-level constraint rejections are reported as the domain kind
//!   they guard (`Conflict` / `NotFound`), never as `Storage`.

use crate::model::cohort::CohortId;
use crate::model::identity::IdentityId;
use crate::model::member::MemberId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse failure category a request layer maps 1:1 to its responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    Storage,
}

/// Uniquely constrained fields guarded before writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    WalletAddress,
    CohortName,
    MemberCode,
    Email,
}

impl UniqueField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WalletAddress => "wallet_address",
            Self::CohortName => "cohort_name",
            Self::MemberCode => "member_code",
            Self::Email => "email",
        }
    }

    fn from_storage(table: &str, column: &str) -> Option<Self> {
        match (table, column) {
            ("identities", "wallet_address") => Some(Self::WalletAddress),
            ("cohorts", "name") => Some(Self::CohortName),
            ("members", "member_code") => Some(Self::MemberCode),
            ("members", "email") => Some(Self::Email),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// Value already belongs to another record.
    Taken { field: UniqueField, value: String },
    /// Wallet address fails the format/checksum rule.
    InvalidWalletAddress(String),
    /// Storage unique index rejected the write.
    Rejected(UniqueField),
}

impl Display for ConflictError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Taken { field, value } => {
                write!(f, "{} `{value}` is already in use", field.as_str())
            }
            Self::InvalidWalletAddress(value) => write!(f, "invalid wallet address `{value}`"),
            Self::Rejected(field) => {
                write!(f, "{} is already in use (rejected by storage)", field.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    Identity(IdentityId),
    IdentityWallet(String),
    Cohort(CohortId),
    Member(MemberId),
    MemberCode(String),
    MemberEmail(String),
    /// Some requested cohort ids do not resolve.
    CohortsMissing { missing: Vec<CohortId> },
    /// Some requested member ids do not resolve.
    MembersMissing { missing: Vec<MemberId> },
    /// Storage rejected a write referencing a row that vanished.
    DanglingReference,
}

impl Display for NotFoundError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity(id) => write!(f, "identity not found: {id}"),
            Self::IdentityWallet(address) => {
                write!(f, "identity not found for wallet address `{address}`")
            }
            Self::Cohort(id) => write!(f, "cohort not found: {id}"),
            Self::Member(id) => write!(f, "member not found: {id}"),
            Self::MemberCode(code) => write!(f, "member not found for code `{code}`"),
            Self::MemberEmail(email) => write!(f, "member not found for email `{email}`"),
            Self::CohortsMissing { missing } => {
                write!(f, "one or more cohorts missing: {}", join_ids(missing))
            }
            Self::MembersMissing { missing } => {
                write!(f, "one or more members missing: {}", join_ids(missing))
            }
            Self::DanglingReference => write!(f, "referenced record no longer exists"),
        }
    }
}

/// Error returned by every registry operation.
#[derive(Debug)]
pub enum RegistryError {
    Conflict(ConflictError),
    NotFound(NotFoundError),
    /// Unclassified persistence failure.
    Storage(RepoError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict(err) => write!(f, "conflict: {err}"),
            Self::NotFound(err) => write!(f, "not found: {err}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConflictError> for RegistryError {
    fn from(value: ConflictError) -> Self {
        Self::Conflict(value)
    }
}

impl From<NotFoundError> for RegistryError {
    fn from(value: NotFoundError) -> Self {
        Self::NotFound(value)
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UniqueViolation { table, column } => {
                match UniqueField::from_storage(&table, &column) {
                    Some(field) => Self::Conflict(ConflictError::Rejected(field)),
                    None => Self::Storage(RepoError::UniqueViolation { table, column }),
                }
            }
            RepoError::ForeignKeyViolation => Self::NotFound(NotFoundError::DanglingReference),
            RepoError::NotFound { table, id } => match table {
                "identities" => Self::NotFound(NotFoundError::Identity(id)),
                "cohorts" => Self::NotFound(NotFoundError::Cohort(id)),
                "members" => Self::NotFound(NotFoundError::Member(id)),
                _ => Self::Storage(RepoError::NotFound { table, id }),
            },
            other => Self::Storage(other),
        }
    }
}

fn join_ids(ids: &[uuid::Uuid]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
