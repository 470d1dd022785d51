//! Records registry core: staff identities, cohorts and members.
//! This crate is the single source of truth for uniqueness and membership
//! invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, RosterConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use metrics::{EntityKind, InMemoryMetrics, MetricsError, MetricsNotifier, NoopMetrics};
pub use model::cohort::{Cohort, CohortId, CohortPatch, CohortRecord, NewCohort};
pub use model::identity::{Identity, IdentityId, IdentityPatch, IdentityRole, NewIdentity};
pub use model::member::{Member, MemberId, MemberPatch, MemberRecord, NewMember};
pub use repo::cohort_repo::{CohortRepository, SqliteCohortRepository};
pub use repo::identity_repo::{IdentityRepository, SqliteIdentityRepository};
pub use repo::member_repo::{MemberRepository, SqliteMemberRepository};
pub use repo::{RepoError, RepoResult, UnitOfWork};
pub use service::cohort_service::CohortService;
pub use service::error::{ConflictError, ErrorKind, NotFoundError, RegistryError, UniqueField};
pub use service::identity_service::IdentityService;
pub use service::member_service::MemberService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
