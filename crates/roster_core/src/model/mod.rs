//! Registry domain model.
//!
//! # Responsibility
//! - Define the records owned by each registry (identities, cohorts, members).
//! - Define create inputs and partial-update patches consumed by services.
//!
//! # Invariants
//! - Every record is identified by a stable, never reused UUID.
//! - A member's membership set only ever holds ids of existing cohorts when
//!   written; read models expose it as an ordered set.
//! - Patches distinguish an absent field from a field explicitly set.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer};

pub mod cohort;
pub mod identity;
pub mod member;
pub mod wallet;

/// Current UTC time at the millisecond precision storage keeps.
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Maps a present JSON key to `Some(value)`, so `null` becomes `Some(None)`.
///
/// Paired with `#[serde(default)]`, an absent key stays `None`.
pub(crate) fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
