//! Cohort ("promotion") records.
//!
//! # Invariants
//! - `name` is unique across cohorts.
//! - Deleting a cohort detaches membership edges and never deletes members.

use crate::model::member::Member;
use crate::model::{deserialize_present, now_utc};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CohortId = Uuid;

/// Persisted cohort without its member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    pub id: CohortId,
    pub name: String,
    pub description: Option<String>,
    pub year: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cohort {
    pub(crate) fn new(input: NewCohort) -> Self {
        let now = now_utc();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            year: input.year,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Cohort read model with its current members, ordered by family then
/// given name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CohortRecord {
    #[serde(flatten)]
    pub cohort: Cohort,
    pub members: Vec<Member>,
}

/// Create input for cohorts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCohort {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub year: i32,
}

/// Partial update for cohorts.
///
/// `description` is tri-state: `None` keeps it, `Some(None)` clears it,
/// `Some(Some(text))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CohortPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    pub year: Option<i32>,
    pub active: Option<bool>,
}
