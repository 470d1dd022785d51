//! Member ("student") records and their membership set.
//!
//! # Invariants
//! - `member_code` and `email` are each unique across members.
//! - The membership set is only written with ids resolved against existing
//!   cohorts.
//! - Deleting a member removes its membership edges, never cohorts.

use crate::model::cohort::CohortId;
use crate::model::now_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type MemberId = Uuid;

/// Persisted member scalar fields, without the membership set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub member_code: String,
    pub family_name: String,
    pub given_name: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub(crate) fn new(
        member_code: String,
        family_name: String,
        given_name: String,
        email: String,
    ) -> Self {
        let now = now_utc();
        Self {
            id: Uuid::new_v4(),
            member_code,
            family_name,
            given_name,
            email,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Member loaded together with its membership set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRecord {
    #[serde(flatten)]
    pub member: Member,
    pub cohort_ids: BTreeSet<CohortId>,
}

/// Create input for members.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMember {
    pub member_code: String,
    pub family_name: String,
    pub given_name: String,
    pub email: String,
    /// Candidate cohort ids; duplicates are collapsed before resolution.
    #[serde(default)]
    pub cohort_ids: Option<Vec<CohortId>>,
}

/// Partial update for members.
///
/// `cohort_ids: None` leaves the membership set untouched; `Some(ids)`
/// replaces it in full, so `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemberPatch {
    pub member_code: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
    pub cohort_ids: Option<Vec<CohortId>>,
}
