//! Staff identity records.
//!
//! # Invariants
//! - `wallet_address` is stored lowercase and is unique across identities.
//! - Deleting an identity never touches cohorts or members.

use crate::model::now_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type IdentityId = Uuid;

/// Staff role carried by an identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityRole {
    Admin,
    Teacher,
    #[default]
    Guest,
}

impl IdentityRole {
    pub(crate) fn as_db_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Guest => "guest",
        }
    }

    pub(crate) fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "teacher" => Some(Self::Teacher),
            "guest" => Some(Self::Guest),
            _ => None,
        }
    }
}

/// Persisted staff identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub family_name: String,
    pub given_name: String,
    pub role: IdentityRole,
    /// Lowercase `0x`-prefixed address, 42 characters.
    pub wallet_address: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Builds a fresh active identity. The caller supplies the normalized
    /// wallet address.
    pub(crate) fn new(input: NewIdentity, wallet_address: String) -> Self {
        let now = now_utc();
        Self {
            id: Uuid::new_v4(),
            family_name: input.family_name,
            given_name: input.given_name,
            role: input.role,
            wallet_address,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Create input for identities.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewIdentity {
    pub family_name: String,
    pub given_name: String,
    #[serde(default)]
    pub role: IdentityRole,
    /// Raw address as supplied; case is only meaningful for checksum checks.
    pub wallet_address: String,
}

/// Partial update for identities. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IdentityPatch {
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub role: Option<IdentityRole>,
    pub wallet_address: Option<String>,
    pub active: Option<bool>,
}
