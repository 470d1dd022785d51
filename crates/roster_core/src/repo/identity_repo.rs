//! Identity repository contract and SQLite implementation.
//!
//! # Invariants
//! - Wallet lookups compare against the stored lowercase form; callers
//!   normalize before querying.
//! - Listings are newest first: `created_at DESC`, then latest insertion first
//!   on equal timestamps.

use crate::model::identity::{Identity, IdentityId, IdentityRole};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_timestamp, parse_uuid,
    run_in_transaction, to_count, RepoError, RepoResult, UnitOfWork,
};
use rusqlite::{params, Connection, Row};

const IDENTITY_SELECT_SQL: &str = "SELECT
    id,
    family_name,
    given_name,
    role,
    wallet_address,
    is_active,
    created_at,
    updated_at
FROM identities";

/// Repository interface for staff identities.
pub trait IdentityRepository {
    fn insert_identity(&self, identity: &Identity) -> RepoResult<()>;
    /// Overwrites every mutable column of an existing identity.
    fn update_identity(&self, identity: &Identity) -> RepoResult<()>;
    fn get_identity(&self, id: IdentityId) -> RepoResult<Option<Identity>>;
    fn find_identity_by_wallet(&self, wallet_address: &str) -> RepoResult<Option<Identity>>;
    /// Lists identities newest first, optionally restricted to one role.
    fn list_identities(&self, role: Option<IdentityRole>) -> RepoResult<Vec<Identity>>;
    fn delete_identity(&self, id: IdentityId) -> RepoResult<()>;
    fn count_identities(&self) -> RepoResult<u64>;
}

/// SQLite-backed identity repository.
pub struct SqliteIdentityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentityRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["identities"])?;
        Ok(Self { conn })
    }
}

impl UnitOfWork for SqliteIdentityRepository<'_> {
    fn run_in_transaction<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        run_in_transaction(self.conn, work)
    }
}

impl IdentityRepository for SqliteIdentityRepository<'_> {
    fn insert_identity(&self, identity: &Identity) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO identities (
                id,
                family_name,
                given_name,
                role,
                wallet_address,
                is_active,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                identity.id.to_string(),
                identity.family_name.as_str(),
                identity.given_name.as_str(),
                identity.role.as_db_str(),
                identity.wallet_address.as_str(),
                bool_to_int(identity.active),
                identity.created_at.timestamp_millis(),
                identity.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn update_identity(&self, identity: &Identity) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE identities
             SET
                family_name = ?1,
                given_name = ?2,
                role = ?3,
                wallet_address = ?4,
                is_active = ?5,
                updated_at = ?6
             WHERE id = ?7;",
            params![
                identity.family_name.as_str(),
                identity.given_name.as_str(),
                identity.role.as_db_str(),
                identity.wallet_address.as_str(),
                bool_to_int(identity.active),
                identity.updated_at.timestamp_millis(),
                identity.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "identities",
                id: identity.id,
            });
        }
        Ok(())
    }

    fn get_identity(&self, id: IdentityId) -> RepoResult<Option<Identity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{IDENTITY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_identity_row(row)?));
        }
        Ok(None)
    }

    fn find_identity_by_wallet(&self, wallet_address: &str) -> RepoResult<Option<Identity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{IDENTITY_SELECT_SQL} WHERE wallet_address = ?1;"))?;
        let mut rows = stmt.query([wallet_address])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_identity_row(row)?));
        }
        Ok(None)
    }

    fn list_identities(&self, role: Option<IdentityRole>) -> RepoResult<Vec<Identity>> {
        let mut stmt = self.conn.prepare(&format!(
            "{IDENTITY_SELECT_SQL}
             WHERE (?1 IS NULL OR role = ?1)
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([role.map(IdentityRole::as_db_str)])?;
        let mut identities = Vec::new();
        while let Some(row) = rows.next()? {
            identities.push(parse_identity_row(row)?);
        }
        Ok(identities)
    }

    fn delete_identity(&self, id: IdentityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM identities WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "identities",
                id,
            });
        }
        Ok(())
    }

    fn count_identities(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM identities;", [], |row| row.get(0))?;
        to_count(count)
    }
}

fn parse_identity_row(row: &Row<'_>) -> RepoResult<Identity> {
    let id_text: String = row.get("id")?;
    let role_text: String = row.get("role")?;
    let role = IdentityRole::from_db_str(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in identities.role"))
    })?;

    Ok(Identity {
        id: parse_uuid(&id_text, "identities.id")?,
        family_name: row.get("family_name")?,
        given_name: row.get("given_name")?,
        role,
        wallet_address: row.get("wallet_address")?,
        active: parse_bool(row.get("is_active")?, "identities.is_active")?,
        created_at: parse_timestamp(row.get("created_at")?, "identities.created_at")?,
        updated_at: parse_timestamp(row.get("updated_at")?, "identities.updated_at")?,
    })
}
