//! Cohort repository contract and SQLite implementation.
//!
//! # Invariants
//! - Cohort listings are ordered by `year DESC, name ASC`.
//! - `delete_cohort` detaches every membership edge referencing the cohort
//!   in the same unit of work; member rows are untouched.

use crate::model::cohort::{Cohort, CohortId};
use crate::model::member::Member;
use crate::repo::member_repo::select_members_in_cohort;
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_timestamp, parse_uuid,
    run_in_transaction, select_existing_ids, to_count, RepoError, RepoResult, UnitOfWork,
};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

const COHORT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    year,
    is_active,
    created_at,
    updated_at
FROM cohorts";

/// Repository interface for cohorts.
pub trait CohortRepository {
    fn insert_cohort(&self, cohort: &Cohort) -> RepoResult<()>;
    /// Overwrites every mutable column of an existing cohort.
    fn update_cohort(&self, cohort: &Cohort) -> RepoResult<()>;
    fn get_cohort(&self, id: CohortId) -> RepoResult<Option<Cohort>>;
    fn find_cohort_by_name(&self, name: &str) -> RepoResult<Option<Cohort>>;
    /// Lists cohorts by `year DESC, name ASC`, optionally active ones only.
    fn list_cohorts(&self, active_only: bool) -> RepoResult<Vec<Cohort>>;
    /// Lists the members currently holding an edge to the cohort.
    fn list_cohort_members(&self, id: CohortId) -> RepoResult<Vec<Member>>;
    /// Deletes the cohort after detaching its membership edges.
    fn delete_cohort(&self, id: CohortId) -> RepoResult<()>;
    fn count_cohorts(&self) -> RepoResult<u64>;
    /// Returns the subset of `ids` that exist.
    fn existing_cohort_ids(&self, ids: &BTreeSet<CohortId>) -> RepoResult<BTreeSet<CohortId>>;
}

/// SQLite-backed cohort repository.
pub struct SqliteCohortRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCohortRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["cohorts", "members", "memberships"])?;
        Ok(Self { conn })
    }
}

impl UnitOfWork for SqliteCohortRepository<'_> {
    fn run_in_transaction<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        run_in_transaction(self.conn, work)
    }
}

impl CohortRepository for SqliteCohortRepository<'_> {
    fn insert_cohort(&self, cohort: &Cohort) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO cohorts (
                id,
                name,
                description,
                year,
                is_active,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                cohort.id.to_string(),
                cohort.name.as_str(),
                cohort.description.as_deref(),
                cohort.year,
                bool_to_int(cohort.active),
                cohort.created_at.timestamp_millis(),
                cohort.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn update_cohort(&self, cohort: &Cohort) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE cohorts
             SET
                name = ?1,
                description = ?2,
                year = ?3,
                is_active = ?4,
                updated_at = ?5
             WHERE id = ?6;",
            params![
                cohort.name.as_str(),
                cohort.description.as_deref(),
                cohort.year,
                bool_to_int(cohort.active),
                cohort.updated_at.timestamp_millis(),
                cohort.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "cohorts",
                id: cohort.id,
            });
        }
        Ok(())
    }

    fn get_cohort(&self, id: CohortId) -> RepoResult<Option<Cohort>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COHORT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_cohort_row(row)?));
        }
        Ok(None)
    }

    fn find_cohort_by_name(&self, name: &str) -> RepoResult<Option<Cohort>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COHORT_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_cohort_row(row)?));
        }
        Ok(None)
    }

    fn list_cohorts(&self, active_only: bool) -> RepoResult<Vec<Cohort>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COHORT_SELECT_SQL}
             WHERE (?1 = 0 OR is_active = 1)
             ORDER BY year DESC, name ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(active_only)])?;
        let mut cohorts = Vec::new();
        while let Some(row) = rows.next()? {
            cohorts.push(parse_cohort_row(row)?);
        }
        Ok(cohorts)
    }

    fn list_cohort_members(&self, id: CohortId) -> RepoResult<Vec<Member>> {
        select_members_in_cohort(self.conn, id)
    }

    fn delete_cohort(&self, id: CohortId) -> RepoResult<()> {
        run_in_transaction(self.conn, || -> RepoResult<()> {
            let id_text = id.to_string();
            self.conn.execute(
                "DELETE FROM memberships WHERE cohort_id = ?1;",
                [id_text.as_str()],
            )?;
            let changed = self
                .conn
                .execute("DELETE FROM cohorts WHERE id = ?1;", [id_text.as_str()])?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    table: "cohorts",
                    id,
                });
            }
            Ok(())
        })
    }

    fn count_cohorts(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cohorts;", [], |row| row.get(0))?;
        to_count(count)
    }

    fn existing_cohort_ids(&self, ids: &BTreeSet<CohortId>) -> RepoResult<BTreeSet<CohortId>> {
        select_existing_ids(self.conn, "cohorts", ids)
    }
}

fn parse_cohort_row(row: &Row<'_>) -> RepoResult<Cohort> {
    let id_text: String = row.get("id")?;
    Ok(Cohort {
        id: parse_uuid(&id_text, "cohorts.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        year: row.get("year")?,
        active: parse_bool(row.get("is_active")?, "cohorts.is_active")?,
        created_at: parse_timestamp(row.get("created_at")?, "cohorts.created_at")?,
        updated_at: parse_timestamp(row.get("updated_at")?, "cohorts.updated_at")?,
    })
}
