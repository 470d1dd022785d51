//! Member repository contract and SQLite implementation, including the
//! member↔cohort membership relation.
//!
//! # Responsibility
//! - Persist member rows and their membership edges.
//! - Resolve requested id sets against stored members.
//!
//! # Invariants
//! - Member listings are ordered by `family_name ASC, given_name ASC`.
//! - `replace_cohort_ids` overwrites the whole edge set in one unit of work.
//! - `delete_member` removes the member's edges before the member row.

use crate::model::cohort::CohortId;
use crate::model::member::{Member, MemberId};
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_timestamp, parse_uuid,
    run_in_transaction, select_existing_ids, to_count, RepoError, RepoResult, UnitOfWork,
};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

const MEMBER_SELECT_SQL: &str = "SELECT
    m.id AS id,
    m.member_code AS member_code,
    m.family_name AS family_name,
    m.given_name AS given_name,
    m.email AS email,
    m.is_active AS is_active,
    m.created_at AS created_at,
    m.updated_at AS updated_at
FROM members m";

const MEMBER_ORDER_SQL: &str = "ORDER BY m.family_name ASC, m.given_name ASC, m.rowid ASC";

/// Repository interface for members and their membership sets.
pub trait MemberRepository {
    fn insert_member(&self, member: &Member) -> RepoResult<()>;
    /// Overwrites every mutable scalar column of an existing member.
    fn update_member(&self, member: &Member) -> RepoResult<()>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    fn find_member_by_code(&self, member_code: &str) -> RepoResult<Option<Member>>;
    fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>>;
    fn list_members(&self) -> RepoResult<Vec<Member>>;
    fn list_members_in_cohort(&self, cohort_id: CohortId) -> RepoResult<Vec<Member>>;
    /// Deletes the member together with its membership edges.
    fn delete_member(&self, id: MemberId) -> RepoResult<()>;
    fn count_members(&self) -> RepoResult<u64>;
    fn count_members_in_cohort(&self, cohort_id: CohortId) -> RepoResult<u64>;
    /// Returns the subset of `ids` that exist.
    fn existing_member_ids(&self, ids: &BTreeSet<MemberId>) -> RepoResult<BTreeSet<MemberId>>;
    /// Reads the membership set of one member.
    fn cohort_ids_of(&self, member_id: MemberId) -> RepoResult<BTreeSet<CohortId>>;
    /// Fully overwrites the membership set of one member.
    fn replace_cohort_ids(
        &self,
        member_id: MemberId,
        cohort_ids: &BTreeSet<CohortId>,
    ) -> RepoResult<()>;
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["members", "cohorts", "memberships"])?;
        Ok(Self { conn })
    }
}

impl UnitOfWork for SqliteMemberRepository<'_> {
    fn run_in_transaction<T, E>(&self, work: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        run_in_transaction(self.conn, work)
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn insert_member(&self, member: &Member) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO members (
                id,
                member_code,
                family_name,
                given_name,
                email,
                is_active,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                member.id.to_string(),
                member.member_code.as_str(),
                member.family_name.as_str(),
                member.given_name.as_str(),
                member.email.as_str(),
                bool_to_int(member.active),
                member.created_at.timestamp_millis(),
                member.updated_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn update_member(&self, member: &Member) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE members
             SET
                member_code = ?1,
                family_name = ?2,
                given_name = ?3,
                email = ?4,
                is_active = ?5,
                updated_at = ?6
             WHERE id = ?7;",
            params![
                member.member_code.as_str(),
                member.family_name.as_str(),
                member.given_name.as_str(),
                member.email.as_str(),
                bool_to_int(member.active),
                member.updated_at.timestamp_millis(),
                member.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                table: "members",
                id: member.id,
            });
        }
        Ok(())
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        select_one_member(self.conn, "m.id", &id.to_string())
    }

    fn find_member_by_code(&self, member_code: &str) -> RepoResult<Option<Member>> {
        select_one_member(self.conn, "m.member_code", member_code)
    }

    fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>> {
        select_one_member(self.conn, "m.email", email)
    }

    fn list_members(&self) -> RepoResult<Vec<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} {MEMBER_ORDER_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn list_members_in_cohort(&self, cohort_id: CohortId) -> RepoResult<Vec<Member>> {
        select_members_in_cohort(self.conn, cohort_id)
    }

    fn delete_member(&self, id: MemberId) -> RepoResult<()> {
        run_in_transaction(self.conn, || -> RepoResult<()> {
            let id_text = id.to_string();
            self.conn.execute(
                "DELETE FROM memberships WHERE member_id = ?1;",
                [id_text.as_str()],
            )?;
            let changed = self
                .conn
                .execute("DELETE FROM members WHERE id = ?1;", [id_text.as_str()])?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    table: "members",
                    id,
                });
            }
            Ok(())
        })
    }

    fn count_members(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM members;", [], |row| row.get(0))?;
        to_count(count)
    }

    fn count_members_in_cohort(&self, cohort_id: CohortId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM memberships WHERE cohort_id = ?1;",
            [cohort_id.to_string()],
            |row| row.get(0),
        )?;
        to_count(count)
    }

    fn existing_member_ids(&self, ids: &BTreeSet<MemberId>) -> RepoResult<BTreeSet<MemberId>> {
        select_existing_ids(self.conn, "members", ids)
    }

    fn cohort_ids_of(&self, member_id: MemberId) -> RepoResult<BTreeSet<CohortId>> {
        let mut stmt = self.conn.prepare(
            "SELECT cohort_id
             FROM memberships
             WHERE member_id = ?1;",
        )?;
        let mut rows = stmt.query([member_id.to_string()])?;
        let mut cohort_ids = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            cohort_ids.insert(parse_uuid(&value, "memberships.cohort_id")?);
        }
        Ok(cohort_ids)
    }

    fn replace_cohort_ids(
        &self,
        member_id: MemberId,
        cohort_ids: &BTreeSet<CohortId>,
    ) -> RepoResult<()> {
        run_in_transaction(self.conn, || -> RepoResult<()> {
            let member_id_text = member_id.to_string();
            let exists: i64 = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM members WHERE id = ?1);",
                [member_id_text.as_str()],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(RepoError::NotFound {
                    table: "members",
                    id: member_id,
                });
            }

            self.conn.execute(
                "DELETE FROM memberships WHERE member_id = ?1;",
                [member_id_text.as_str()],
            )?;
            let mut insert = self.conn.prepare(
                "INSERT INTO memberships (member_id, cohort_id) VALUES (?1, ?2);",
            )?;
            for cohort_id in cohort_ids {
                insert.execute(params![member_id_text.as_str(), cohort_id.to_string()])?;
            }
            Ok(())
        })
    }
}

pub(crate) fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let id_text: String = row.get("id")?;
    Ok(Member {
        id: parse_uuid(&id_text, "members.id")?,
        member_code: row.get("member_code")?,
        family_name: row.get("family_name")?,
        given_name: row.get("given_name")?,
        email: row.get("email")?,
        active: parse_bool(row.get("is_active")?, "members.is_active")?,
        created_at: parse_timestamp(row.get("created_at")?, "members.created_at")?,
        updated_at: parse_timestamp(row.get("updated_at")?, "members.updated_at")?,
    })
}

pub(crate) fn select_members_in_cohort(
    conn: &Connection,
    cohort_id: CohortId,
) -> RepoResult<Vec<Member>> {
    let mut stmt = conn.prepare(&format!(
        "{MEMBER_SELECT_SQL}
         INNER JOIN memberships ms ON ms.member_id = m.id
         WHERE ms.cohort_id = ?1
         {MEMBER_ORDER_SQL};"
    ))?;
    let mut rows = stmt.query([cohort_id.to_string()])?;
    let mut members = Vec::new();
    while let Some(row) = rows.next()? {
        members.push(parse_member_row(row)?);
    }
    Ok(members)
}

fn select_one_member(conn: &Connection, column: &str, value: &str) -> RepoResult<Option<Member>> {
    let mut stmt = conn.prepare(&format!("{MEMBER_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([value])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_member_row(row)?));
    }
    Ok(None)
}
