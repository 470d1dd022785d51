//! Member registry and membership relation.
//!
//! # Responsibility
//! - CRUD over members, guarding unique member code and email.
//! - Own the member↔cohort membership set: resolution on create, full
//!   replacement on update, and all-or-nothing bulk reassignment.
//! - Publish the member total after committed creates/removals.
//!
//! # Invariants
//! - Requested cohort/member ids are resolved on their distinct set; unknown
//!   ids fail the whole operation instead of being dropped.
//! - Membership writes are full replacements, never unions.
//! - Every check-then-act sequence runs in one unit of work, so a failed
//!   resolution leaves every membership set untouched.
//!
//! The member and cohort repositories must share one storage connection so
//! that they share the unit of work.

use crate::metrics::{publish_count, EntityKind, MetricsNotifier, NoopMetrics};
use crate::model::cohort::CohortId;
use crate::model::member::{Member, MemberId, MemberPatch, MemberRecord, NewMember};
use crate::model::now_utc;
use crate::repo::cohort_repo::CohortRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::UnitOfWork;
use crate::service::consistency::{distinct_ids, ensure_resolved, ensure_unclaimed};
use crate::service::error::{NotFoundError, RegistryError, UniqueField};
use log::info;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Member registry facade over repository implementations.
pub struct MemberService<M, C>
where
    M: MemberRepository + UnitOfWork,
    C: CohortRepository,
{
    members: M,
    cohorts: C,
    metrics: Arc<dyn MetricsNotifier>,
}

impl<M, C> MemberService<M, C>
where
    M: MemberRepository + UnitOfWork,
    C: CohortRepository,
{
    pub fn new(members: M, cohorts: C) -> Self {
        Self {
            members,
            cohorts,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Routes count notifications to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsNotifier>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Creates one member and sets its membership set to the resolved
    /// candidate cohorts (empty when none were requested).
    pub fn create(&self, input: NewMember) -> Result<MemberRecord, RegistryError> {
        let record = self
            .members
            .run_in_transaction(|| -> Result<MemberRecord, RegistryError> {
                let holder = self.members.find_member_by_code(&input.member_code)?;
                ensure_unclaimed(
                    holder.map(|member| member.id),
                    None,
                    UniqueField::MemberCode,
                    &input.member_code,
                )?;
                let holder = self.members.find_member_by_email(&input.email)?;
                ensure_unclaimed(
                    holder.map(|member| member.id),
                    None,
                    UniqueField::Email,
                    &input.email,
                )?;

                let cohort_ids = match input.cohort_ids.as_deref() {
                    Some(requested) => self.resolve_cohorts(requested)?,
                    None => BTreeSet::new(),
                };

                let member = Member::new(
                    input.member_code,
                    input.family_name,
                    input.given_name,
                    input.email,
                );
                self.members.insert_member(&member)?;
                self.members.replace_cohort_ids(member.id, &cohort_ids)?;
                self.load_record(member.id)
            })?;

        info!(
            "event=member_create module=member_service status=ok member_id={} cohort_count={}",
            record.member.id,
            record.cohort_ids.len()
        );
        self.publish_total();
        Ok(record)
    }

    /// Lists every member with its membership set, by family then given name.
    pub fn find_all(&self) -> Result<Vec<MemberRecord>, RegistryError> {
        let members = self.members.list_members()?;
        self.attach_memberships(members)
    }

    pub fn find_by_member_code(&self, member_code: &str) -> Result<MemberRecord, RegistryError> {
        let member = self
            .members
            .find_member_by_code(member_code)?
            .ok_or_else(|| NotFoundError::MemberCode(member_code.to_string()))?;
        self.with_membership(member)
    }

    pub fn find_by_email(&self, email: &str) -> Result<MemberRecord, RegistryError> {
        let member = self
            .members
            .find_member_by_email(email)?
            .ok_or_else(|| NotFoundError::MemberEmail(email.to_string()))?;
        self.with_membership(member)
    }

    pub fn find_one(&self, id: MemberId) -> Result<MemberRecord, RegistryError> {
        self.load_record(id)
    }

    /// Lists the members of one cohort, by family then given name.
    pub fn find_by_cohort(&self, cohort_id: CohortId) -> Result<Vec<MemberRecord>, RegistryError> {
        let members = self.members.list_members_in_cohort(cohort_id)?;
        self.attach_memberships(members)
    }

    /// Applies a partial update.
    ///
    /// `patch.cohort_ids == None` leaves the membership set untouched; any
    /// `Some` list replaces it in full after resolution.
    pub fn update(&self, id: MemberId, patch: MemberPatch) -> Result<MemberRecord, RegistryError> {
        let record = self
            .members
            .run_in_transaction(|| -> Result<MemberRecord, RegistryError> {
                let mut member = self
                    .members
                    .get_member(id)?
                    .ok_or(NotFoundError::Member(id))?;

                if let Some(member_code) = patch.member_code {
                    if member_code != member.member_code {
                        let holder = self.members.find_member_by_code(&member_code)?;
                        ensure_unclaimed(
                            holder.map(|other| other.id),
                            Some(id),
                            UniqueField::MemberCode,
                            &member_code,
                        )?;
                        member.member_code = member_code;
                    }
                }
                if let Some(email) = patch.email {
                    if email != member.email {
                        let holder = self.members.find_member_by_email(&email)?;
                        ensure_unclaimed(
                            holder.map(|other| other.id),
                            Some(id),
                            UniqueField::Email,
                            &email,
                        )?;
                        member.email = email;
                    }
                }

                let replacement = match patch.cohort_ids.as_deref() {
                    Some(requested) => Some(self.resolve_cohorts(requested)?),
                    None => None,
                };

                if let Some(family_name) = patch.family_name {
                    member.family_name = family_name;
                }
                if let Some(given_name) = patch.given_name {
                    member.given_name = given_name;
                }
                if let Some(active) = patch.active {
                    member.active = active;
                }
                member.updated_at = now_utc();

                self.members.update_member(&member)?;
                if let Some(cohort_ids) = replacement {
                    self.members.replace_cohort_ids(id, &cohort_ids)?;
                }
                self.load_record(id)
            })?;

        info!(
            "event=member_update module=member_service status=ok member_id={} cohort_count={}",
            record.member.id,
            record.cohort_ids.len()
        );
        Ok(record)
    }

    /// Removes the member and its membership edges.
    pub fn remove(&self, id: MemberId) -> Result<(), RegistryError> {
        self.members
            .run_in_transaction(|| -> Result<(), RegistryError> {
                self.members.delete_member(id)?;
                Ok(())
            })?;

        info!("event=member_remove module=member_service status=ok member_id={id}");
        self.publish_total();
        Ok(())
    }

    pub fn count(&self) -> Result<u64, RegistryError> {
        Ok(self.members.count_members()?)
    }

    pub fn count_by_cohort(&self, cohort_id: CohortId) -> Result<u64, RegistryError> {
        Ok(self.members.count_members_in_cohort(cohort_id)?)
    }

    /// Sets the same membership set on every listed member, all or nothing.
    ///
    /// Both id lists are resolved on their distinct values before any write;
    /// an unknown member or cohort id fails the call with `NotFound` and no
    /// membership set changes. Returns the affected members in
    /// first-occurrence order of `member_ids`.
    pub fn bulk_reassign(
        &self,
        member_ids: &[MemberId],
        cohort_ids: &[CohortId],
    ) -> Result<Vec<MemberRecord>, RegistryError> {
        let ordered_members = distinct_ids(member_ids);

        let records = self
            .members
            .run_in_transaction(|| -> Result<Vec<MemberRecord>, RegistryError> {
                let requested: BTreeSet<MemberId> = ordered_members.iter().copied().collect();
                let resolved = self.members.existing_member_ids(&requested)?;
                ensure_resolved(&requested, &resolved, |missing| {
                    NotFoundError::MembersMissing { missing }
                })?;

                let target = self.resolve_cohorts(cohort_ids)?;

                for member_id in &ordered_members {
                    self.members.replace_cohort_ids(*member_id, &target)?;
                }
                ordered_members
                    .iter()
                    .map(|member_id| self.load_record(*member_id))
                    .collect()
            })?;

        info!(
            "event=member_bulk_reassign module=member_service status=ok member_count={} cohort_count={}",
            records.len(),
            records.first().map_or(0, |record| record.cohort_ids.len())
        );
        Ok(records)
    }

    /// Publishes the current total once, e.g. right after startup.
    pub fn init_metrics(&self) {
        self.publish_total();
    }

    /// Resolves requested cohort ids, requiring every distinct id to exist.
    fn resolve_cohorts(&self, requested: &[CohortId]) -> Result<BTreeSet<CohortId>, RegistryError> {
        let requested: BTreeSet<CohortId> = requested.iter().copied().collect();
        let resolved = self.cohorts.existing_cohort_ids(&requested)?;
        ensure_resolved(&requested, &resolved, |missing| {
            NotFoundError::CohortsMissing { missing }
        })?;
        Ok(resolved)
    }

    fn load_record(&self, id: MemberId) -> Result<MemberRecord, RegistryError> {
        let member = self
            .members
            .get_member(id)?
            .ok_or(NotFoundError::Member(id))?;
        self.with_membership(member)
    }

    fn with_membership(&self, member: Member) -> Result<MemberRecord, RegistryError> {
        let cohort_ids = self.members.cohort_ids_of(member.id)?;
        Ok(MemberRecord { member, cohort_ids })
    }

    fn attach_memberships(&self, members: Vec<Member>) -> Result<Vec<MemberRecord>, RegistryError> {
        members
            .into_iter()
            .map(|member| self.with_membership(member))
            .collect()
    }

    fn publish_total(&self) {
        publish_count(
            self.metrics.as_ref(),
            EntityKind::Member,
            self.members.count_members(),
        );
    }
}
