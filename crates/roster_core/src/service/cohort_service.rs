//! Cohort registry.
//!
//! # Responsibility
//! - CRUD over cohorts, guarding the unique cohort name.
//! - Detach membership edges when a cohort is removed.
//!
//! # Invariants
//! - Listings are ordered by `year DESC, name ASC`.
//! - Removing a cohort never removes members.

use crate::model::cohort::{Cohort, CohortId, CohortPatch, CohortRecord, NewCohort};
use crate::model::now_utc;
use crate::repo::cohort_repo::CohortRepository;
use crate::repo::UnitOfWork;
use crate::service::consistency::ensure_unclaimed;
use crate::service::error::{NotFoundError, RegistryError, UniqueField};
use log::info;

/// Cohort registry facade over repository implementations.
pub struct CohortService<R: CohortRepository + UnitOfWork> {
    repo: R,
}

impl<R: CohortRepository + UnitOfWork> CohortService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one cohort unless its name is already taken.
    pub fn create(&self, input: NewCohort) -> Result<Cohort, RegistryError> {
        let cohort = self
            .repo
            .run_in_transaction(|| -> Result<Cohort, RegistryError> {
                let holder = self.repo.find_cohort_by_name(&input.name)?;
                ensure_unclaimed(
                    holder.map(|cohort| cohort.id),
                    None,
                    UniqueField::CohortName,
                    &input.name,
                )?;

                let cohort = Cohort::new(input);
                self.repo.insert_cohort(&cohort)?;
                Ok(cohort)
            })?;

        info!(
            "event=cohort_create module=cohort_service status=ok cohort_id={}",
            cohort.id
        );
        Ok(cohort)
    }

    pub fn find_all(&self) -> Result<Vec<Cohort>, RegistryError> {
        Ok(self.repo.list_cohorts(false)?)
    }

    pub fn find_active(&self) -> Result<Vec<Cohort>, RegistryError> {
        Ok(self.repo.list_cohorts(true)?)
    }

    /// Loads one cohort together with its current members.
    pub fn find_one(&self, id: CohortId) -> Result<CohortRecord, RegistryError> {
        let cohort = self
            .repo
            .get_cohort(id)?
            .ok_or(NotFoundError::Cohort(id))?;
        let members = self.repo.list_cohort_members(id)?;
        Ok(CohortRecord { cohort, members })
    }

    /// Applies a partial update; a changed name is re-checked for uniqueness.
    pub fn update(&self, id: CohortId, patch: CohortPatch) -> Result<Cohort, RegistryError> {
        let cohort = self
            .repo
            .run_in_transaction(|| -> Result<Cohort, RegistryError> {
                let mut cohort = self
                    .repo
                    .get_cohort(id)?
                    .ok_or(NotFoundError::Cohort(id))?;

                if let Some(name) = patch.name {
                    if name != cohort.name {
                        let holder = self.repo.find_cohort_by_name(&name)?;
                        ensure_unclaimed(
                            holder.map(|other| other.id),
                            Some(id),
                            UniqueField::CohortName,
                            &name,
                        )?;
                        cohort.name = name;
                    }
                }
                if let Some(description) = patch.description {
                    cohort.description = description;
                }
                if let Some(year) = patch.year {
                    cohort.year = year;
                }
                if let Some(active) = patch.active {
                    cohort.active = active;
                }
                cohort.updated_at = now_utc();

                self.repo.update_cohort(&cohort)?;
                Ok(cohort)
            })?;

        info!(
            "event=cohort_update module=cohort_service status=ok cohort_id={}",
            cohort.id
        );
        Ok(cohort)
    }

    /// Removes the cohort and detaches every membership edge pointing at it.
    pub fn remove(&self, id: CohortId) -> Result<(), RegistryError> {
        self.repo
            .run_in_transaction(|| -> Result<(), RegistryError> {
                self.repo.delete_cohort(id)?;
                Ok(())
            })?;

        info!("event=cohort_remove module=cohort_service status=ok cohort_id={id}");
        Ok(())
    }

    pub fn count(&self) -> Result<u64, RegistryError> {
        Ok(self.repo.count_cohorts()?)
    }
}
