//! Identity registry.
//!
//! # Responsibility
//! - CRUD over staff identities.
//! - Guard the unique, normalized wallet address.
//! - Publish the identity total after committed creates/removals.
//!
//! # Invariants
//! - Wallet addresses are validated on the raw input (checksum is
//!   case-sensitive) and persisted lowercase.
//! - Check and write run in one unit of work.

use crate::metrics::{publish_count, EntityKind, MetricsNotifier, NoopMetrics};
use crate::model::identity::{Identity, IdentityId, IdentityPatch, IdentityRole, NewIdentity};
use crate::model::now_utc;
use crate::model::wallet::{is_valid_wallet_address, normalize_wallet_address};
use crate::repo::identity_repo::IdentityRepository;
use crate::repo::UnitOfWork;
use crate::service::consistency::ensure_unclaimed;
use crate::service::error::{ConflictError, NotFoundError, RegistryError, UniqueField};
use log::info;
use std::sync::Arc;

/// Identity registry facade over repository implementations.
pub struct IdentityService<R: IdentityRepository + UnitOfWork> {
    repo: R,
    metrics: Arc<dyn MetricsNotifier>,
}

impl<R: IdentityRepository + UnitOfWork> IdentityService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Routes count notifications to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsNotifier>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Creates one identity after wallet format and uniqueness checks.
    pub fn create(&self, input: NewIdentity) -> Result<Identity, RegistryError> {
        if !is_valid_wallet_address(&input.wallet_address) {
            return Err(ConflictError::InvalidWalletAddress(input.wallet_address).into());
        }
        let wallet_address = normalize_wallet_address(&input.wallet_address);

        let identity = self
            .repo
            .run_in_transaction(|| -> Result<Identity, RegistryError> {
                let holder = self.repo.find_identity_by_wallet(&wallet_address)?;
                ensure_unclaimed(
                    holder.map(|identity| identity.id),
                    None,
                    UniqueField::WalletAddress,
                    &wallet_address,
                )?;

                let identity = Identity::new(input, wallet_address.clone());
                self.repo.insert_identity(&identity)?;
                Ok(identity)
            })?;

        info!(
            "event=identity_create module=identity_service status=ok identity_id={}",
            identity.id
        );
        self.publish_total();
        Ok(identity)
    }

    /// Lists all identities, newest first.
    pub fn find_all(&self) -> Result<Vec<Identity>, RegistryError> {
        Ok(self.repo.list_identities(None)?)
    }

    pub fn find_one(&self, id: IdentityId) -> Result<Identity, RegistryError> {
        self.repo
            .get_identity(id)?
            .ok_or_else(|| NotFoundError::Identity(id).into())
    }

    /// Looks an identity up by wallet address, case-insensitively.
    pub fn find_by_wallet(&self, wallet_address: &str) -> Result<Identity, RegistryError> {
        let normalized = normalize_wallet_address(wallet_address);
        self.repo
            .find_identity_by_wallet(&normalized)?
            .ok_or_else(|| NotFoundError::IdentityWallet(wallet_address.to_string()).into())
    }

    /// Applies a partial update. A supplied wallet is always validated; only
    /// a changed one is re-checked for uniqueness against other identities.
    pub fn update(&self, id: IdentityId, patch: IdentityPatch) -> Result<Identity, RegistryError> {
        let identity = self
            .repo
            .run_in_transaction(|| -> Result<Identity, RegistryError> {
                let mut identity = self
                    .repo
                    .get_identity(id)?
                    .ok_or(NotFoundError::Identity(id))?;

                if let Some(raw_address) = patch.wallet_address {
                    if !is_valid_wallet_address(&raw_address) {
                        return Err(ConflictError::InvalidWalletAddress(raw_address).into());
                    }
                    let normalized = normalize_wallet_address(&raw_address);
                    if normalized != identity.wallet_address {
                        let holder = self.repo.find_identity_by_wallet(&normalized)?;
                        ensure_unclaimed(
                            holder.map(|other| other.id),
                            Some(id),
                            UniqueField::WalletAddress,
                            &normalized,
                        )?;
                        identity.wallet_address = normalized;
                    }
                }
                if let Some(family_name) = patch.family_name {
                    identity.family_name = family_name;
                }
                if let Some(given_name) = patch.given_name {
                    identity.given_name = given_name;
                }
                if let Some(role) = patch.role {
                    identity.role = role;
                }
                if let Some(active) = patch.active {
                    identity.active = active;
                }
                identity.updated_at = now_utc();

                self.repo.update_identity(&identity)?;
                Ok(identity)
            })?;

        info!(
            "event=identity_update module=identity_service status=ok identity_id={}",
            identity.id
        );
        Ok(identity)
    }

    pub fn remove(&self, id: IdentityId) -> Result<(), RegistryError> {
        self.repo
            .run_in_transaction(|| -> Result<(), RegistryError> {
                self.repo.delete_identity(id)?;
                Ok(())
            })?;

        info!("event=identity_remove module=identity_service status=ok identity_id={id}");
        self.publish_total();
        Ok(())
    }

    pub fn count(&self) -> Result<u64, RegistryError> {
        Ok(self.repo.count_identities()?)
    }

    /// Lists identities holding `role`, newest first.
    pub fn find_by_role(&self, role: IdentityRole) -> Result<Vec<Identity>, RegistryError> {
        Ok(self.repo.list_identities(Some(role))?)
    }

    /// Publishes the current total once, e.g. right after startup.
    pub fn init_metrics(&self) {
        self.publish_total();
    }

    fn publish_total(&self) {
        publish_count(
            self.metrics.as_ref(),
            EntityKind::Identity,
            self.repo.count_identities(),
        );
    }
}
