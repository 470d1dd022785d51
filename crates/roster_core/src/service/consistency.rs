//! Check-then-act helpers used by every registry before mutating.
//!
//! # Responsibility
//! - Lookup-by-unique-key guard: a value may only be written when no other
//!   record already holds it.
//! - Referential resolution: a requested id set must resolve in full,
//!   computed on the distinct requested ids.
//!
//! # Invariants
//! - Callers run the check and the following write inside one
//!   `UnitOfWork::run_in_transaction` call.
//! - Each guarded field is checked independently and reports its own
//!   conflict.

use crate::service::error::{ConflictError, NotFoundError, RegistryError, UniqueField};
use log::debug;
use std::collections::BTreeSet;
use uuid::Uuid;

/// Fails with `Conflict::Taken` when `holder` is a record other than
/// `exclude`.
pub(crate) fn ensure_unclaimed(
    holder: Option<Uuid>,
    exclude: Option<Uuid>,
    field: UniqueField,
    value: &str,
) -> Result<(), RegistryError> {
    match holder {
        Some(holder_id) if Some(holder_id) != exclude => {
            debug!(
                "event=unique_guard module=consistency status=conflict field={}",
                field.as_str()
            );
            Err(ConflictError::Taken {
                field,
                value: value.to_string(),
            }
            .into())
        }
        _ => Ok(()),
    }
}

/// Collapses duplicate ids, keeping first-occurrence order.
pub(crate) fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Fails with the error built by `missing` unless every requested id
/// resolved.
pub(crate) fn ensure_resolved(
    requested: &BTreeSet<Uuid>,
    resolved: &BTreeSet<Uuid>,
    missing: impl FnOnce(Vec<Uuid>) -> NotFoundError,
) -> Result<(), RegistryError> {
    if resolved.len() == requested.len() {
        return Ok(());
    }

    let unresolved: Vec<Uuid> = requested.difference(resolved).copied().collect();
    debug!(
        "event=resolve_guard module=consistency status=not_found requested={} resolved={}",
        requested.len(),
        resolved.len()
    );
    Err(missing(unresolved).into())
}
