//! Count notification contract towards an external metrics sink.
//!
//! # Invariants
//! - Notification is fire-and-forget: a failing sink never fails the
//!   registry operation that triggered it.

use crate::repo::RepoResult;
use log::warn;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

/// Entity kinds whose totals are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Identity,
    Cohort,
    Member,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Cohort => "cohort",
            Self::Member => "member",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsError(pub String);

impl Display for MetricsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "metrics sink failed: {}", self.0)
    }
}

impl Error for MetricsError {}

/// Receives current entity totals after committed mutations.
pub trait MetricsNotifier: Send + Sync {
    fn set_count(&self, kind: EntityKind, count: u64) -> Result<(), MetricsError>;
}

/// Sink that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsNotifier for NoopMetrics {
    fn set_count(&self, _kind: EntityKind, _count: u64) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Gauge-style sink keeping the latest count per entity kind.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    gauges: Mutex<HashMap<EntityKind, u64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last published count, if any.
    pub fn gauge(&self, kind: EntityKind) -> Option<u64> {
        self.gauges.lock().ok()?.get(&kind).copied()
    }
}

impl MetricsNotifier for InMemoryMetrics {
    fn set_count(&self, kind: EntityKind, count: u64) -> Result<(), MetricsError> {
        let mut gauges = self
            .gauges
            .lock()
            .map_err(|_| MetricsError("gauge lock poisoned".to_string()))?;
        gauges.insert(kind, count);
        Ok(())
    }
}

/// Publishes a freshly read count, logging instead of propagating failures.
pub(crate) fn publish_count(
    notifier: &dyn MetricsNotifier,
    kind: EntityKind,
    count: RepoResult<u64>,
) {
    let count = match count {
        Ok(count) => count,
        Err(err) => {
            warn!(
                "event=metrics_publish module=metrics status=error kind={} error_code=count_failed error={err}",
                kind.as_str()
            );
            return;
        }
    };

    if let Err(err) = notifier.set_count(kind, count) {
        warn!(
            "event=metrics_publish module=metrics status=error kind={} count={count} error_code=sink_failed error={err}",
            kind.as_str()
        );
    }
}
