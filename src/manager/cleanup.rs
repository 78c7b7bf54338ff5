//! Reconciliation of the registry against the cluster.
//!
//! Records can outlive their pods: a terminal closed without teardown, a pod
//! evicted or deleted by hand. `StaleCleaner` drops those records. It never
//! deletes pods; a record whose pod still exists is kept even when its
//! session is gone, since stopping it is the operator's call.

use crate::error::{Error, Result};
use crate::kube::PodPhase;
use crate::tunnel::TunnelRecord;

use super::core::{as_dependency, TunnelManager};

/// Result of [`TunnelManager::cleanup_stale`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Records dropped from the registry, including unresolvable ones
    pub removed: Vec<TunnelRecord>,
    /// Records whose pod still exists
    pub kept: usize,
    /// Records that could not be probed, with the reason; also in `removed`
    pub warnings: Vec<(String, Error)>,
}

/// Short-lived helper constructed per `cleanup_stale` call.
pub(super) struct StaleCleaner<'a> {
    manager: &'a TunnelManager,
}

enum Verdict {
    Alive(PodPhase),
    Missing,
    Unresolvable(Error),
}

impl<'a> StaleCleaner<'a> {
    pub fn new(manager: &'a TunnelManager) -> Self {
        Self { manager }
    }

    async fn probe(&self, record: &TunnelRecord) -> Verdict {
        let environment = record.environment.as_str();
        if let Err(e) = self.manager.contexts.ensure_context(environment).await {
            return Verdict::Unresolvable(as_dependency("context switch", environment, e));
        }
        match self.manager.pods.phase(&record.pod_name).await {
            Ok(PodPhase::Missing) => Verdict::Missing,
            Ok(phase) => Verdict::Alive(phase),
            Err(e) => Verdict::Unresolvable(e),
        }
    }

    pub async fn run(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        for record in self.manager.registry.list() {
            match self.probe(&record).await {
                Verdict::Alive(phase) => {
                    tracing::debug!("keeping {}: pod {} is {}", record.id, record.pod_name, phase);
                    report.kept += 1;
                }
                Verdict::Missing => {
                    tracing::info!("removing stale tunnel {}: pod {} is gone", record.id, record.pod_name);
                    self.manager.registry.remove(&record.id)?;
                    report.removed.push(record);
                }
                Verdict::Unresolvable(e) => {
                    tracing::warn!("removing unresolvable tunnel {}: {}", record.id, e);
                    self.manager.registry.remove(&record.id)?;
                    report.warnings.push((record.id.clone(), e));
                    report.removed.push(record);
                }
            }
        }

        Ok(report)
    }
}

impl TunnelManager {
    /// Drop registry entries whose pod no longer exists or cannot be probed.
    pub async fn cleanup_stale(&self) -> Result<CleanupReport> {
        StaleCleaner::new(self).run().await
    }
}
