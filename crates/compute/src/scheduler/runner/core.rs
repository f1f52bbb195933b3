use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;
use tsgrid_core::{MasterOperation, Operation};

use crate::catalog::ResolvedCatalog;
use crate::registry::Registry;
use crate::scheduler::task::SchedulerError;
use crate::scheduler::types::SchedulerConfig;

/// The compute scheduler. Fills pending cells of a result matrix row by
/// row, evaluating each master operation once per row.
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    /// Resolved lookup tables, read-only during a run.
    pub(super) catalog: ResolvedCatalog,
    /// Cooperative cancellation, checked between rows.
    pub(super) shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    /// Create a scheduler over an already resolved catalog.
    pub fn new(config: SchedulerConfig, catalog: ResolvedCatalog) -> Self {
        info!(
            "Scheduler ready: {} operations over {} master operations (parallel: {})",
            catalog.num_operations(),
            catalog.masters().len(),
            config.parallel
        );
        Self {
            config,
            catalog,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Resolve the catalog against `registry` and create a scheduler.
    /// Fails on any catalog integrity problem.
    pub fn from_catalog(
        config: SchedulerConfig,
        operations: &[Operation],
        masters: &[MasterOperation],
        registry: &Registry,
    ) -> Result<Self, SchedulerError> {
        let catalog = ResolvedCatalog::resolve(operations, masters, registry)?;
        Ok(Self::new(config, catalog))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ResolvedCatalog {
        &self.catalog
    }

    /// Ask the running loop to stop after the current row.
    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Get an Arc to the shutdown flag (for external shutdown signaling).
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub(super) fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
