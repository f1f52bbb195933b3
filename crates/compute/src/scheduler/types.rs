use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tsgrid_core::{OperationId, QualityCounts, SeriesId};
use uuid::Uuid;

/// Scheduler configuration, typically parsed from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fan master evaluations and extractions out over a worker pool.
    #[serde(default)]
    pub parallel: bool,
    /// Number of worker threads. 0 = num_cpus.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Invoke the checkpoint callback after this many processed rows. 0 = never.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
}

fn default_worker_threads() -> usize { 0 }
fn default_checkpoint_every() -> usize { 0 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            worker_threads: default_worker_threads(),
            checkpoint_every: default_checkpoint_every(),
        }
    }
}

impl SchedulerConfig {
    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }
}

/// Which part of the matrix a run should consider. Empty lists mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub series_ids: Vec<SeriesId>,
    #[serde(default)]
    pub operation_ids: Vec<OperationId>,
}

impl RunRequest {
    pub fn all() -> Self {
        Self::default()
    }
}

/// Per-row result handed to the progress reporter.
#[derive(Debug, Clone)]
pub struct RowReport {
    pub series_id: SeriesId,
    pub series_name: String,
    /// Position of this row in the work set (0-based).
    pub position: usize,
    pub cells: usize,
    pub masters: usize,
    pub counts: QualityCounts,
    pub elapsed: Duration,
}

/// Outcome of a full scheduler run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Rows with at least one selected cell.
    pub rows_selected: usize,
    pub rows_processed: usize,
    /// Rows skipped because their payload was not one-dimensional.
    pub rows_skipped: Vec<SeriesId>,
    pub cells_selected: usize,
    pub counts: QualityCounts,
    /// Set when cancellation stopped the run before all rows were processed.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn cells_written(&self) -> u64 {
        self.counts.computed()
    }
}
