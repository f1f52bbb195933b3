//! Row-ordered compute scheduler with shared master evaluation.
//!
//! The scheduler walks the pending cells of a [`tsgrid_core::ResultMatrix`]
//! one series at a time. Within a row, every master operation referenced
//! by a selected cell is evaluated exactly once and its outputs are fanned
//! out to the dependent operations, optionally on a rayon worker pool.
//! Results are classified into quality codes and written back only after
//! the row completes, so a cancelled run never leaves a half-written row.

pub mod classify;
pub mod dedup;
pub mod executor;
pub mod progress;
pub mod runner;
pub mod selector;
pub mod state;
pub mod task;
pub mod types;

pub use classify::{classify, Classified};
pub use progress::ProgressReporter;
pub use runner::Scheduler;
pub use selector::{select, RowWork, WorkSet};
pub use state::RunState;
pub use task::{ComputeError, MasterOutput, RawValue, SchedulerError, SharedComputation};
pub use types::{RowReport, RunRequest, RunSummary, SchedulerConfig};
