pub mod algorithms;
pub mod catalog;
pub mod registry;
pub mod scheduler;

pub use catalog::{CatalogError, InputKind, MasterCode, ResolvedCatalog};
pub use registry::Registry;
pub use scheduler::{
    ComputeError, MasterOutput, ProgressReporter, RawValue, RunRequest, RunSummary, Scheduler,
    SchedulerConfig, SchedulerError, SharedComputation,
};
