//! Compute scheduler runner -- drives rows through selection, evaluation,
//! classification and write-back.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructors, and cancellation handles
//! - `execution`: the row loop and single-row processing
//! - `tests`: end-to-end behaviour over small in-memory catalogs

mod core;
mod execution;
#[cfg(test)]
mod tests;

pub use self::core::Scheduler;
