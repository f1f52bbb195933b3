//! Persistence gateway for tsgrid bundles.
//!
//! A bundle is the unit the scheduler works on: the series rows, the
//! operation columns, their master operations and the result matrix. It is
//! loaded once, mutated in place by a run and written back atomically.

pub mod bundle;
pub mod error;
pub mod store;

pub use bundle::{Bundle, FORMAT_VERSION};
pub use error::StorageError;
pub use store::{BundleFormat, BundleStore};
