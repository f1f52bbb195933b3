//! Name-to-implementation lookup for shared computations.
//!
//! Master operation codes name a computation and its arguments. The
//! registry maps the name to a factory that builds a configured
//! [`SharedComputation`] from the numeric arguments.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::algorithms::{autocorr, distribution, fourier, stationarity};
use crate::scheduler::task::{ComputeError, SharedComputation};

type Factory = Box<dyn Fn(&[f64]) -> Result<Arc<dyn SharedComputation>, ComputeError> + Send + Sync>;

/// A registered computation.
pub struct RegistryEntry {
    /// Call signature shown to users, e.g. `autocorr(x|y, max_lag)`.
    pub signature: &'static str,
    pub description: &'static str,
    factory: Factory,
}

impl RegistryEntry {
    /// Instantiate with the given arguments.
    pub fn build(&self, args: &[f64]) -> Result<Arc<dyn SharedComputation>, ComputeError> {
        (self.factory)(args)
    }
}

/// Lookup table of computation factories, keyed by name.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled computations.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register(
            distribution::NAME,
            "distribution(x|y)",
            "Location, spread and shape of the value distribution",
            |args| Ok(Arc::new(distribution::Distribution::from_args(args)?)),
        );
        r.register(
            autocorr::NAME,
            "autocorr(x|y, max_lag)",
            "Autocorrelation at lags 1..max_lag and its first zero crossing",
            |args| Ok(Arc::new(autocorr::AutoCorr::from_args(args)?)),
        );
        r.register(
            fourier::NAME,
            "fourier(x|y, k)",
            "Discrete Fourier coefficient k with its power and phase",
            |args| Ok(Arc::new(fourier::Fourier::from_args(args)?)),
        );
        r.register(
            stationarity::NAME,
            "stationarity(x|y, windows)",
            "Variation of mean and spread across non-overlapping windows",
            |args| Ok(Arc::new(stationarity::Stationarity::from_args(args)?)),
        );
        r
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, signature: &'static str, description: &'static str, factory: F)
    where
        F: Fn(&[f64]) -> Result<Arc<dyn SharedComputation>, ComputeError> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.to_string(),
            RegistryEntry {
                signature,
                description,
                factory: Box::new(factory),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    /// Registered entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
