/// Error type for shared computation evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputeError {
    #[error("Computation failed: {0}")]
    Failed(String),
    #[error("Input too short: need at least {needed} samples, got {got}")]
    TooShort { needed: usize, got: usize },
    #[error("Computation panicked: {0}")]
    Panicked(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Run-aborting scheduler failure.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Catalog integrity error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),
    #[error("Result matrix error: {0}")]
    Grid(#[from] tsgrid_core::GridError),
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Raw numeric outcome of a single output field, before classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    Real(f64),
    Complex { re: f64, im: f64 },
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Real(v)
    }
}

/// Output of one evaluation of a shared computation.
///
/// Slots line up with [`SharedComputation::outputs`]. A `None` slot means
/// the computation did not produce that field for this input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterOutput {
    fields: Vec<Option<RawValue>>,
}

impl MasterOutput {
    /// Output with `width` empty slots.
    pub fn empty(width: usize) -> Self {
        Self {
            fields: vec![None; width],
        }
    }

    /// Build an output from values in declared order.
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        Self {
            fields: values.into_iter().map(|v| Some(v.into())).collect(),
        }
    }

    pub fn set(&mut self, field: usize, value: impl Into<RawValue>) {
        if field >= self.fields.len() {
            self.fields.resize(field + 1, None);
        }
        self.fields[field] = Some(value.into());
    }

    pub fn get(&self, field: usize) -> Option<RawValue> {
        self.fields.get(field).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An expensive computation evaluated once per series and shared by every
/// operation that reads one of its outputs.
///
/// Implementations must be pure with respect to their input: the same
/// slice is handed to many workers concurrently.
pub trait SharedComputation: Send + Sync {
    /// Registry name, used in master operation codes.
    fn name(&self) -> &str;

    /// Declared output fields. Operations resolve against these names.
    fn outputs(&self) -> &[String];

    /// Evaluate on one series.
    fn evaluate(&self, series: &[f64]) -> Result<MasterOutput, ComputeError>;
}
