//! Built-in shared computations.
//!
//! Each module exposes a `NAME` used in master operation codes and a type
//! implementing [`SharedComputation`](crate::scheduler::task::SharedComputation).

pub mod autocorr;
pub mod distribution;
pub mod fourier;
pub mod stationarity;

use crate::scheduler::task::ComputeError;

pub(crate) fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub(crate) fn std_dev(x: &[f64]) -> f64 {
    let m = mean(x);
    let ss: f64 = x.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (x.len() as f64 - 1.0)).sqrt()
}

pub(crate) fn require_len(x: &[f64], needed: usize) -> Result<(), ComputeError> {
    if x.len() < needed {
        return Err(ComputeError::TooShort {
            needed,
            got: x.len(),
        });
    }
    Ok(())
}

/// Read exactly `count` arguments.
pub(crate) fn expect_args(args: &[f64], count: usize, name: &str) -> Result<(), ComputeError> {
    if args.len() != count {
        return Err(ComputeError::InvalidArgument(format!(
            "{} takes {} argument(s), got {}",
            name,
            count,
            args.len()
        )));
    }
    Ok(())
}

/// Largest integer argument (lag, window count, frequency index) any
/// built-in accepts. Keeps output lists and length checks bounded.
pub const MAX_INTEGER_ARG: usize = 1 << 20;

/// Interpret an argument as an integer in `min..=MAX_INTEGER_ARG`.
pub(crate) fn integer_arg(value: f64, min: usize, what: &str) -> Result<usize, ComputeError> {
    if !value.is_finite() || value.fract() != 0.0 || value < min as f64 || value > MAX_INTEGER_ARG as f64 {
        return Err(ComputeError::InvalidArgument(format!(
            "{} must be an integer in {}..={}, got {}",
            what, min, MAX_INTEGER_ARG, value
        )));
    }
    Ok(value as usize)
}
