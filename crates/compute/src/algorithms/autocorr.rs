use crate::scheduler::task::{ComputeError, MasterOutput, SharedComputation};

use super::{expect_args, integer_arg, mean, require_len};

pub const NAME: &str = "autocorr";

/// Autocorrelation function summary.
///
/// Outputs `ac_1..ac_<max_lag>`, then `first_zero` (first lag where the
/// autocorrelation drops to or below zero, or the series length if it never
/// does) and `first_min` (first local minimum, NaN when there is none).
pub struct AutoCorr {
    max_lag: usize,
    outputs: Vec<String>,
}

impl AutoCorr {
    pub fn new(max_lag: usize) -> Self {
        let mut outputs: Vec<String> = (1..=max_lag).map(|k| format!("ac_{}", k)).collect();
        outputs.push("first_zero".to_string());
        outputs.push("first_min".to_string());
        Self { max_lag, outputs }
    }

    pub fn from_args(args: &[f64]) -> Result<Self, ComputeError> {
        expect_args(args, 1, NAME)?;
        Ok(Self::new(integer_arg(args[0], 1, "max_lag")?))
    }
}

/// Autocorrelation at lags 0..n-1. NaN everywhere for a constant series.
pub fn acf(x: &[f64]) -> Vec<f64> {
    let m = mean(x);
    let dev: Vec<f64> = x.iter().map(|v| v - m).collect();
    let denom: f64 = dev.iter().map(|d| d * d).sum();
    (0..x.len())
        .map(|k| {
            let num: f64 = dev.iter().zip(&dev[k..]).map(|(a, b)| a * b).sum();
            num / denom
        })
        .collect()
}

impl SharedComputation for AutoCorr {
    fn name(&self) -> &str {
        NAME
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn evaluate(&self, x: &[f64]) -> Result<MasterOutput, ComputeError> {
        require_len(x, self.max_lag.saturating_add(1))?;
        let ac = acf(x);

        let mut out = MasterOutput::empty(self.outputs.len());
        for k in 1..=self.max_lag {
            out.set(k - 1, ac[k]);
        }

        let first_zero = (1..ac.len()).find(|&k| ac[k] <= 0.0).unwrap_or(x.len());
        out.set(self.max_lag, first_zero as f64);

        let first_min = (1..ac.len().saturating_sub(1))
            .find(|&k| ac[k] < ac[k - 1] && ac[k] <= ac[k + 1])
            .map(|k| k as f64)
            .unwrap_or(f64::NAN);
        out.set(self.max_lag.saturating_add(1), first_min);

        Ok(out)
    }
}
