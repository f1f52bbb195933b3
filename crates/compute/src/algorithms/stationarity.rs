use crate::scheduler::task::{ComputeError, MasterOutput, SharedComputation};

use super::{expect_args, integer_arg, mean, require_len, std_dev};

pub const NAME: &str = "stationarity";

const OUTPUTS: [&str; 3] = ["std_of_means", "std_of_stds", "mean_range"];

/// Splits the series into equal, non-overlapping windows and measures how
/// much the local mean and spread move, relative to the global spread.
/// Trailing samples that do not fill a window are ignored.
pub struct Stationarity {
    windows: usize,
    outputs: Vec<String>,
}

impl Stationarity {
    pub fn new(windows: usize) -> Self {
        Self {
            windows,
            outputs: OUTPUTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_args(args: &[f64]) -> Result<Self, ComputeError> {
        expect_args(args, 1, NAME)?;
        Ok(Self::new(integer_arg(args[0], 2, "windows")?))
    }
}

impl SharedComputation for Stationarity {
    fn name(&self) -> &str {
        NAME
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn evaluate(&self, x: &[f64]) -> Result<MasterOutput, ComputeError> {
        require_len(x, self.windows.saturating_mul(2))?;
        let width = x.len() / self.windows;
        let global_sd = std_dev(x);

        let (means, stds): (Vec<f64>, Vec<f64>) = x
            .chunks_exact(width)
            .take(self.windows)
            .map(|w| (mean(w), std_dev(w)))
            .unzip();

        let max_mean = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_mean = means.iter().copied().fold(f64::INFINITY, f64::min);

        Ok(MasterOutput::from_values([
            std_dev(&means) / global_sd,
            std_dev(&stds) / global_sd,
            (max_mean - min_mean) / global_sd,
        ]))
    }
}
