use crate::scheduler::task::{ComputeError, MasterOutput, SharedComputation};

use super::{expect_args, mean, require_len, std_dev};

pub const NAME: &str = "distribution";

const OUTPUTS: [&str; 8] = ["mean", "std", "skewness", "kurtosis", "min", "max", "median", "cv"];

/// Moments and order statistics of the value distribution.
///
/// `skewness` and `kurtosis` are population moments; a constant series
/// yields NaN for both. `cv` is std / |mean| and is infinite for a
/// zero-mean series.
pub struct Distribution {
    outputs: Vec<String>,
}

impl Distribution {
    pub fn from_args(args: &[f64]) -> Result<Self, ComputeError> {
        expect_args(args, 0, NAME)?;
        Ok(Self {
            outputs: OUTPUTS.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl SharedComputation for Distribution {
    fn name(&self) -> &str {
        NAME
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn evaluate(&self, x: &[f64]) -> Result<MasterOutput, ComputeError> {
        require_len(x, 2)?;
        let n = x.len() as f64;
        let m = mean(x);
        let sd = std_dev(x);

        let central = |p: i32| x.iter().map(|v| (v - m).powi(p)).sum::<f64>() / n;
        let m2 = central(2);
        let skewness = central(3) / m2.powf(1.5);
        let kurtosis = central(4) / (m2 * m2);

        let mut sorted = x.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Ok(MasterOutput::from_values([
            m,
            sd,
            skewness,
            kurtosis,
            sorted[0],
            sorted[sorted.len() - 1],
            median,
            sd / m.abs(),
        ]))
    }
}
