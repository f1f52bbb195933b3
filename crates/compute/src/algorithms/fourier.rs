use std::f64::consts::PI;

use crate::scheduler::task::{ComputeError, MasterOutput, RawValue, SharedComputation};

use super::{expect_args, integer_arg, require_len};

pub const NAME: &str = "fourier";

const OUTPUTS: [&str; 3] = ["coef", "power", "phase"];

/// Single discrete Fourier coefficient.
///
/// `coef` is the complex coefficient X_k, `power` is |X_k|^2 / n and
/// `phase` is arg(X_k) in radians.
pub struct Fourier {
    k: usize,
    outputs: Vec<String>,
}

impl Fourier {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            outputs: OUTPUTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_args(args: &[f64]) -> Result<Self, ComputeError> {
        expect_args(args, 1, NAME)?;
        Ok(Self::new(integer_arg(args[0], 0, "k")?))
    }
}

impl SharedComputation for Fourier {
    fn name(&self) -> &str {
        NAME
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }

    fn evaluate(&self, x: &[f64]) -> Result<MasterOutput, ComputeError> {
        require_len(x, self.k.saturating_add(1))?;
        let n = x.len() as f64;
        let (mut re, mut im) = (0.0, 0.0);
        for (t, v) in x.iter().enumerate() {
            let angle = 2.0 * PI * (self.k * t) as f64 / n;
            re += v * angle.cos();
            im -= v * angle.sin();
        }
        Ok(MasterOutput::from_values([
            RawValue::Complex { re, im },
            RawValue::Real((re * re + im * im) / n),
            RawValue::Real(im.atan2(re)),
        ]))
    }
}
