//! Maps raw outcomes to a stored value and quality code.

use tsgrid_core::Quality;

use super::task::RawValue;

/// Sanitized value and quality for one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classified {
    pub value: f64,
    pub quality: Quality,
}

impl Classified {
    fn flagged(quality: Quality) -> Self {
        Self { value: 0.0, quality }
    }
}

/// Classify an outcome. `None` means evaluation or extraction failed.
///
/// Precedence: failure, NaN (in either part), infinite real part,
/// non-zero imaginary part, then success. Only successes keep their value.
pub fn classify(outcome: Option<RawValue>) -> Classified {
    let (re, im) = match outcome {
        None => return Classified::flagged(Quality::Fatal),
        Some(RawValue::Real(v)) => (v, 0.0),
        Some(RawValue::Complex { re, im }) => (re, im),
    };

    if re.is_nan() || im.is_nan() {
        Classified::flagged(Quality::NotANumber)
    } else if re == f64::INFINITY {
        Classified::flagged(Quality::PosInfinity)
    } else if re == f64::NEG_INFINITY {
        Classified::flagged(Quality::NegInfinity)
    } else if im != 0.0 {
        Classified::flagged(Quality::Complex)
    } else {
        Classified {
            value: re,
            quality: Quality::Good,
        }
    }
}
