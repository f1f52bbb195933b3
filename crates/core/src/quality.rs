use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Outcome classification stored for every computed cell.
///
/// Persisted as its integer code. A cell that has never been computed has
/// no quality at all (`Option<Quality>::None` in the result grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Quality {
    /// Finite real value.
    Good = 0,
    /// Evaluation or extraction failed.
    Fatal = 1,
    /// Value was NaN.
    NotANumber = 2,
    /// Value was positive infinity.
    PosInfinity = 3,
    /// Value was negative infinity.
    NegInfinity = 4,
    /// Value had a non-zero imaginary part.
    Complex = 5,
}

impl Quality {
    /// Every quality code in ascending order.
    pub const ALL: [Quality; 6] = [
        Quality::Good,
        Quality::Fatal,
        Quality::NotANumber,
        Quality::PosInfinity,
        Quality::NegInfinity,
        Quality::Complex,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Special numeric outcomes (codes 2-5). Not failures.
    pub fn is_special(self) -> bool {
        !matches!(self, Quality::Good | Quality::Fatal)
    }

    /// Whether a cell at this state must be (re)computed on the next run.
    pub fn needs_compute(quality: Option<Quality>) -> bool {
        matches!(quality, None | Some(Quality::Fatal))
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.code()
    }
}

impl TryFrom<u8> for Quality {
    type Error = GridError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Quality::ALL
            .get(code as usize)
            .copied()
            .ok_or(GridError::InvalidQuality(code))
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Good => write!(f, "good"),
            Quality::Fatal => write!(f, "fatal"),
            Quality::NotANumber => write!(f, "NaN"),
            Quality::PosInfinity => write!(f, "+Inf"),
            Quality::NegInfinity => write!(f, "-Inf"),
            Quality::Complex => write!(f, "complex"),
        }
    }
}
