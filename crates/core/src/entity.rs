use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

pub type SeriesId = u64;
pub type OperationId = u64;
pub type MasterId = u64;

/// A time series under analysis: one row of the result matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub id: SeriesId,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub data: SeriesData,
}

impl TimeSeries {
    pub fn new(id: SeriesId, name: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            id,
            name: name.into(),
            keywords: Vec::new(),
            data: SeriesData::Vector(data),
        }
    }

    /// Number of samples, if the payload is one-dimensional.
    pub fn length(&self) -> Option<usize> {
        self.data.to_vector().ok().map(|(v, _)| v.len())
    }
}

/// Series payload as persisted.
///
/// A flat vector is the canonical form. Nested payloads come from matrix
/// oriented sources: an `n x 1` column is accepted as is, a `1 x n` row is
/// the transposed orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesData {
    Vector(Vec<f64>),
    Nested(Vec<Vec<f64>>),
}

/// How a payload was laid out before being read as a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Column,
    /// A single row; transposed back to a column.
    Transposed,
}

impl SeriesData {
    /// Read the payload as a one-dimensional sequence.
    pub fn to_vector(&self) -> Result<(Cow<'_, [f64]>, Orientation), ShapeError> {
        match self {
            SeriesData::Vector(v) => Ok((Cow::Borrowed(v.as_slice()), Orientation::Column)),
            SeriesData::Nested(rows) => {
                let width = rows.first().map(Vec::len).unwrap_or(0);
                if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                    return Err(ShapeError::Ragged {
                        row,
                        len: r.len(),
                        expected: width,
                    });
                }
                match (rows.len(), width) {
                    (_, 0) | (_, 1) => Ok((
                        Cow::Owned(rows.iter().flat_map(|r| r.iter().copied()).collect()),
                        Orientation::Column,
                    )),
                    (1, _) => Ok((Cow::Borrowed(rows[0].as_slice()), Orientation::Transposed)),
                    (n, w) => Err(ShapeError::MultiColumn { rows: n, cols: w }),
                }
            }
        }
    }
}

/// An expensive computation shared by one or more operations.
///
/// `code` names the computation and its arguments, e.g. `autocorr(y, 5)`.
/// `label` is the prefix operations use to refer to its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterOperation {
    pub id: MasterId,
    pub label: String,
    pub code: String,
}

/// A column of the result matrix: one named output of a master operation.
///
/// `code` is `<master label>.<output>`, or just `<master label>` when the
/// master declares a single output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub master_id: MasterId,
    pub code: String,
}

impl Operation {
    /// Split the code into master label and output field.
    pub fn code_parts(&self) -> (&str, Option<&str>) {
        match self.code.split_once('.') {
            Some((label, field)) => (label.trim(), Some(field.trim())),
            None => (self.code.trim(), None),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] ({})", self.name, self.id, self.code)
    }
}

impl std::fmt::Display for MasterOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] ({})", self.label, self.id, self.code)
    }
}
