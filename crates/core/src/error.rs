use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Dimension mismatch in {grid}: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    Dimension {
        grid: &'static str,
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid data length {len} does not match {rows}x{cols}")]
    Length { rows: usize, cols: usize, len: usize },

    #[error("Cell ({row}, {col}) out of bounds for {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid quality code: {0}")]
    InvalidQuality(u8),
}

/// A series payload that cannot be read as a one-dimensional sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("data has {rows} rows and {cols} columns, expected a single column")]
    MultiColumn { rows: usize, cols: usize },

    #[error("data rows have unequal lengths (row {row} has {len}, expected {expected})")]
    Ragged {
        row: usize,
        len: usize,
        expected: usize,
    },
}
