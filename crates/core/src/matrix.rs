use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::quality::Quality;

/// Dense row-major 2-D container indexed by (row, column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `fill`.
    ///
    /// A shape whose cell count overflows `usize` fails the allocation
    /// rather than producing a short buffer.
    pub fn filled(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows.saturating_mul(cols)],
        }
    }
}

impl<T> Grid<T> {
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, GridError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(GridError::Length {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<(), GridError> {
        if row >= self.rows || col >= self.cols {
            return Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    /// All cells of one row, in column order.
    pub fn row(&self, row: usize) -> &[T] {
        if row >= self.rows {
            return &[];
        }
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Iterate over one column, in row order.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &T> + '_ {
        let cols = self.cols;
        self.data
            .iter()
            .skip(col)
            .step_by(cols.max(1))
            .take(if col < cols { self.rows } else { 0 })
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    /// Check the stored buffer against the declared shape. Needed after
    /// deserializing from an untrusted bundle.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.rows.checked_mul(self.cols) != Some(self.data.len()) {
            return Err(GridError::Length {
                rows: self.rows,
                cols: self.cols,
                len: self.data.len(),
            });
        }
        Ok(())
    }
}

/// The three parallel result containers: stored value, calculation time
/// in seconds, and quality code. `None` marks a cell that has never been
/// computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMatrix {
    pub values: Grid<Option<f64>>,
    pub calc_times: Grid<Option<f64>>,
    pub quality: Grid<Option<Quality>>,
}

/// One classified cell ready to be written back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellWrite {
    pub col: usize,
    pub value: f64,
    pub calc_time: f64,
    pub quality: Quality,
}

impl ResultMatrix {
    /// Empty matrix where every cell is in the never-computed state.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            values: Grid::filled(rows, cols, None),
            calc_times: Grid::filled(rows, cols, None),
            quality: Grid::filled(rows, cols, None),
        }
    }

    pub fn rows(&self) -> usize {
        self.quality.rows()
    }

    pub fn cols(&self) -> usize {
        self.quality.cols()
    }

    /// Verify that all three grids are well formed and shaped `rows x cols`.
    pub fn validate(&self, rows: usize, cols: usize) -> Result<(), GridError> {
        check_shape("values", &self.values, rows, cols)?;
        check_shape("calc_times", &self.calc_times, rows, cols)?;
        check_shape("quality", &self.quality, rows, cols)?;
        Ok(())
    }

    /// Write classified cells of a single row.
    pub fn write_row(&mut self, row: usize, cells: &[CellWrite]) -> Result<(), GridError> {
        for cell in cells {
            self.values.set(row, cell.col, Some(cell.value))?;
            self.calc_times.set(row, cell.col, Some(cell.calc_time))?;
            self.quality.set(row, cell.col, Some(cell.quality))?;
        }
        Ok(())
    }

    /// Return a cell to the never-computed state.
    pub fn clear(&mut self, row: usize, col: usize) -> Result<(), GridError> {
        self.values.set(row, col, None)?;
        self.calc_times.set(row, col, None)?;
        self.quality.set(row, col, None)?;
        Ok(())
    }

    /// Count of cells per quality code, plus the never-computed count.
    pub fn quality_counts(&self) -> QualityCounts {
        let mut counts = QualityCounts::default();
        for q in self.quality.iter() {
            counts.record(*q);
        }
        counts
    }
}

fn check_shape<T>(name: &'static str, grid: &Grid<T>, rows: usize, cols: usize) -> Result<(), GridError> {
    grid.validate()?;
    if grid.rows() != rows || grid.cols() != cols {
        return Err(GridError::Dimension {
            grid: name,
            expected_rows: rows,
            expected_cols: cols,
            rows: grid.rows(),
            cols: grid.cols(),
        });
    }
    Ok(())
}

/// Tally of cell states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityCounts {
    /// Indexed by quality code.
    pub by_code: [u64; 6],
    pub never_computed: u64,
}

impl QualityCounts {
    pub fn record(&mut self, quality: Option<Quality>) {
        match quality {
            Some(q) => self.by_code[q.code() as usize] += 1,
            None => self.never_computed += 1,
        }
    }

    pub fn get(&self, quality: Quality) -> u64 {
        self.by_code[quality.code() as usize]
    }

    pub fn good(&self) -> u64 {
        self.get(Quality::Good)
    }

    pub fn errors(&self) -> u64 {
        self.get(Quality::Fatal)
    }

    pub fn special(&self) -> u64 {
        self.by_code[2..].iter().sum()
    }

    pub fn computed(&self) -> u64 {
        self.by_code.iter().sum()
    }

    pub fn merge(&mut self, other: &QualityCounts) {
        for (a, b) in self.by_code.iter_mut().zip(other.by_code.iter()) {
            *a += b;
        }
        self.never_computed += other.never_computed;
    }
}
