use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use tsgrid_core::{MasterOperation, Operation, OperationId, Quality, QualityCounts, ResultMatrix, SeriesId, TimeSeries};

use crate::error::StorageError;

/// Newest on-disk layout this build reads and the one it writes.
pub const FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

/// Everything a run reads and writes, persisted as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Time of the last save.
    pub modified_at: DateTime<Utc>,
    pub series: Vec<TimeSeries>,
    pub operations: Vec<Operation>,
    pub masters: Vec<MasterOperation>,
    pub results: ResultMatrix,
}

impl Bundle {
    /// New bundle with every cell in the never-computed state.
    pub fn new(series: Vec<TimeSeries>, operations: Vec<Operation>, masters: Vec<MasterOperation>) -> Self {
        let results = ResultMatrix::new(series.len(), operations.len());
        Self {
            format_version: FORMAT_VERSION,
            modified_at: Utc::now(),
            series,
            operations,
            masters,
            results,
        }
    }

    /// Check version, id uniqueness and result grid shapes.
    ///
    /// Catalog references (operation to master) are checked by the
    /// scheduler when it resolves the catalog.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.format_version > FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: self.format_version,
                supported: FORMAT_VERSION,
            });
        }
        unique("series", self.series.iter().map(|s| s.id))?;
        unique("operation", self.operations.iter().map(|o| o.id))?;
        unique("master operation", self.masters.iter().map(|m| m.id))?;
        self.results.validate(self.series.len(), self.operations.len())?;
        Ok(())
    }

    /// Return selected cells to the never-computed state.
    ///
    /// Empty id lists select everything; unknown ids are ignored. With
    /// `only` set, just the cells currently at that quality are reset.
    /// Returns the number of cells that changed.
    pub fn reset_cells(
        &mut self,
        series_ids: &[SeriesId],
        operation_ids: &[OperationId],
        only: Option<Quality>,
    ) -> Result<usize, StorageError> {
        let rows = positions(self.series.iter().map(|s| s.id), series_ids);
        let cols = positions(self.operations.iter().map(|o| o.id), operation_ids);

        let mut reset = 0;
        for &row in &rows {
            for &col in &cols {
                let current = self.results.quality.get(row, col).copied().flatten();
                let matches = match (current, only) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(q), Some(want)) => q == want,
                };
                if matches {
                    self.results.clear(row, col)?;
                    reset += 1;
                }
            }
        }
        info!(cells = reset, rows = rows.len(), cols = cols.len(), "Reset cells to never computed");
        Ok(reset)
    }

    /// Quality tally per operation column, in column order.
    pub fn counts_by_operation(&self) -> Vec<(&Operation, QualityCounts)> {
        self.operations
            .iter()
            .enumerate()
            .map(|(col, op)| {
                let mut counts = QualityCounts::default();
                for q in self.results.quality.column(col) {
                    counts.record(*q);
                }
                (op, counts)
            })
            .collect()
    }
}

fn unique(kind: &'static str, ids: impl Iterator<Item = u64>) -> Result<(), StorageError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(StorageError::DuplicateId { kind, id });
        }
    }
    Ok(())
}

fn positions(ids: impl Iterator<Item = u64>, wanted: &[u64]) -> Vec<usize> {
    let wanted: HashSet<u64> = wanted.iter().copied().collect();
    ids.enumerate()
        .filter(|(_, id)| wanted.is_empty() || wanted.contains(id))
        .map(|(idx, _)| idx)
        .collect()
}
