//! Work selection: which cells still need computing.

use std::collections::HashSet;

use tsgrid_core::{Grid, OperationId, Quality, SeriesId};

use super::types::RunRequest;

/// Selected columns of one matrix row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWork {
    pub row: usize,
    pub columns: Vec<usize>,
}

/// Cells requiring computation, grouped by row in row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSet {
    pub rows: Vec<RowWork>,
}

impl WorkSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.columns.len()).sum()
    }
}

/// Select cells whose row and column are requested and whose quality is
/// missing or fatal. Requested ids absent from the catalog are ignored.
pub fn select(
    series_ids: &[SeriesId],
    operation_ids: &[OperationId],
    request: &RunRequest,
    quality: &Grid<Option<Quality>>,
) -> WorkSet {
    let rows = requested_indices(series_ids, &request.series_ids);
    let cols = requested_indices(operation_ids, &request.operation_ids);

    let rows = rows
        .into_iter()
        .filter_map(|row| {
            let columns: Vec<usize> = cols
                .iter()
                .copied()
                .filter(|&col| {
                    quality
                        .get(row, col)
                        .is_some_and(|q| Quality::needs_compute(*q))
                })
                .collect();
            (!columns.is_empty()).then_some(RowWork { row, columns })
        })
        .collect();

    WorkSet { rows }
}

/// Positions of `catalog` entries that appear in `requested`, or every
/// position when nothing is requested.
fn requested_indices(catalog: &[u64], requested: &[u64]) -> Vec<usize> {
    if requested.is_empty() {
        return (0..catalog.len()).collect();
    }
    let wanted: HashSet<u64> = requested.iter().copied().collect();
    catalog
        .iter()
        .enumerate()
        .filter(|(_, id)| wanted.contains(id))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize, cells: &[(usize, usize, Quality)]) -> Grid<Option<Quality>> {
        let mut g = Grid::filled(rows, cols, None);
        for &(r, c, q) in cells {
            g.set(r, c, Some(q)).unwrap();
        }
        g
    }

    #[test]
    fn selects_missing_and_fatal_only() {
        let q = grid(
            2,
            3,
            &[
                (0, 0, Quality::Good),
                (0, 1, Quality::Fatal),
                (1, 0, Quality::NotANumber),
                (1, 1, Quality::Complex),
                (1, 2, Quality::Good),
            ],
        );
        let ws = select(&[10, 11], &[1, 2, 3], &RunRequest::all(), &q);
        assert_eq!(
            ws.rows,
            vec![RowWork {
                row: 0,
                columns: vec![1, 2]
            }]
        );
        assert_eq!(ws.cell_count(), 2);
    }

    #[test]
    fn requested_subsets_intersect_catalog() {
        let q = grid(3, 3, &[]);
        let request = RunRequest {
            series_ids: vec![12, 99],
            operation_ids: vec![3, 1, 42],
        };
        let ws = select(&[10, 11, 12], &[1, 2, 3], &request, &q);
        assert_eq!(
            ws.rows,
            vec![RowWork {
                row: 2,
                columns: vec![0, 2]
            }]
        );
    }

    #[test]
    fn unknown_ids_only_select_nothing() {
        let q = grid(1, 1, &[]);
        let request = RunRequest {
            series_ids: vec![7],
            operation_ids: vec![],
        };
        assert!(select(&[1], &[1], &request, &q).is_empty());
    }

    #[test]
    fn fully_successful_matrix_selects_nothing() {
        let q = grid(2, 2, &[
            (0, 0, Quality::Good),
            (0, 1, Quality::PosInfinity),
            (1, 0, Quality::NegInfinity),
            (1, 1, Quality::Good),
        ]);
        assert!(select(&[1, 2], &[1, 2], &RunRequest::all(), &q).is_empty());
    }
}
