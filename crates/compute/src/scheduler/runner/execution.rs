use std::time::Instant;

use tracing::{debug, info, info_span, warn};
use tsgrid_core::{CellWrite, Orientation, QualityCounts, ResultMatrix, ShapeError, TimeSeries};

use crate::scheduler::dedup::group_by_master;
use crate::scheduler::executor::{evaluate_masters, extract_cells, Dispatch, RowInput};
use crate::scheduler::progress::ProgressReporter;
use crate::scheduler::selector::{select, RowWork};
use crate::scheduler::state::RunState;
use crate::scheduler::task::SchedulerError;
use crate::scheduler::types::{RowReport, RunRequest, RunSummary};

use super::Scheduler;

impl Scheduler {
    /// Fill every pending cell selected by `request`.
    ///
    /// Rows run strictly in order. Within a row, master evaluations (and
    /// then extractions) may fan out over the worker pool; the matrix is
    /// written only after the row's work has joined, and only at the
    /// selected cells. `checkpoint` is called every
    /// `checkpoint_every` processed rows; its failures are logged, not
    /// propagated. Cancellation is honoured between rows.
    pub fn run<F>(
        &self,
        series: &[TimeSeries],
        request: &RunRequest,
        results: &mut ResultMatrix,
        reporter: &mut ProgressReporter,
        mut checkpoint: F,
    ) -> Result<RunSummary, SchedulerError>
    where
        F: FnMut(&ResultMatrix) -> anyhow::Result<()>,
    {
        let start = Instant::now();
        results.validate(series.len(), self.catalog.num_operations())?;

        let series_ids: Vec<u64> = series.iter().map(|s| s.id).collect();
        let operation_ids: Vec<u64> = self.catalog.operations().iter().map(|o| o.id).collect();
        let work = select(&series_ids, &operation_ids, request, &results.quality);

        let mut state = RunState::new(work.rows.len(), work.cell_count());
        let span = info_span!("run", run_id = %state.run_id);
        let _guard = span.enter();
        reporter.run_started(&state);

        let pool = if self.config.parallel && !work.is_empty() {
            let threads = self.config.resolved_worker_threads();
            debug!(threads, "building worker pool");
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| SchedulerError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };
        let dispatch = match &pool {
            Some(p) => Dispatch::Pool(p),
            None => Dispatch::Sequential,
        };

        for (position, row_work) in work.rows.iter().enumerate() {
            if self.shutdown_requested() {
                warn!(
                    remaining = state.rows_remaining(),
                    "Cancellation requested, stopping before next row"
                );
                state.cancelled = true;
                break;
            }

            let ts = &series[row_work.row];
            match self.process_row(position, ts, row_work, dispatch) {
                Ok((cells, report)) => {
                    results.write_row(row_work.row, &cells)?;
                    state.record_row(&report);
                    reporter.row_finished(&report, &state);
                }
                Err(e) => {
                    warn!(series_id = ts.id, name = %ts.name, error = %e, "Skipping series with malformed data");
                    state.record_skip(ts.id);
                    reporter.row_skipped(ts.id, &ts.name, &e.to_string());
                    continue;
                }
            }

            let every = self.config.checkpoint_every;
            if every > 0 && state.rows_processed % every == 0 && state.rows_remaining() > 0 {
                debug!(rows = state.rows_processed, "checkpoint");
                if let Err(e) = checkpoint(results) {
                    warn!(error = %e, "Checkpoint failed, continuing");
                }
            }
        }

        let summary = state.into_summary(start.elapsed());
        reporter.run_finished(&summary);
        info!(
            processed = summary.rows_processed,
            skipped = summary.rows_skipped.len(),
            good = summary.counts.good(),
            errors = summary.counts.errors(),
            special = summary.counts.special(),
            cancelled = summary.cancelled,
            "Run complete in {:.1}s",
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// Compute one row's selected cells without touching the matrix.
    ///
    /// Returns the classified cells, or the shape error that makes the row
    /// unprocessable.
    pub(crate) fn process_row(
        &self,
        position: usize,
        ts: &TimeSeries,
        row_work: &RowWork,
        dispatch: Dispatch<'_>,
    ) -> Result<(Vec<CellWrite>, RowReport), ShapeError> {
        let start = Instant::now();

        let (data, orientation) = ts.data.to_vector()?;
        if orientation == Orientation::Transposed {
            warn!(series_id = ts.id, name = %ts.name, "Series data is a row vector, transposing");
        }
        let input = RowInput::new(data.into_owned());

        let groups = group_by_master(&row_work.columns, &self.catalog);
        let runs = evaluate_masters(&groups, &self.catalog, &input, dispatch);
        for run in &runs {
            if let Some(e) = &run.error {
                let master = self.catalog.master(run.master);
                warn!(
                    series_id = ts.id,
                    master_id = master.id,
                    master = %master.label,
                    error = %e,
                    "Master operation failed"
                );
            }
        }

        let cells = extract_cells(&groups, &runs, &self.catalog, dispatch);
        let mut counts = QualityCounts::default();
        for c in &cells {
            counts.record(Some(c.quality));
        }

        let report = RowReport {
            series_id: ts.id,
            series_name: ts.name.clone(),
            position,
            cells: cells.len(),
            masters: groups.len(),
            counts,
            elapsed: start.elapsed(),
        };
        Ok((cells, report))
    }
}
