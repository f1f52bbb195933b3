use std::time::Duration;

use chrono::{DateTime, Utc};
use tsgrid_core::{QualityCounts, SeriesId};
use uuid::Uuid;

use super::types::{RowReport, RunSummary};

/// Accumulated progress of one scheduler run.
///
/// Owned by the row driver and updated after each row; nothing here is
/// shared with workers.
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Rows in the work set.
    pub rows_total: usize,
    pub cells_selected: usize,
    /// Rows finished (processed or skipped).
    pub rows_done: usize,
    pub rows_processed: usize,
    pub rows_skipped: Vec<SeriesId>,
    pub counts: QualityCounts,
    /// Mean wall time of processed rows.
    pub mean_row_time: Duration,
    pub total_row_time: Duration,
    pub cancelled: bool,
}

impl RunState {
    pub fn new(rows_total: usize, cells_selected: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            rows_total,
            cells_selected,
            rows_done: 0,
            rows_processed: 0,
            rows_skipped: Vec::new(),
            counts: QualityCounts::default(),
            mean_row_time: Duration::ZERO,
            total_row_time: Duration::ZERO,
            cancelled: false,
        }
    }

    /// Record a processed row.
    pub fn record_row(&mut self, report: &RowReport) {
        self.rows_done += 1;
        self.rows_processed += 1;
        self.counts.merge(&report.counts);
        self.total_row_time += report.elapsed;

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let count = self.rows_processed as f64;
        let prev = self.mean_row_time.as_secs_f64();
        let cur = report.elapsed.as_secs_f64();
        self.mean_row_time = Duration::from_secs_f64((prev + (cur - prev) / count).max(0.0));
    }

    /// Record a row that was skipped without writing anything.
    pub fn record_skip(&mut self, series_id: SeriesId) {
        self.rows_done += 1;
        self.rows_skipped.push(series_id);
    }

    pub fn rows_remaining(&self) -> usize {
        self.rows_total.saturating_sub(self.rows_done)
    }

    /// Remaining rows times mean processed-row time. `None` until a row
    /// has been processed.
    pub fn eta(&self) -> Option<Duration> {
        if self.rows_processed == 0 {
            return None;
        }
        Some(self.mean_row_time.mul_f64(self.rows_remaining() as f64))
    }

    pub fn into_summary(self, elapsed: Duration) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            elapsed,
            rows_selected: self.rows_total,
            rows_processed: self.rows_processed,
            rows_skipped: self.rows_skipped,
            cells_selected: self.cells_selected,
            counts: self.counts,
            cancelled: self.cancelled,
        }
    }
}
