//! Per-row progress and completion estimates.
//!
//! Purely observational: write failures are logged and dropped.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use super::state::RunState;
use super::types::{RowReport, RunSummary};

pub struct ProgressReporter {
    verbose: bool,
    sink: Option<Box<dyn Write + Send>>,
}

impl ProgressReporter {
    /// Report through `tracing`.
    pub fn new(verbose: bool) -> Self {
        Self { verbose, sink: None }
    }

    /// Append progress text to a file instead of logging it.
    pub fn to_file(path: &Path, verbose: bool) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::with_writer(Box::new(file), verbose))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>, verbose: bool) -> Self {
        Self {
            verbose,
            sink: Some(writer),
        }
    }

    pub fn run_started(&mut self, state: &RunState) {
        if state.rows_total == 0 {
            self.emit("Nothing to compute: every requested cell already has a result".to_string());
            return;
        }
        self.emit(format!(
            "Run {} started: {} cells across {} series",
            state.run_id, state.cells_selected, state.rows_total
        ));
    }

    pub fn row_finished(&mut self, report: &RowReport, state: &RunState) {
        if !self.verbose {
            return;
        }
        let eta = state
            .eta()
            .map(format_duration)
            .unwrap_or_else(|| "unknown".to_string());
        self.emit(format!(
            "[{}/{}] {} (id {}): {} cells from {} masters in {}: {} good, {} errors, {} special. Remaining ~{}",
            report.position + 1,
            state.rows_total,
            report.series_name,
            report.series_id,
            report.cells,
            report.masters,
            format_duration(report.elapsed),
            report.counts.good(),
            report.counts.errors(),
            report.counts.special(),
            eta
        ));
    }

    pub fn row_skipped(&mut self, series_id: u64, series_name: &str, reason: &str) {
        self.emit(format!(
            "Skipped {} (id {}): {}. Its cells stay pending",
            series_name, series_id, reason
        ));
    }

    pub fn run_finished(&mut self, summary: &RunSummary) {
        let status = if summary.cancelled { "cancelled" } else { "finished" };
        self.emit(format!(
            "Run {} {} in {}: {} of {} series processed, {} skipped; {} cells written ({} good, {} errors, {} special)",
            summary.run_id,
            status,
            format_duration(summary.elapsed),
            summary.rows_processed,
            summary.rows_selected,
            summary.rows_skipped.len(),
            summary.cells_written(),
            summary.counts.good(),
            summary.counts.errors(),
            summary.counts.special()
        ));
    }

    fn emit(&mut self, line: String) {
        match self.sink.as_mut() {
            Some(w) => {
                if let Err(e) = writeln!(w, "{}", line).and_then(|_| w.flush()) {
                    debug!(error = %e, "progress write failed");
                }
            }
            None => info!("{}", line),
        }
    }
}

/// Compact human readable duration, e.g. `1h 02m 03s` or `850ms`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
