//! Row execution: evaluate each master operation once, then extract and
//! classify one value per selected operation.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use tsgrid_core::CellWrite;

use crate::catalog::{InputKind, ResolvedCatalog, ResolvedMaster};

use super::classify::classify;
use super::dedup::MasterGroup;
use super::task::{ComputeError, MasterOutput};

/// Read-only inputs shared by every master evaluation of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowInput {
    pub raw: Vec<f64>,
    pub normalized: Vec<f64>,
}

impl RowInput {
    pub fn new(raw: Vec<f64>) -> Self {
        let normalized = zscore(&raw);
        Self { raw, normalized }
    }

    pub fn view(&self, kind: InputKind) -> &[f64] {
        match kind {
            InputKind::Raw => &self.raw,
            InputKind::Normalized => &self.normalized,
        }
    }
}

/// Standardize to zero mean and unit sample standard deviation. A series
/// with no spread maps to all zeros.
pub fn zscore(x: &[f64]) -> Vec<f64> {
    if x.len() < 2 {
        return vec![0.0; x.len()];
    }
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let sd = (x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    if sd == 0.0 || !sd.is_finite() {
        return vec![0.0; x.len()];
    }
    x.iter().map(|v| (v - mean) / sd).collect()
}

/// How work inside a row is dispatched.
#[derive(Clone, Copy)]
pub enum Dispatch<'a> {
    Sequential,
    Pool(&'a ThreadPool),
}

/// Result of evaluating one master operation on one row.
#[derive(Debug, Clone)]
pub struct MasterRun {
    pub master: usize,
    /// `None` when evaluation failed.
    pub output: Option<MasterOutput>,
    /// Wall time until completion or failure.
    pub elapsed: Duration,
    pub error: Option<ComputeError>,
}

/// Evaluate each group's master once. Failures and panics are contained
/// per master. Results are in `groups` order.
pub fn evaluate_masters(
    groups: &[MasterGroup],
    catalog: &ResolvedCatalog,
    input: &RowInput,
    dispatch: Dispatch<'_>,
) -> Vec<MasterRun> {
    let run = |g: &MasterGroup| evaluate_master(g.master, catalog.master(g.master), input);
    match dispatch {
        Dispatch::Sequential => groups.iter().map(run).collect(),
        Dispatch::Pool(pool) => pool.install(|| groups.par_iter().map(run).collect()),
    }
}

fn evaluate_master(idx: usize, master: &ResolvedMaster, input: &RowInput) -> MasterRun {
    let series = input.view(master.input);
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| master.computation.evaluate(series)));
    let elapsed = start.elapsed();

    let (output, error) = match result {
        Ok(Ok(output)) => (Some(output), None),
        Ok(Err(e)) => (None, Some(e)),
        Err(payload) => (None, Some(ComputeError::Panicked(panic_message(payload.as_ref())))),
    };

    MasterRun {
        master: idx,
        output,
        elapsed,
        error,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Extract and classify every selected cell of a row.
///
/// `runs` must line up with `groups`. Each cell is charged the full
/// elapsed time of its master.
pub fn extract_cells(
    groups: &[MasterGroup],
    runs: &[MasterRun],
    catalog: &ResolvedCatalog,
    dispatch: Dispatch<'_>,
) -> Vec<CellWrite> {
    let cells_for = |(group, run): (&MasterGroup, &MasterRun)| -> Vec<CellWrite> {
        let calc_time = run.elapsed.as_secs_f64();
        group
            .columns
            .iter()
            .map(|&col| {
                let field = catalog.operation(col).field;
                let raw = run.output.as_ref().and_then(|o| o.get(field));
                let c = classify(raw);
                CellWrite {
                    col,
                    value: c.value,
                    calc_time,
                    quality: c.quality,
                }
            })
            .collect()
    };

    match dispatch {
        Dispatch::Sequential => groups.iter().zip(runs).flat_map(cells_for).collect(),
        Dispatch::Pool(pool) => pool.install(|| {
            groups
                .par_iter()
                .zip(runs.par_iter())
                .flat_map_iter(cells_for)
                .collect()
        }),
    }
}
