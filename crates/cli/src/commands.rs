use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tsgrid_compute::{ProgressReporter, Registry, RunSummary, Scheduler};
use tsgrid_core::{Quality, QualityCounts};
use tsgrid_storage::BundleStore;

use crate::cli::ResetArgs;
use crate::config::RunSettings;

/// Load the bundle, fill its pending cells and save it back.
///
/// Ctrl-C stops the run after the current series; whatever was computed
/// is still saved. A second Ctrl-C exits at once without saving.
pub async fn compute(settings: RunSettings) -> Result<RunSummary> {
    let store = BundleStore::new(&settings.bundle)?;
    let mut bundle = store
        .load()
        .with_context(|| format!("failed to load bundle: {}", settings.bundle.display()))?;

    let registry = Registry::with_builtins();
    let scheduler = Scheduler::from_catalog(
        settings.scheduler.clone(),
        &bundle.operations,
        &bundle.masters,
        &registry,
    )
    .context("catalog check failed, nothing was computed")?;

    let watcher = tokio::spawn(watch_interrupts(
        tokio::signal::ctrl_c,
        scheduler.shutdown_signal(),
        || {
            std::process::exit(FORCE_EXIT_CODE);
        },
    ));

    let summary = tokio::task::spawn_blocking(move || -> Result<RunSummary> {
        let mut reporter = match &settings.progress_file {
            Some(path) => ProgressReporter::to_file(path, settings.verbose)
                .with_context(|| format!("failed to open progress file: {}", path.display()))?,
            None => ProgressReporter::new(settings.verbose),
        };

        let summary = scheduler.run(
            &bundle.series,
            &settings.request,
            &mut bundle.results,
            &mut reporter,
            |results| {
                store.save_parts(&bundle.series, &bundle.operations, &bundle.masters, results)?;
                Ok(())
            },
        )?;

        store
            .save(&bundle)
            .with_context(|| format!("failed to save bundle: {}", store.path().display()))?;
        info!(path = %store.path().display(), "Bundle saved");
        Ok(summary)
    })
    .await
    .context("compute task panicked")??;
    watcher.abort();

    if summary.cancelled {
        warn!(
            processed = summary.rows_processed,
            selected = summary.rows_selected,
            "Run cancelled; rerun to continue where it stopped"
        );
    }
    Ok(summary)
}

/// Exit status of a run aborted by a second Ctrl-C (128 + SIGINT).
const FORCE_EXIT_CODE: i32 = 130;

/// First interrupt requests a graceful stop, the second calls `force_exit`.
async fn watch_interrupts<S, F>(mut next_signal: S, shutdown: Arc<AtomicBool>, force_exit: impl FnOnce())
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return;
    }
    warn!("Ctrl-C received, stopping after the current series (press again to quit now)");
    shutdown.store(true, Ordering::Relaxed);

    if next_signal().await.is_ok() {
        warn!("Second Ctrl-C received, exiting without saving");
        force_exit();
    }
}

/// Print quality counts for the whole matrix and for each operation.
pub fn summary(path: &Path) -> Result<()> {
    let bundle = BundleStore::new(path)?
        .load()
        .with_context(|| format!("failed to load bundle: {}", path.display()))?;

    println!(
        "{}: {} series x {} operations ({} masters), saved {}",
        path.display(),
        bundle.series.len(),
        bundle.operations.len(),
        bundle.masters.len(),
        bundle.modified_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    println!("{:<10} {:<24} {}", "id", "operation", counts_header());
    for (op, counts) in bundle.counts_by_operation() {
        println!("{:<10} {:<24} {}", op.id, truncate(&op.name, 24), counts_row(&counts));
    }
    println!("{:<10} {:<24} {}", "", "total", counts_row(&bundle.results.quality_counts()));
    Ok(())
}

/// Return selected cells to the never-computed state and save.
pub fn reset(path: &Path, args: &ResetArgs) -> Result<usize> {
    if args.selection.is_empty() && args.quality.is_none() && !args.all {
        bail!("refusing to reset every cell without --all");
    }
    let only = args
        .quality
        .map(Quality::try_from)
        .transpose()
        .context("invalid --quality")?;

    let store = BundleStore::new(path)?;
    let mut bundle = store
        .load()
        .with_context(|| format!("failed to load bundle: {}", path.display()))?;
    let n = bundle.reset_cells(&args.selection.series_ids(), &args.selection.operation_ids(), only)?;
    store
        .save(&bundle)
        .with_context(|| format!("failed to save bundle: {}", path.display()))?;
    println!("Reset {} cells", n);
    Ok(n)
}

/// List the built-in computations usable in master operation codes.
pub fn computations() {
    let registry = Registry::with_builtins();
    for (name, entry) in registry.entries() {
        println!("{:<14} {}", name, entry.signature);
        println!("{:<14} {}", "", entry.description);
        // Outputs of parameterized computations depend on their arguments.
        if let Ok(c) = entry.build(&[]) {
            println!("{:<14} outputs: {}", "", c.outputs().join(", "));
        }
    }
}

fn counts_header() -> String {
    let mut cols: Vec<String> = Quality::ALL.iter().map(|q| format!("{:>8}", q.to_string())).collect();
    cols.push(format!("{:>8}", "pending"));
    cols.join(" ")
}

fn counts_row(counts: &QualityCounts) -> String {
    let mut cols: Vec<String> = Quality::ALL.iter().map(|q| format!("{:>8}", counts.get(*q))).collect();
    cols.push(format!("{:>8}", counts.never_computed));
    cols.join(" ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max - 1).collect();
        t.push('~');
        t
    }
}
