use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::ids::IdList;

/// Incremental feature-matrix computation over time-series bundles.
///
/// Fills the pending cells of a bundle's result matrix, evaluating each
/// shared master operation once per series.
#[derive(Parser, Debug)]
#[command(name = "tsgrid", about = "Incremental feature-matrix computation for time series")]
pub struct CliArgs {
    /// Bundle file (.json, .msgpack or .mpk)
    #[arg(long, short, global = true)]
    pub bundle: Option<PathBuf>,

    /// Path to config file (default: ./tsgrid.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute every pending or failed cell in the selection
    Compute(ComputeArgs),
    /// Show quality counts overall and per operation
    Summary,
    /// Return cells to the never-computed state
    Reset(ResetArgs),
    /// List the built-in shared computations
    Computations,
}

/// Row and column filters. Ids accept ranges like `1-10,15`.
#[derive(Args, Debug, Default, Clone)]
pub struct Selection {
    /// Series ids to include (default: all)
    #[arg(long)]
    pub series: Option<IdList>,

    /// Operation ids to include (default: all)
    #[arg(long)]
    pub operations: Option<IdList>,
}

impl Selection {
    pub fn series_ids(&self) -> Vec<u64> {
        self.series.clone().map(IdList::into_inner).unwrap_or_default()
    }

    pub fn operation_ids(&self) -> Vec<u64> {
        self.operations.clone().map(IdList::into_inner).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_none() && self.operations.is_none()
    }
}

#[derive(Args, Debug, Default)]
pub struct ComputeArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Evaluate master operations on a worker pool
    #[arg(long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Force single-threaded evaluation
    #[arg(long)]
    pub sequential: bool,

    /// Worker threads for --parallel (0 = all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Per-series progress lines with remaining time estimate
    #[arg(long, short)]
    pub verbose: bool,

    /// Append progress to this file instead of the log
    #[arg(long)]
    pub progress_file: Option<PathBuf>,

    /// Save the bundle after every N processed series (0 = only at the end)
    #[arg(long)]
    pub checkpoint_every: Option<usize>,
}

impl ComputeArgs {
    pub fn parallel_flag(&self) -> Option<bool> {
        if self.parallel {
            Some(true)
        } else if self.sequential {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Only reset cells currently at this quality code (0-5)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Allow resetting the whole matrix when no filter is given
    #[arg(long)]
    pub all: bool,
}
