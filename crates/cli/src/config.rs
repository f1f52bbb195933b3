use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use tsgrid_compute::{RunRequest, SchedulerConfig};
use tsgrid_core::EnvConfig;

use crate::cli::ComputeArgs;

const DEFAULT_CONFIG_FILE: &str = "tsgrid.toml";

/// CLI configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default bundle path
    #[serde(default)]
    pub bundle: Option<PathBuf>,

    /// Scheduler defaults (`[scheduler]` table)
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Per-series progress lines
    #[serde(default)]
    pub verbose: bool,

    /// Progress file instead of the log
    #[serde(default)]
    pub progress_file: Option<PathBuf>,
}

impl CliConfig {
    /// Load config from the given path, or `./tsgrid.toml` if it exists.
    /// An explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        debug!(?config_path, "Loading config");
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config: {}", config_path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
        Ok(config)
    }

    /// Resolve the bundle path.
    /// Priority: cli flag > env var > config file.
    pub fn resolve_bundle(&self, cli: Option<&Path>, env: &EnvConfig) -> Result<PathBuf> {
        if let Some(p) = cli {
            return Ok(p.to_path_buf());
        }
        if let Some(p) = &env.bundle {
            return Ok(p.clone());
        }
        match &self.bundle {
            Some(p) => Ok(p.clone()),
            None => bail!("no bundle given: pass --bundle, set TSGRID_BUNDLE or add `bundle` to the config file"),
        }
    }
}

/// Fully resolved parameters of one compute run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub bundle: PathBuf,
    pub scheduler: SchedulerConfig,
    pub request: RunRequest,
    pub verbose: bool,
    pub progress_file: Option<PathBuf>,
}

impl RunSettings {
    /// Layer run parameters.
    /// Priority: cli flags > env vars > config file > defaults.
    pub fn resolve(
        args: &ComputeArgs,
        bundle_flag: Option<&Path>,
        env: &EnvConfig,
        file: &CliConfig,
    ) -> Result<Self> {
        let bundle = file.resolve_bundle(bundle_flag, env)?;

        let base = &file.scheduler;
        let scheduler = SchedulerConfig {
            parallel: args.parallel_flag().or(env.parallel).unwrap_or(base.parallel),
            worker_threads: args.threads.or(env.worker_threads).unwrap_or(base.worker_threads),
            checkpoint_every: args
                .checkpoint_every
                .or(env.checkpoint_every)
                .unwrap_or(base.checkpoint_every),
        };

        let verbose = args.verbose || env.verbose.unwrap_or(file.verbose);
        let progress_file = args
            .progress_file
            .clone()
            .or_else(|| env.progress_file.clone())
            .or_else(|| file.progress_file.clone());

        Ok(Self {
            bundle,
            scheduler,
            request: RunRequest {
                series_ids: args.selection.series_ids(),
                operation_ids: args.selection.operation_ids(),
            },
            verbose,
            progress_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdList;

    fn file_config() -> CliConfig {
        toml::from_str(
            r#"
            bundle = "from-file.json"
            verbose = true

            [scheduler]
            parallel = true
            worker_threads = 2
            checkpoint_every = 50
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.bundle.is_none());
        assert!(!config.scheduler.parallel);
        assert_eq!(config.scheduler.checkpoint_every, 0);
    }

    #[test]
    fn file_values_apply_without_overrides() {
        let settings =
            RunSettings::resolve(&ComputeArgs::default(), None, &EnvConfig::default(), &file_config()).unwrap();
        assert_eq!(settings.bundle, PathBuf::from("from-file.json"));
        assert!(settings.scheduler.parallel);
        assert_eq!(settings.scheduler.worker_threads, 2);
        assert_eq!(settings.scheduler.checkpoint_every, 50);
        assert!(settings.verbose);
        assert_eq!(settings.request, RunRequest::all());
    }

    #[test]
    fn env_beats_file_and_cli_beats_env() {
        let env = EnvConfig {
            bundle: Some(PathBuf::from("from-env.mpk")),
            parallel: Some(false),
            worker_threads: Some(8),
            ..EnvConfig::default()
        };
        let settings = RunSettings::resolve(&ComputeArgs::default(), None, &env, &file_config()).unwrap();
        assert_eq!(settings.bundle, PathBuf::from("from-env.mpk"));
        assert!(!settings.scheduler.parallel);
        assert_eq!(settings.scheduler.worker_threads, 8);

        let args = ComputeArgs {
            parallel: true,
            threads: Some(3),
            checkpoint_every: Some(0),
            selection: crate::cli::Selection {
                series: Some(IdList(vec![4, 5])),
                operations: None,
            },
            ..ComputeArgs::default()
        };
        let settings =
            RunSettings::resolve(&args, Some(Path::new("cli.json")), &env, &file_config()).unwrap();
        assert_eq!(settings.bundle, PathBuf::from("cli.json"));
        assert!(settings.scheduler.parallel);
        assert_eq!(settings.scheduler.worker_threads, 3);
        assert_eq!(settings.scheduler.checkpoint_every, 0);
        assert_eq!(settings.request.series_ids, vec![4, 5]);
    }

    #[test]
    fn missing_bundle_is_an_error() {
        let err = CliConfig::default()
            .resolve_bundle(None, &EnvConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("no bundle given"));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tsgrid.toml");
        std::fs::write(&path, "bundle = \"x.json\"\n[scheduler]\nworker_threads = 5\n").unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.bundle, Some(PathBuf::from("x.json")));
        assert_eq!(config.scheduler.worker_threads, 5);
        assert!(!config.scheduler.parallel);

        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = file_config();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.bundle, config.bundle);
        assert_eq!(parsed.scheduler.worker_threads, 2);
    }
}
