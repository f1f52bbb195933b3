use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str) -> Option<T> {
    let raw = profiled_env_opt(profile, key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}

fn profiled_env_bool(profile: &str, key: &str) -> Option<bool> {
    profiled_env_opt(profile, key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Run settings taken from `TSGRID_*` environment variables.
///
/// Every field is optional so the result can be layered over a config file
/// and under command-line flags. When `TSGRID_PROFILE` is set (e.g. `BIG`),
/// each key is first looked up as `{PROFILE}_{KEY}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    pub bundle: Option<PathBuf>,
    pub parallel: Option<bool>,
    pub worker_threads: Option<usize>,
    pub verbose: Option<bool>,
    pub progress_file: Option<PathBuf>,
    pub checkpoint_every: Option<usize>,
}

impl EnvConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let profile = env_or("TSGRID_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            bundle: profiled_env_opt(p, "TSGRID_BUNDLE").map(PathBuf::from),
            parallel: profiled_env_bool(p, "TSGRID_PARALLEL"),
            worker_threads: profiled_env_parse(p, "TSGRID_WORKER_THREADS"),
            verbose: profiled_env_bool(p, "TSGRID_VERBOSE"),
            progress_file: profiled_env_opt(p, "TSGRID_PROGRESS_FILE").map(PathBuf::from),
            checkpoint_every: profiled_env_parse(p, "TSGRID_CHECKPOINT_EVERY"),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::debug!(
            profile = self.profile_label(),
            bundle = ?self.bundle,
            parallel = ?self.parallel,
            worker_threads = ?self.worker_threads,
            verbose = ?self.verbose,
            progress_file = ?self.progress_file,
            checkpoint_every = ?self.checkpoint_every,
            "environment overrides"
        );
    }
}
