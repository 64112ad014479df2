//! Run configuration.
//!
//! Each orchestrator is built from its own `RunConfig`; nothing is shared
//! between instances. Configs are plain JSON so runs can be scripted and
//! reproduced.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PREPROCESSOR: &str = "grok_premium.x";
pub const DEFAULT_SOLVER: &str = "hgs_premium.x";
pub const DEFAULT_PREPROCESSOR_LOG: &str = "log.grok";
pub const DEFAULT_SOLVER_LOG: &str = "log.hgs_run";

/// Everything needed to configure and drive one run directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Existing directory the run is set up and executed in.
    pub run_dir: PathBuf,
    /// File-name stem (`<project>.grok`, `batch.pfx` contents).
    pub project: String,
    /// End time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<f64>,
    /// Run length in forcing intervals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    /// Free-form forcing mode ("steady-state", "clim", "transient", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<String>,
    /// Free-form forcing interval ("monthly", "day", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_interval: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: u32,
    #[serde(default = "default_preprocessor")]
    pub preprocessor: PathBuf,
    #[serde(default = "default_solver")]
    pub solver: PathBuf,
    #[serde(default = "default_preprocessor_log")]
    pub preprocessor_log: PathBuf,
    #[serde(default = "default_solver_log")]
    pub solver_log: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preprocessor_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solver_args: Vec<String>,
}

fn default_worker_count() -> u32 {
    1
}

fn default_preprocessor() -> PathBuf {
    PathBuf::from(DEFAULT_PREPROCESSOR)
}

fn default_solver() -> PathBuf {
    PathBuf::from(DEFAULT_SOLVER)
}

fn default_preprocessor_log() -> PathBuf {
    PathBuf::from(DEFAULT_PREPROCESSOR_LOG)
}

fn default_solver_log() -> PathBuf {
    PathBuf::from(DEFAULT_SOLVER_LOG)
}

impl RunConfig {
    /// Config with defaults for everything but the run directory and project.
    pub fn new(run_dir: impl Into<PathBuf>, project: impl Into<String>) -> Self {
        Self {
            run_dir: run_dir.into(),
            project: project.into(),
            runtime: None,
            length: None,
            input_mode: None,
            input_interval: None,
            worker_count: default_worker_count(),
            preprocessor: default_preprocessor(),
            solver: default_solver(),
            preprocessor_log: default_preprocessor_log(),
            solver_log: default_solver_log(),
            preprocessor_args: Vec::new(),
            solver_args: Vec::new(),
        }
    }
}

/// Load a run config; a relative `run_dir` is taken relative to the file.
pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let bytes =
        fs::read(path).map_err(|err| Error::io(format!("read {}", path.display()), err))?;
    let mut config: RunConfig = serde_json::from_slice(&bytes)
        .map_err(|err| Error::Config(format!("parse {}: {err}", path.display())))?;
    if config.run_dir.is_relative() {
        if let Some(parent) = path.parent() {
            config.run_dir = parent.join(&config.run_dir);
        }
    }
    validate_run_config(&config)?;
    Ok(config)
}

/// Persist a config as pretty JSON.
pub fn write_run_config(path: &Path, config: &RunConfig) -> Result<()> {
    let text = serde_json::to_string_pretty(config)
        .map_err(|err| Error::Config(format!("serialize run config: {err}")))?;
    fs::write(path, text.as_bytes())
        .map_err(|err| Error::io(format!("write {}", path.display()), err))?;
    Ok(())
}

pub fn validate_run_config(config: &RunConfig) -> Result<()> {
    if config.project.trim().is_empty() {
        return Err(Error::Config("project must be non-empty".to_string()));
    }
    if config.project.contains(['/', '\\']) {
        return Err(Error::Config(format!(
            "project must be a file-name stem (got {:?})",
            config.project
        )));
    }
    if config.worker_count == 0 {
        return Err(Error::Config("worker_count must be at least 1".to_string()));
    }
    if let Some(runtime) = config.runtime {
        validate_runtime(runtime)?;
    }
    Ok(())
}

/// End times must be positive and finite.
pub(crate) fn validate_runtime(runtime: f64) -> Result<()> {
    if !(runtime.is_finite() && runtime > 0.0) {
        return Err(Error::Config(format!(
            "runtime must be a positive number of seconds (got {runtime})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn minimal_config_gets_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"run_dir": "work", "project": "grw"}"#).unwrap();
        let config = load_run_config(&path).unwrap();
        assert_eq!(config.run_dir, dir.path().join("work"));
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.preprocessor, PathBuf::from(DEFAULT_PREPROCESSOR));
        assert_eq!(config.solver_log, PathBuf::from(DEFAULT_SOLVER_LOG));
        assert!(config.runtime.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{"run_dir": ".", "project": "grw", "np": 2}"#).unwrap();
        let err = load_run_config(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = RunConfig::new("/tmp", "");
        assert!(validate_run_config(&config).is_err());
        config.project = "a/b".to_string();
        assert!(validate_run_config(&config).is_err());
        config.project = "grw".to_string();
        config.worker_count = 0;
        assert!(validate_run_config(&config).is_err());
        config.worker_count = 2;
        config.runtime = Some(-1.0);
        assert!(validate_run_config(&config).is_err());
        config.runtime = Some(86_400.0);
        assert!(validate_run_config(&config).is_ok());
    }

    #[test]
    fn written_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        let mut config = RunConfig::new(dir.path(), "grw");
        config.runtime = Some(157_680_000.0);
        config.input_mode = Some("periodic".to_string());
        config.input_interval = Some("monthly".to_string());
        config.solver_args = vec!["-v".to_string()];
        write_run_config(&path, &config).unwrap();
        assert_eq!(load_run_config(&path).unwrap(), config);
    }
}
