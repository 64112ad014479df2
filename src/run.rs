//! Run orchestration: bind a grok document to a run directory, then sequence
//! the pre-processor and solver.
//!
//! Phase outcomes are state, not errors. A failed pre-process leaves
//! [`PhaseState::Failed`] behind and returns a non-zero status; only the
//! solver phase turns that into [`Error::PreprocessRequired`].
mod launch;
mod parallel_index;

pub use launch::{
    log_reports_normal_exit, resolve_executable, LaunchRequest, Launcher, SystemLauncher,
    NORMAL_EXIT_SENTINEL,
};
pub use parallel_index::{render_parallel_index, write_parallel_index, PARALLEL_INDEX_FILE};

use crate::config::{validate_run_config, validate_runtime, RunConfig};
use crate::document::{ConfigDocument, Encoding, Lookup};
use crate::error::{Error, Result};
use crate::timespec::{resolve_interval, ForcingMode, Interval};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Keyword holding the simulation end time in a grok file.
pub const OUTPUT_TIMES_KEYWORD: &str = "output times";
/// File the pre-processor reads the project stem from.
pub const BATCH_PREFIX_FILE: &str = "batch.pfx";

/// Outcome of a run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    /// Not attempted yet.
    #[default]
    Unknown,
    Succeeded,
    Failed,
}

/// Drives one run directory.
pub struct RunOrchestrator {
    config: RunConfig,
    runtime: Option<f64>,
    length: Option<u64>,
    forcing_mode: Option<ForcingMode>,
    forcing_interval: Option<Interval>,
    document: ConfigDocument,
    preprocess: PhaseState,
    solve: PhaseState,
    launcher: Box<dyn Launcher>,
}

impl RunOrchestrator {
    /// Validate `config` and resolve its run length.
    ///
    /// Fails with [`Error::NotFound`] if the run directory does not exist.
    pub fn new(config: RunConfig) -> Result<Self> {
        validate_run_config(&config)?;
        if !config.run_dir.is_dir() {
            return Err(Error::NotFound(config.run_dir.clone()));
        }
        let forcing_mode = config
            .input_mode
            .as_deref()
            .map(str::parse::<ForcingMode>)
            .transpose()?;
        let forcing_interval = config
            .input_interval
            .as_deref()
            .map(str::parse::<Interval>)
            .transpose()?;
        let resolved = resolve_interval(
            config.length,
            config.runtime,
            forcing_interval.map(Interval::seconds),
        )?;
        Ok(Self {
            config,
            runtime: Some(resolved.end_time),
            length: resolved.length,
            forcing_mode,
            forcing_interval,
            document: ConfigDocument::new(),
            preprocess: PhaseState::Unknown,
            solve: PhaseState::Unknown,
            launcher: Box::new(SystemLauncher),
        })
    }

    /// Replace the process launcher (the default spawns real processes).
    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run_dir(&self) -> &Path {
        &self.config.run_dir
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    /// End time in seconds.
    pub fn runtime(&self) -> Option<f64> {
        self.runtime
    }

    /// Run length in forcing intervals, when an interval is known.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn forcing_mode(&self) -> Option<ForcingMode> {
        self.forcing_mode
    }

    pub fn forcing_interval(&self) -> Option<Interval> {
        self.forcing_interval
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut ConfigDocument {
        &mut self.document
    }

    pub fn preprocess_state(&self) -> PhaseState {
        self.preprocess
    }

    pub fn solve_state(&self) -> PhaseState {
        self.solve
    }

    /// `<project>.grok`
    pub fn default_config_name(&self) -> String {
        format!("{}.grok", self.config.project)
    }

    /// Resolve `path` against the run directory.
    pub fn run_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.config.run_dir.join(path)
    }

    /// Load `<folder or run dir>/<filename or project.grok>` and apply the
    /// known runtime to it.
    pub fn read(&mut self, filename: Option<&str>, folder: Option<&Path>) -> Result<PathBuf> {
        let name = filename.map_or_else(|| self.default_config_name(), str::to_string);
        let path = folder.unwrap_or(self.config.run_dir.as_path()).join(name);
        self.document.load(&path)?;
        if let Some(runtime) = self.runtime {
            self.set_runtime(runtime)?;
        }
        Ok(path)
    }

    /// Save the document to `<run dir>/<filename or project.grok>`.
    pub fn write(&mut self, filename: Option<&str>) -> Result<PathBuf> {
        let name = filename.map_or_else(|| self.default_config_name(), str::to_string);
        let path = self.run_path(name);
        self.document.save(&path)?;
        Ok(path)
    }

    /// Set the simulated end time and, if a document is loaded, its
    /// `output times` value.
    pub fn set_runtime(&mut self, seconds: f64) -> Result<()> {
        validate_runtime(seconds)?;
        let resolved = resolve_interval(
            None,
            Some(seconds),
            self.forcing_interval.map(Interval::seconds),
        )?;
        if !self.document.is_empty() {
            self.document.set(
                OUTPUT_TIMES_KEYWORD,
                seconds,
                Encoding::Scientific(3),
                &Lookup::default(),
            )?;
        }
        self.runtime = Some(resolved.end_time);
        self.length = resolved.length;
        Ok(())
    }

    /// Classify and store the forcing mode and interval.
    pub fn set_input_mode(&mut self, mode: &str, interval: &str) -> Result<()> {
        let mode = mode.parse::<ForcingMode>()?;
        let interval = interval.parse::<Interval>()?;
        self.forcing_mode = Some(mode);
        self.forcing_interval = Some(interval);
        Ok(())
    }

    /// Write `batch.pfx` with the project stem.
    pub fn write_batch_prefix(&self) -> Result<PathBuf> {
        let path = self.run_path(BATCH_PREFIX_FILE);
        fs::write(&path, format!("{}\n", self.config.project))
            .map_err(|err| Error::io(format!("write {}", path.display()), err))?;
        Ok(path)
    }

    /// Write the solver's parallel-index file; `path` is relative to the
    /// run directory unless absolute.
    pub fn write_parallel_index(&self, worker_count: u32, path: &Path) -> Result<PathBuf> {
        let path = self.run_path(path);
        write_parallel_index(worker_count, &path)?;
        Ok(path)
    }

    /// Run the pre-processor and record the outcome.
    ///
    /// Returns 0 when the log ends with the normal-exit sentinel, 1
    /// otherwise. Only a missing executable or an I/O failure is an error.
    pub fn run_preprocess(&mut self, executable: &Path, log: &Path) -> Result<i32> {
        let program = resolve_executable(executable, &self.config.run_dir)?;
        self.write_batch_prefix()?;
        let args = self.config.preprocessor_args.clone();
        let passed = self.launch_logged("grok", &program, &args, log)?;
        self.preprocess = phase_state(passed);
        Ok(status_code(passed))
    }

    /// Run the solver, pre-processing first unless it already succeeded or
    /// `skip_preprocess` is set.
    pub fn run_solve(
        &mut self,
        executable: &Path,
        log: &Path,
        skip_preprocess: bool,
    ) -> Result<i32> {
        if !skip_preprocess && self.preprocess != PhaseState::Succeeded {
            let preprocessor = self.config.preprocessor.clone();
            let preprocessor_log = self.config.preprocessor_log.clone();
            self.run_preprocess(&preprocessor, &preprocessor_log)?;
            if self.preprocess == PhaseState::Failed {
                return Err(Error::PreprocessRequired);
            }
        }
        let program = resolve_executable(executable, &self.config.run_dir)?;
        self.write_parallel_index(self.config.worker_count, Path::new(PARALLEL_INDEX_FILE))?;
        let args = self.config.solver_args.clone();
        let passed = self.launch_logged("hgs", &program, &args, log)?;
        self.solve = phase_state(passed);
        Ok(status_code(passed))
    }

    /// Launch `program` in the run directory with output appended to `log`,
    /// then judge the run by the log tail.
    fn launch_logged(
        &self,
        phase: &'static str,
        program: &Path,
        args: &[String],
        log: &Path,
    ) -> Result<bool> {
        let log_path = self.run_path(log);
        let request = LaunchRequest {
            program,
            args,
            cwd: &self.config.run_dir,
        };
        let start = Instant::now();
        let (exit_code, offset) = {
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .map_err(|err| Error::io(format!("open {}", log_path.display()), err))?;
            let offset = log_file
                .metadata()
                .map_err(|err| Error::io(format!("stat {}", log_path.display()), err))?
                .len();
            let exit_code = self
                .launcher
                .launch(&request, &log_file)
                .map_err(|err| Error::io(format!("launch {}", program.display()), err))?;
            (exit_code, offset)
        };
        let elapsed_ms = start.elapsed().as_millis();
        let log_bytes = fs::read(&log_path)
            .map_err(|err| Error::io(format!("read {}", log_path.display()), err))?;
        // Earlier runs in the same log never count toward this one.
        let appended = usize::try_from(offset)
            .ok()
            .and_then(|offset| log_bytes.get(offset..))
            .unwrap_or_default();
        let passed = log_reports_normal_exit(&String::from_utf8_lossy(appended));

        tracing::info!(
            phase,
            program = %program.display(),
            exit_code = ?exit_code,
            elapsed_ms,
            passed,
            "external process finished"
        );
        if !passed {
            tracing::warn!(phase, log = %log_path.display(), "{phase} failed; inspect log file");
        }
        Ok(passed)
    }
}

fn phase_state(passed: bool) -> PhaseState {
    if passed {
        PhaseState::Succeeded
    } else {
        PhaseState::Failed
    }
}

fn status_code(passed: bool) -> i32 {
    if passed {
        0
    } else {
        1
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
