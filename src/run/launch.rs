//! External process launch and the log-sentinel success check.
//!
//! The pre-processor and solver exit codes are not trusted; a run passed only
//! if its combined log ends with the normal-exit sentinel two lines from the
//! bottom.
use crate::error::{Error, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Literal written by both binaries on a clean exit.
pub const NORMAL_EXIT_SENTINEL: &str = "---- Normal exit ----";

/// One external invocation: program, arguments, and working directory.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub program: &'a Path,
    pub args: &'a [String],
    pub cwd: &'a Path,
}

/// Runs an external program with stdout and stderr appended to `log`.
///
/// Returns the raw exit code (`None` when terminated by a signal). Errors are
/// reserved for failing to start the program at all.
pub trait Launcher {
    fn launch(&self, request: &LaunchRequest<'_>, log: &File) -> io::Result<Option<i32>>;
}

/// Launcher backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, request: &LaunchRequest<'_>, log: &File) -> io::Result<Option<i32>> {
        let stdout = log.try_clone()?;
        let stderr = log.try_clone()?;
        let status = Command::new(request.program)
            .args(request.args)
            .current_dir(request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()?;
        Ok(status.code())
    }
}

/// True when the third line from the end of `log_text` is the sentinel.
pub fn log_reports_normal_exit(log_text: &str) -> bool {
    let lines: Vec<&str> = log_text.lines().collect();
    if lines.len() < 3 {
        return false;
    }
    lines[lines.len() - 3]
        .trim()
        .eq_ignore_ascii_case(NORMAL_EXIT_SENTINEL)
}

/// Resolve an executable for a run directory.
///
/// Paths with a directory part are taken relative to `run_dir`. A bare name
/// is looked up in `run_dir` first, then on `PATH`.
pub fn resolve_executable(program: &Path, run_dir: &Path) -> Result<PathBuf> {
    let local = run_dir.join(program);
    if local.is_file() {
        return Ok(local);
    }
    let bare = program.components().count() == 1 && !program.is_absolute();
    if bare {
        if let Ok(found) = which::which(program) {
            return Ok(found);
        }
    }
    Err(Error::NotFound(program.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sentinel_must_be_third_from_last() {
        let ok = "setup\n---- Normal exit ----\nelapsed 1s\nbye\n";
        assert!(log_reports_normal_exit(ok));
        let shouted = "  ---- NORMAL EXIT ----  \na\nb";
        assert!(log_reports_normal_exit(shouted));
        let last = "a\nb\n---- Normal exit ----\n";
        assert!(!log_reports_normal_exit(last));
        let short = "---- Normal exit ----\nx\n";
        assert!(!log_reports_normal_exit(short));
        assert!(!log_reports_normal_exit(""));
    }

    #[test]
    fn executable_resolution_prefers_run_dir() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("grok.x");
        std::fs::write(&exe, "").unwrap();
        assert_eq!(resolve_executable(Path::new("grok.x"), dir.path()).unwrap(), exe);
        assert_eq!(resolve_executable(&exe, dir.path()).unwrap(), exe);
        let err = resolve_executable(Path::new("bin/missing.x"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        let err =
            resolve_executable(Path::new("hgsrun-no-such-binary.x"), dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
