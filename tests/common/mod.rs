//! Shared test infrastructure for integration tests.
//!
//! A `RunFixture` is a temporary run directory holding a small grok file and
//! shell scripts standing in for the pre-processor and solver.
#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

pub const PROJECT: &str = "grw_test";

/// Grok template with two forcing sections and an output-times block.
pub const GROK_TEMPLATE: &str = "\
Output Times
  1.000E+05
end
Rain
x
Time Raster Table
0
Potential Evapotranspiration
Time Raster Table
0
";

/// Prints the batch prefix it was given, then exits normally.
pub const GOOD_GROK: &str = "\
echo \"grok: project $(cat batch.pfx)\"
echo \"---- Normal exit ----\"
echo \"elapsed 0.01s\"
echo \"\"
";

/// Exit code 0 but no sentinel: still a failed run.
pub const BAD_GROK: &str = "\
echo \"grok: cannot open mesh file\" >&2
echo \"stop\"
exit 0
";

/// Exits normally only if the parallel index is present.
pub const GOOD_HGS: &str = "\
test -f parallelindex.dat || { echo \"no parallel index\"; exit 1; }
echo \"hgs: $(head -n 2 parallelindex.dat | tail -n 1)\"
echo \"---- Normal exit ----\"
echo \"done\"
echo \"\"
";

pub struct RunFixture {
    pub dir: TempDir,
}

impl RunFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp run dir");
        std::fs::write(dir.path().join(format!("{PROJECT}.grok")), GROK_TEMPLATE)
            .expect("write grok template");
        Self { dir }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn grok_path(&self) -> PathBuf {
        self.path(&format!("{PROJECT}.grok"))
    }

    /// Write a shell script into the run directory; tests run it through
    /// `/bin/sh` so it never needs the executable bit.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, body).expect("write script");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path(rel)).unwrap_or_else(|err| panic!("read {rel}: {err}"))
    }

    /// Run the hgsrun binary with `args`.
    pub fn hgsrun(&self, args: &[String]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_hgsrun"))
            .args(args)
            .env("RUST_LOG", "off")
            .output()
            .expect("spawn hgsrun")
    }

    /// `--run-dir <dir> --project <PROJECT>` followed by `extra`.
    pub fn run_args(&self, command: &str, extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            command.to_string(),
            "--run-dir".to_string(),
            self.dir.path().display().to_string(),
            "--project".to_string(),
            PROJECT.to_string(),
        ];
        args.extend(extra.iter().map(|arg| arg.to_string()));
        args
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
