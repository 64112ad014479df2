//! Parallel-index descriptor read by the solver at start-up.
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// File name the solver looks for in its working directory.
pub const PARALLEL_INDEX_FILE: &str = "parallelindex.dat";

/// Render the descriptor for `worker_count` workers; every other switch is off.
pub fn render_parallel_index(worker_count: u32) -> String {
    const ZERO: &str = " 0.000000000000000E+000";
    const SWITCHES: [(&str, &[&str]); 9] = [
        ("__Num_Domains_Partitiong", &["  0"]),
        ("__Solver_Type", &["  1"]),
        ("__Output_Timing", &["  F"]),
        ("__Simulation_End", &["  F"]),
        ("__Simulation_Restart", &["  F"]),
        ("__Restart_File_Info", &["  F", ZERO]),
        ("__Tecplot_Output", &["  F"]),
        ("__File_Merging", &["  F"]),
        ("__Run_Time", &[ZERO]),
    ];
    let mut out = format!("__Number_of_CPU\n  {worker_count}\n");
    for (key, values) in SWITCHES {
        out.push_str(key);
        out.push('\n');
        for value in values {
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}

pub fn write_parallel_index(worker_count: u32, path: &Path) -> Result<()> {
    fs::write(path, render_parallel_index(worker_count))
        .map_err(|err| Error::io(format!("write {}", path.display()), err))?;
    tracing::debug!(path = %path.display(), worker_count, "wrote parallel index");
    Ok(())
}
