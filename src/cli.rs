//! CLI argument parsing for grok/HGS run control.
//!
//! Document commands (`get`, `set`, `replace`) work on a grok file directly.
//! Run commands build an orchestrator from a JSON run config and/or flags.
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "hgsrun",
    version,
    about = "Configure and run grok/HGS simulations",
    after_help = "Examples:\n  hgsrun get run/grw.grok \"output times\"\n  hgsrun set run/grw.grok \"time raster table\" \"include precip.inc\" --after rain\n  hgsrun set-runtime --config run.json 86400\n  hgsrun preprocess --config run.json --strict\n  hgsrun solve --config run.json --skip-preprocess\n  hgsrun pidx --run-dir run --project grw --runtime 86400 --workers 4",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Get(GetArgs),
    Set(SetArgs),
    Replace(ReplaceArgs),
    SetRuntime(SetRuntimeArgs),
    Preprocess(PreprocessArgs),
    Solve(SolveArgs),
    Pidx(PidxArgs),
}

/// Keyword search position shared by document commands.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Locate this anchor line first and search from there
    #[arg(long, value_name = "LINE")]
    pub after: Option<String>,

    /// Line index to start searching at
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    pub start: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DecodeArg {
    Text,
    Integer,
    Float,
}

/// Print the value that follows a keyword.
#[derive(Parser, Debug)]
#[command(about = "Print the value line of a keyword")]
pub struct GetArgs {
    /// Grok configuration file
    pub file: PathBuf,

    /// Keyword (case-insensitive)
    pub keyword: String,

    #[command(flatten)]
    pub lookup: LookupArgs,

    /// How to decode the value before printing
    #[arg(long, value_enum, default_value = "text")]
    pub decode: DecodeArg,
}

/// Overwrite the value that follows a keyword.
#[derive(Parser, Debug)]
#[command(about = "Set the value line of a keyword (previous file kept as .backup)")]
pub struct SetArgs {
    /// Grok configuration file
    pub file: PathBuf,

    /// Keyword (case-insensitive)
    pub keyword: String,

    /// New value
    pub value: String,

    #[command(flatten)]
    pub lookup: LookupArgs,

    /// Write the value in scientific notation with this many digits
    #[arg(long, value_name = "DIGITS")]
    pub scientific: Option<usize>,
}

/// Replace a token line in place.
#[derive(Parser, Debug)]
#[command(about = "Replace a line equal to OLD with NEW (previous file kept as .backup)")]
pub struct ReplaceArgs {
    /// Grok configuration file
    pub file: PathBuf,

    pub old: String,

    pub new: String,

    #[command(flatten)]
    pub lookup: LookupArgs,
}

/// Run directory and timing, from a config file and/or flags.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON run config; flags below override its values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Existing run directory
    #[arg(long, value_name = "DIR")]
    pub run_dir: Option<PathBuf>,

    /// Project name (file-name stem)
    #[arg(long)]
    pub project: Option<String>,

    /// Simulated end time in seconds
    #[arg(long, value_name = "SECONDS")]
    pub runtime: Option<f64>,

    /// Run length in forcing intervals
    #[arg(long, value_name = "N")]
    pub length: Option<u64>,

    /// Forcing mode (steady-state, periodic, transient, ...)
    #[arg(long)]
    pub mode: Option<String>,

    /// Forcing interval (daily, monthly)
    #[arg(long)]
    pub interval: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Set the run time in a run directory's grok file.
#[derive(Parser, Debug)]
#[command(about = "Set the simulated end time in <project>.grok")]
pub struct SetRuntimeArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// End time in seconds
    pub seconds: f64,

    /// Read the grok file from this folder instead of the run directory
    #[arg(long, value_name = "DIR")]
    pub template: Option<PathBuf>,
}

/// External-process options shared by run phases.
#[derive(Args, Debug)]
pub struct PhaseArgs {
    /// Executable (bare names are looked up in the run dir, then PATH)
    #[arg(long, value_name = "PATH")]
    pub executable: Option<PathBuf>,

    /// Log file, appended to (relative to the run dir)
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Extra arguments, shell-quoted
    #[arg(long, value_name = "ARGS", allow_hyphen_values = true)]
    pub args: Option<String>,

    /// Exit with an error when the run fails instead of reporting it
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run the pre-processor (grok) in the run directory")]
pub struct PreprocessArgs {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub phase: PhaseArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Run the solver (HGS), pre-processing first if needed")]
pub struct SolveArgs {
    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub phase: PhaseArgs,

    /// Do not run the pre-processor first
    #[arg(long)]
    pub skip_preprocess: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Write the solver's parallel-index file")]
pub struct PidxArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Worker count (defaults to the run config's worker_count)
    #[arg(long, value_name = "N")]
    pub workers: Option<u32>,

    /// Output path (relative to the run dir)
    #[arg(long, value_name = "PATH", default_value = hgsrun::PARALLEL_INDEX_FILE)]
    pub out: PathBuf,
}
