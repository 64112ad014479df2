use anyhow::{anyhow, Context, Result};
use clap::Parser;
use hgsrun::{
    load_run_config, ConfigDocument, Decoder, Encoding, Lookup, PhaseState, RunConfig,
    RunOrchestrator, Value,
};
use serde::Serialize;
use std::path::Path;

mod cli;
use cli::{
    Command, DecodeArg, GetArgs, LookupArgs, PhaseArgs, PidxArgs, PreprocessArgs, ReplaceArgs,
    RootArgs, RunArgs, SetArgs, SetRuntimeArgs, SolveArgs,
};

fn main() -> Result<()> {
    init_logging();
    let args = RootArgs::parse();

    match args.command {
        Command::Get(args) => cmd_get(args),
        Command::Set(args) => cmd_set(args),
        Command::Replace(args) => cmd_replace(args),
        Command::SetRuntime(args) => cmd_set_runtime(args),
        Command::Preprocess(args) => cmd_preprocess(args),
        Command::Solve(args) => cmd_solve(args),
        Command::Pidx(args) => cmd_pidx(args),
    }
}

/// Log to stderr so stdout stays parseable; `RUST_LOG` overrides the filter.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,hgsrun=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_get(args: GetArgs) -> Result<()> {
    let doc = load_document(&args.file)?;
    let decoder = match args.decode {
        DecodeArg::Text => Decoder::Text,
        DecodeArg::Integer => Decoder::Integer,
        DecodeArg::Float => Decoder::Float,
    };
    let value = doc
        .get(&args.keyword, decoder, &lookup(&args.lookup))
        .with_context(|| format!("get {:?} from {}", args.keyword, args.file.display()))?;
    println!("{value}");
    Ok(())
}

fn cmd_set(args: SetArgs) -> Result<()> {
    let mut doc = load_document(&args.file)?;
    let (value, encoding) = match args.scientific {
        Some(digits) => {
            let number: f64 = args
                .value
                .parse()
                .with_context(|| format!("parse {:?} as a number", args.value))?;
            (Value::Float(number), Encoding::Scientific(digits))
        }
        None => (Value::Text(args.value.clone()), Encoding::Plain),
    };
    doc.set(&args.keyword, value, encoding, &lookup(&args.lookup))
        .with_context(|| format!("set {:?} in {}", args.keyword, args.file.display()))?;
    doc.save(&args.file)
        .with_context(|| format!("write {}", args.file.display()))?;
    Ok(())
}

fn cmd_replace(args: ReplaceArgs) -> Result<()> {
    let mut doc = load_document(&args.file)?;
    doc.replace_token(
        args.old.as_str(),
        args.new.as_str(),
        Encoding::Plain,
        &lookup(&args.lookup),
    )
    .with_context(|| format!("replace {:?} in {}", args.old, args.file.display()))?;
    doc.save(&args.file)
        .with_context(|| format!("write {}", args.file.display()))?;
    Ok(())
}

fn cmd_set_runtime(args: SetRuntimeArgs) -> Result<()> {
    let mut config = resolve_run_config(&args.run)?;
    // The new end time supersedes any configured run length.
    config.runtime = Some(args.seconds);
    config.length = None;
    let mut run = RunOrchestrator::new(config).context("configure run")?;
    let source = run
        .read(None, args.template.as_deref())
        .context("read grok config")?;
    run.set_runtime(args.seconds).context("set runtime")?;
    let target = run.write(None).context("write grok config")?;
    tracing::info!(
        source = %source.display(),
        target = %target.display(),
        runtime = args.seconds,
        "runtime updated"
    );
    if args.run.json {
        print_json(&RuntimeReport {
            target: target.display().to_string(),
            runtime: args.seconds,
            length: run.length(),
        })?;
    }
    Ok(())
}

fn cmd_preprocess(args: PreprocessArgs) -> Result<()> {
    let mut config = resolve_run_config(&args.run)?;
    apply_phase_args(&args.phase, &mut config.preprocessor_args)?;
    let executable = args
        .phase
        .executable
        .clone()
        .unwrap_or_else(|| config.preprocessor.clone());
    let log = args
        .phase
        .log
        .clone()
        .unwrap_or_else(|| config.preprocessor_log.clone());
    let mut run = RunOrchestrator::new(config).context("configure run")?;
    let status = run
        .run_preprocess(&executable, &log)
        .context("run pre-processor")?;
    report_phase("preprocess", status, &run, &log, &args.run, args.phase.strict)
}

fn cmd_solve(args: SolveArgs) -> Result<()> {
    let mut config = resolve_run_config(&args.run)?;
    apply_phase_args(&args.phase, &mut config.solver_args)?;
    let executable = args
        .phase
        .executable
        .clone()
        .unwrap_or_else(|| config.solver.clone());
    let log = args
        .phase
        .log
        .clone()
        .unwrap_or_else(|| config.solver_log.clone());
    let mut run = RunOrchestrator::new(config).context("configure run")?;
    let status = run
        .run_solve(&executable, &log, args.skip_preprocess)
        .context("run solver")?;
    report_phase("solve", status, &run, &log, &args.run, args.phase.strict)
}

fn cmd_pidx(args: PidxArgs) -> Result<()> {
    let config = resolve_run_config(&args.run)?;
    let workers = args.workers.unwrap_or(config.worker_count);
    if workers == 0 {
        return Err(anyhow!("--workers must be at least 1"));
    }
    let path = config.run_dir.join(&args.out);
    hgsrun::run::write_parallel_index(workers, &path).context("write parallel index")?;
    println!("Wrote parallel index to {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct RuntimeReport {
    target: String,
    runtime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<u64>,
}

#[derive(Serialize)]
struct PhaseReport<'a> {
    phase: &'a str,
    status: i32,
    preprocess: PhaseState,
    solve: PhaseState,
    log: String,
}

fn report_phase(
    phase: &str,
    status: i32,
    run: &RunOrchestrator,
    log: &Path,
    run_args: &RunArgs,
    strict: bool,
) -> Result<()> {
    let log = run.run_path(log);
    if run_args.json {
        print_json(&PhaseReport {
            phase,
            status,
            preprocess: run.preprocess_state(),
            solve: run.solve_state(),
            log: log.display().to_string(),
        })?;
    } else {
        println!("{phase}: status {status}");
    }
    if strict && status != 0 {
        return Err(anyhow!("{phase} failed; inspect log file {}", log.display()));
    }
    Ok(())
}

fn resolve_run_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => {
            load_run_config(path).with_context(|| format!("load {}", path.display()))?
        }
        None => {
            let run_dir = args
                .run_dir
                .clone()
                .ok_or_else(|| anyhow!("--run-dir is required without --config"))?;
            let project = args
                .project
                .clone()
                .ok_or_else(|| anyhow!("--project is required without --config"))?;
            RunConfig::new(run_dir, project)
        }
    };
    if let Some(run_dir) = &args.run_dir {
        config.run_dir = run_dir.clone();
    }
    if let Some(project) = &args.project {
        config.project = project.clone();
    }
    if let Some(runtime) = args.runtime {
        config.runtime = Some(runtime);
    }
    if let Some(length) = args.length {
        config.length = Some(length);
    }
    if let Some(mode) = &args.mode {
        config.input_mode = Some(mode.clone());
    }
    if let Some(interval) = &args.interval {
        config.input_interval = Some(interval.clone());
    }
    Ok(config)
}

fn apply_phase_args(phase: &PhaseArgs, target: &mut Vec<String>) -> Result<()> {
    if let Some(raw) = &phase.args {
        *target = shell_words::split(raw).with_context(|| format!("parse --args {raw:?}"))?;
    }
    Ok(())
}

fn load_document(path: &Path) -> Result<ConfigDocument> {
    let mut doc = ConfigDocument::new();
    doc.load(path)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(doc)
}

fn lookup(args: &LookupArgs) -> Lookup {
    let lookup = match &args.after {
        Some(anchor) => Lookup::after(anchor.as_str()),
        None => Lookup::default(),
    };
    lookup.starting_at(args.start)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize report")?;
    println!("{json}");
    Ok(())
}
