//! sluice CLI: run, inspect and schedule file-triggered pipelines.

mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use sluice_core::config::EngineConfig;
use sluice_core::id::RunId;
use sluice_core::manifest::RunManifest;
use sluice_exec::{CadenceScheduler, CancelToken, PipelineError, PipelineRunner};
use sluice_operators::{OpContext, Registry};
use sluice_planner::{bind, default_pipeline, explain, parse_yaml_pipeline, ParsedPipeline, PipelineConfig, PipelineDefinition};

/// Exit status of a run that ended `TimedOut`, `Failed` or `Cancelled`.
const EXIT_RUN_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "sluice: file-triggered batch pipelines with exactly-once loads", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the environment and the pipeline's `config:` block.
#[derive(Args, Debug, Default, Clone)]
struct EngineArgs {
    /// Directory watched for the source file
    #[arg(long)]
    source_root: Option<String>,

    /// Root of per-run artifact namespaces
    #[arg(long)]
    artifact_root: Option<String>,

    /// Root of the JSONL document sink
    #[arg(long)]
    sink_root: Option<String>,

    /// Give up waiting for the source after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Source poll interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Documents per insert call
    #[arg(long)]
    load_batch_size: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one run of a pipeline
    Run {
        /// Path to the pipeline YAML file (built-in pipeline if omitted)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        /// Run id (defaults to the current UTC time)
        #[arg(long)]
        run_id: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Validate a pipeline YAML file
    Validate {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// Show the stage order of a pipeline (EXPLAIN)
    Explain {
        /// Path to the pipeline YAML file (built-in pipeline if omitted)
        #[arg(short, long)]
        pipeline: Option<PathBuf>,
    },

    /// Re-run only the load step of an earlier run
    RetryLoad {
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        #[arg(long)]
        run_id: String,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Fire runs on a fixed interval
    Schedule {
        #[arg(short, long)]
        pipeline: Option<PathBuf>,

        /// Seconds between ticks
        #[arg(long, default_value = "86400")]
        interval_secs: u64,

        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Run {
            pipeline,
            run_id,
            engine,
        } => run_pipeline(pipeline.as_deref(), run_id, &engine),
        Commands::Validate { pipeline } => validate_pipeline(&pipeline).map(|()| {
            println!("✓ Pipeline is valid");
        }),
        Commands::Explain { pipeline } => explain_pipeline(pipeline.as_deref()),
        Commands::RetryLoad {
            pipeline,
            run_id,
            engine,
        } => retry_load(pipeline.as_deref(), &run_id, &engine),
        Commands::Schedule {
            pipeline,
            interval_secs,
            max_ticks,
            engine,
        } => schedule(pipeline.as_deref(), interval_secs, max_ticks, &engine),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match e.downcast_ref::<PipelineError>() {
            Some(
                PipelineError::GateTimeout { .. }
                | PipelineError::StageFailure { .. }
                | PipelineError::LoadFailure { .. }
                | PipelineError::Cancelled { .. },
            ) => EXIT_RUN_FAILED,
            _ => 1,
        };
        std::process::exit(code);
    }
}

fn load_pipeline(path: Option<&Path>) -> Result<ParsedPipeline, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let yaml_content = fs::read_to_string(path)?;
            Ok(parse_yaml_pipeline(&yaml_content)?)
        }
        None => Ok(ParsedPipeline {
            spec: default_pipeline(),
            config: PipelineConfig::default(),
        }),
    }
}

/// Environment, then the pipeline file, then command-line flags.
fn resolve_config(pipeline: &PipelineConfig, args: &EngineArgs) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    pipeline.apply_to(&mut config);
    apply_cli_overrides(&mut config, args);
    config
}

fn apply_cli_overrides(cfg: &mut EngineConfig, args: &EngineArgs) {
    if let Some(dir) = &args.source_root {
        cfg.source_root = dir.clone();
    }
    if let Some(dir) = &args.artifact_root {
        cfg.artifact_root = dir.clone();
    }
    if let Some(dir) = &args.sink_root {
        cfg.sink_root = dir.clone();
    }
    if let Some(ms) = args.timeout_ms {
        cfg.gate_timeout_ms = Some(ms);
    }
    if let Some(ms) = args.poll_ms {
        cfg.poll_interval_ms = ms;
    }
    if let Some(n) = args.load_batch_size {
        cfg.load_batch_size = Some(n).filter(|n| *n > 0);
    }
}

fn definition(
    parsed: ParsedPipeline,
    config: &EngineConfig,
) -> Result<PipelineDefinition, Box<dyn std::error::Error>> {
    let ctx = OpContext {
        sentinel: config.sentinel.clone(),
    };
    Ok(bind(parsed.spec, &Registry::builtin(), &ctx)?)
}

fn runner(
    path: Option<&Path>,
    args: &EngineArgs,
) -> Result<PipelineRunner, Box<dyn std::error::Error>> {
    let parsed = load_pipeline(path)?;
    let config = resolve_config(&parsed.config, args);
    let def = definition(parsed, &config)?;
    Ok(PipelineRunner::from_config(def, config)?)
}

fn print_manifest(manifest: &RunManifest) {
    println!("✓ Run {} {}", manifest.run_id, manifest.state);
    for stage in &manifest.stages {
        println!("  {:<24} {}ms", stage.stage, stage.elapsed_ms);
    }
    if let Some(load) = manifest.load {
        println!(
            "  Loaded: {} inserted, {} duplicates",
            load.inserted, load.duplicates
        );
    }
    println!(
        "  Duration: {}ms",
        manifest.finished_ms.saturating_sub(manifest.started_ms)
    );
    println!("  Plan hash: {}", manifest.plan_hash);
}

fn run_pipeline(
    path: Option<&Path>,
    run_id: Option<String>,
    args: &EngineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = runner(path, args)?;
    let run_id = match run_id {
        Some(id) => RunId::new(id)?,
        None => CadenceScheduler::default().run_id_for(Utc::now())?,
    };
    let manifest = runner.run(&run_id, &CancelToken::new())?;
    print_manifest(&manifest);
    Ok(())
}

fn validate_pipeline(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load_pipeline(Some(path))?;
    let config = resolve_config(&parsed.config, &EngineArgs::default());
    definition(parsed, &config)?;
    Ok(())
}

fn explain_pipeline(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load_pipeline(path)?;
    let config = resolve_config(&parsed.config, &EngineArgs::default());
    let def = definition(parsed, &config)?;
    print!("{}", explain(&def));
    Ok(())
}

fn retry_load(
    path: Option<&Path>,
    run_id: &str,
    args: &EngineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = runner(path, args)?;
    let manifest = runner.retry_load(&RunId::new(run_id)?)?;
    print_manifest(&manifest);
    Ok(())
}

fn schedule(
    path: Option<&Path>,
    interval_secs: u64,
    max_ticks: Option<u64>,
    args: &EngineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = runner(path, args)?;
    let mut scheduler = CadenceScheduler::new(Duration::from_secs(interval_secs.max(1)));
    if let Some(max) = max_ticks {
        scheduler = scheduler.with_max_ticks(max);
    }
    for tick in scheduler.run(&runner, &CancelToken::new()) {
        match (tick.state, tick.error) {
            (Some(state), None) => println!("{} {}", tick.run_id, state),
            (state, Some(err)) => println!(
                "{} {}: {}",
                tick.run_id,
                state.map(|s| s.to_string()).unwrap_or_else(|| "skipped".into()),
                err
            ),
            (None, None) => println!("{} skipped", tick.run_id),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_config_overrides_env_defaults() {
        let pipeline = PipelineConfig {
            sink_root: Some("/tmp/pipeline-sink".into()),
            gate_timeout_ms: Some(1_000),
            ..Default::default()
        };
        let config = resolve_config(&pipeline, &EngineArgs::default());
        assert_eq!(config.sink_root, "/tmp/pipeline-sink");
        assert_eq!(config.gate_timeout_ms, Some(1_000));
    }

    #[test]
    fn cli_overrides_higher_priority_than_config() {
        let pipeline = PipelineConfig {
            sink_root: Some("/tmp/pipeline-sink".into()),
            poll_interval_ms: Some(10),
            ..Default::default()
        };
        let args = EngineArgs {
            sink_root: Some("/tmp/cli-sink".into()),
            load_batch_size: Some(0),
            ..Default::default()
        };
        let config = resolve_config(&pipeline, &args);
        assert_eq!(config.sink_root, "/tmp/cli-sink");
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.load_batch_size, None);
    }

    #[test]
    fn built_in_pipeline_binds_without_a_file() {
        let parsed = load_pipeline(None).unwrap();
        let def = definition(parsed, &EngineConfig::default()).unwrap();
        assert_eq!(def.name(), "tiktok_processing");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "sluice",
            "run",
            "--run-id",
            "2023-05-09T00:00:00Z",
            "--timeout-ms",
            "100",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { run_id, engine, .. } => {
                assert_eq!(run_id.as_deref(), Some("2023-05-09T00:00:00Z"));
                assert_eq!(engine.timeout_ms, Some(100));
            }
            _ => panic!("expected run"),
        }
        assert!(Cli::try_parse_from(["sluice", "retry-load"]).is_err());
    }
}
