//! LFT CLI
//!
//! Entry point for the `lft` command-line tool.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use lft::config::{resolve_config_path, EffectiveConfig};
use lft::render::{self, OutputFormat};
use lft::signal::{self, CancelRegistry, SignalState};
use lft::{Category, Orchestrator, RpcHandler};
use lft_protocol::ops::{ExecutionStatus, RunRequest};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration, workspace and protocol errors.
const EXIT_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "lft")]
#[command(about = "Detect and run a Python project's lint, format and test tools", version)]
struct Cli {
    /// Path to config file (default: $LFT_CONFIG, then ~/.config/lft/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (-vv for trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Human output style
    #[arg(long, value_enum, global = true)]
    output_format: Option<OutputFormat>,

    /// Maximum number of tool processes running at once
    #[arg(long, global = true)]
    max_processes: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect configured tools and their merged settings
    Detect {
        /// Project directory
        #[arg(default_value = ".")]
        work_dir: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run the project's linter
    Lint(RunArgs),

    /// Run the project's formatter
    Format(RunArgs),

    /// Run the project's test runner
    Test(RunArgs),

    /// Report which known config files exist
    CheckConfig {
        /// Project directory
        #[arg(default_value = ".")]
        work_dir: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Serve JSON-lines RPC on stdin/stdout
    Serve,
}

#[derive(Args)]
struct RunArgs {
    /// File or directory to check, or "all"
    #[arg(default_value = "all")]
    target: String,

    /// Project directory
    #[arg(long, short = 'C', default_value = ".")]
    work_dir: String,

    /// Run this tool instead of the detected one
    #[arg(long)]
    tool: Option<String>,

    /// Override a tool setting for this run (value parsed as JSON when possible)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    settings: Vec<String>,

    /// Timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Extra arguments passed to the tool (after --)
    #[arg(last = true)]
    extra: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let effective = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(EXIT_ERROR);
        }
    };
    let format = effective.config.output_format;

    let orchestrator = match Orchestrator::new(effective.config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };

    let registry = Arc::new(CancelRegistry::new());
    let signals = SignalState::new(Arc::clone(&registry), orchestrator.slots().clone());
    if let Err(e) = signal::install(Arc::new(signals)) {
        warn!(error = %e, "failed to install signal handler");
    }

    match cli.command {
        Commands::Detect { work_dir, json } => run_detect(&orchestrator, &work_dir, json, format),
        Commands::CheckConfig { work_dir, json } => run_check(&orchestrator, &work_dir, json, format),
        Commands::Lint(args) => run_tool(&orchestrator, &registry, Category::Lint, args, format),
        Commands::Format(args) => run_tool(&orchestrator, &registry, Category::Format, args, format),
        Commands::Test(args) => run_tool(&orchestrator, &registry, Category::Test, args, format),
        Commands::Serve => {
            let handler = RpcHandler::new(orchestrator, registry);
            if let Err(e) = handler.run() {
                eprintln!("RPC transport error: {}", e);
                process::exit(EXIT_ERROR);
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, lft::config::ConfigError> {
    let mut overrides = Map::new();
    if let Some(format) = cli.output_format {
        overrides.insert("output_format".to_string(), Value::from(format.as_str()));
    }
    if let Some(max) = cli.max_processes {
        overrides.insert("max_concurrent_processes".to_string(), Value::from(max));
    }
    let overrides = (!overrides.is_empty()).then_some(Value::Object(overrides));

    let path = resolve_config_path(cli.config.as_deref());
    EffectiveConfig::build(path.as_deref(), overrides)
}

fn run_detect(orchestrator: &Orchestrator, work_dir: &str, json: bool, format: OutputFormat) {
    match orchestrator.detect_workspace_tools(work_dir) {
        Ok(response) if json => print_json(&response),
        Ok(response) => println!("{}", render::detect(format, &response)),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    }
}

fn run_check(orchestrator: &Orchestrator, work_dir: &str, json: bool, format: OutputFormat) {
    match orchestrator.check_config_files(work_dir) {
        Ok(response) if json => print_json(&response),
        Ok(response) => println!("{}", render::check(format, &response)),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    }
}

fn run_tool(
    orchestrator: &Orchestrator,
    registry: &CancelRegistry,
    category: Category,
    args: RunArgs,
    format: OutputFormat,
) {
    let tool_config = match parse_settings(&args.settings) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };
    let request = RunRequest {
        work_dir: args.work_dir,
        target: Some(args.target),
        exact_tool: args.tool,
        tool_config,
        custom_args: args.extra,
        timeout_seconds: args.timeout,
    };

    let request_id = category.as_str();
    let Some(cancel) = registry.register(request_id) else {
        eprintln!("Error: {} is already running", category);
        process::exit(EXIT_ERROR);
    };
    let result = orchestrator.run(category, &request, cancel);
    registry.unregister(request_id);

    let response = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    };
    if args.json {
        print_json(&response);
    } else {
        println!("{}", render::run(format, &response));
    }

    process::exit(match response.status {
        ExecutionStatus::Success => 0,
        ExecutionStatus::NonZeroExit => 1,
        ExecutionStatus::TimedOut => 124,
        ExecutionStatus::ToolNotFound => 127,
        ExecutionStatus::Cancelled => signal::EXIT_CODE_INTERRUPTED,
    });
}

/// `key=value` pairs as a settings map; values that parse as JSON keep
/// their type, anything else is a string.
fn parse_settings(pairs: &[String]) -> Result<Option<Map<String, Value>>, String> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut map = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(format!("invalid --set '{}', expected KEY=VALUE", pair));
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.trim().to_string(), value);
    }
    Ok(Some(map))
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(EXIT_ERROR);
        }
    }
}
