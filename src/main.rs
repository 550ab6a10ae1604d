//! Sparkhook CLI
//!
//! Entry point for the `sparkhook` command-line tool.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use sparkhook::config::{ConfigOrigin, EffectiveConfig, HookConfig};
use sparkhook::signal::{SignalHandler, EXIT_CODE_CANCELLED};
use sparkhook::{logging, ConnectionFile, JobSpec, SubmissionDriver, SubmissionResult, SystemRunner};
use tracing::warn;

#[derive(Parser)]
#[command(name = "sparkhook")]
#[command(about = "Submit Spark jobs through spark-submit", version)]
struct Cli {
    /// Path to config file (default: $SPARKHOOK_CONFIG or ~/.config/sparkhook/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job and wait for spark-submit to exit
    Submit {
        /// Job file (TOML)
        job: PathBuf,

        /// Connection to submit through, overriding the job file
        #[arg(long)]
        conn_id: Option<String>,

        /// Path to connections file (default: ~/.config/sparkhook/connections.toml)
        #[arg(long)]
        connections: Option<PathBuf>,

        /// Overall timeout in seconds (0 disables)
        #[arg(long)]
        timeout: Option<u64>,

        /// Output the result in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the spark-submit command for a job without running it
    Command {
        /// Job file (TOML)
        job: PathBuf,

        #[arg(long)]
        conn_id: Option<String>,

        #[arg(long)]
        connections: Option<PathBuf>,

        /// Output the argv as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show the coordinates a connection resolves to
    Resolve {
        /// Connection id ("" for plain yarn)
        conn_id: String,

        #[arg(long)]
        connections: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Connection management commands
    Connections {
        #[command(subcommand)]
        action: ConnectionsCommands,
    },

    /// Show the effective configuration (secrets redacted)
    Config {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ConnectionsCommands {
    /// List configured connections
    List {
        #[arg(long)]
        connections: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_path = cli.config;
    match cli.command {
        Commands::Submit {
            job,
            conn_id,
            connections,
            timeout,
            json,
        } => {
            let overrides =
                timeout.map(|secs| serde_json::json!({"process": {"timeout_seconds": secs}}));
            let (_, config) = load_config(config_path.as_deref(), overrides);
            run_submit(&config, &job, conn_id, connections.as_deref(), json);
        }
        Commands::Command {
            job,
            conn_id,
            connections,
            json,
        } => {
            let (_, config) = load_config(config_path.as_deref(), None);
            run_command(&config, &job, conn_id, connections.as_deref(), json);
        }
        Commands::Resolve {
            conn_id,
            connections,
            json,
        } => {
            let (_, config) = load_config(config_path.as_deref(), None);
            run_resolve(&config, &conn_id, connections.as_deref(), json);
        }
        Commands::Connections { action } => match action {
            ConnectionsCommands::List { connections, json } => {
                let (_, config) = load_config(config_path.as_deref(), None);
                run_connections_list(&config, connections.as_deref(), json);
            }
        },
        Commands::Config { json } => {
            let (effective, _) = load_config(config_path.as_deref(), None);
            run_config_show(&effective, json);
        }
    }
}

fn load_config(
    path: Option<&Path>,
    overrides: Option<serde_json::Value>,
) -> (EffectiveConfig, HookConfig) {
    if let Some(path) = path {
        if !path.exists() {
            eprintln!("Config file not found: {}", path.display());
            process::exit(1);
        }
    }
    let host_path = path
        .map(Path::to_path_buf)
        .or_else(EffectiveConfig::default_host_path);

    let effective = match EffectiveConfig::build(host_path.as_deref(), overrides) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    match effective.hook_config() {
        Ok(config) => (effective, config),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    }
}

fn load_connections(config: &HookConfig, path: Option<&Path>) -> ConnectionFile {
    match config.load_connections(path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error loading connections: {}", e);
            process::exit(1);
        }
    }
}

fn load_job(path: &Path, conn_id: Option<String>) -> JobSpec {
    let mut job = match JobSpec::from_file(path) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Error loading job {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    if let Some(id) = conn_id {
        job.conn_id = Some(id);
    }
    job
}

fn build_driver(
    config: &HookConfig,
    store: ConnectionFile,
    runner: SystemRunner,
) -> SubmissionDriver<ConnectionFile> {
    let patterns = match config.pattern_set() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };
    SubmissionDriver::new(store, runner)
        .with_patterns(patterns)
        .with_default_conn_id(config.default_conn_id.clone())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn run_submit(
    config: &HookConfig,
    job_path: &Path,
    conn_id: Option<String>,
    connections: Option<&Path>,
    json_output: bool,
) {
    let job = load_job(job_path, conn_id);
    let store = load_connections(config, connections);

    let runner = SystemRunner::new(config.runner_config());
    let handler = SignalHandler::new(runner.cancellation_flag());
    if let Err(e) = handler.install() {
        warn!(error = %e, "could not install signal handler");
    }

    let driver = build_driver(config, store, runner);
    let result = match driver.submit(&job) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Submission failed: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        print_json(&result);
    } else {
        print_result(&result);
    }

    process::exit(exit_code_for(&result));
}

fn print_result(result: &SubmissionResult) {
    match result.application_id {
        Some(ref id) => println!("Application id: {}", id),
        None => println!("Application id: (not reported)"),
    }
    match (result.exit_code, &result.term_signal) {
        (Some(code), _) => println!("Exit code: {}", code),
        (None, Some(sig)) => println!("Terminated by: {}", sig),
        (None, None) => println!("Exit code: unknown"),
    }
    if result.cancelled {
        println!("Cancelled");
    }
    if result.timed_out {
        println!("Timed out");
    }
    println!("Duration: {} ms", result.duration_ms);
}

fn exit_code_for(result: &SubmissionResult) -> i32 {
    if result.cancelled {
        return EXIT_CODE_CANCELLED;
    }
    result.exit_code.unwrap_or(1)
}

fn run_command(
    config: &HookConfig,
    job_path: &Path,
    conn_id: Option<String>,
    connections: Option<&Path>,
    json_output: bool,
) {
    let job = load_job(job_path, conn_id);
    let store = load_connections(config, connections);
    let driver = build_driver(config, store, SystemRunner::default());

    let command = match driver.build_command(&job) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        print_json(&command);
    } else {
        println!("{}", command);
    }
}

fn run_resolve(config: &HookConfig, conn_id: &str, connections: Option<&Path>, json_output: bool) {
    let store = load_connections(config, connections);
    let driver = build_driver(config, store, SystemRunner::default());

    let coords = match driver.resolve_connection(conn_id) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if json_output {
        print_json(&coords);
    } else {
        println!("master:      {}", coords.master);
        println!("queue:       {}", coords.queue.as_deref().unwrap_or("-"));
        println!("deploy-mode: {}", coords.deploy_mode.as_deref().unwrap_or("-"));
        println!("spark-home:  {}", coords.spark_home.as_deref().unwrap_or("-"));
    }
}

fn run_connections_list(config: &HookConfig, connections: Option<&Path>, json_output: bool) {
    let store = load_connections(config, connections);
    let profiles = store.sorted();

    if json_output {
        print_json(&profiles);
        return;
    }

    println!("Configured connections ({} total):\n", profiles.len());
    for profile in profiles {
        let marker = if profile.conn_id == config.default_conn_id {
            " [default]"
        } else {
            ""
        };
        match profile.port {
            Some(port) => println!("  {} ({}:{}){}", profile.conn_id, profile.host, port, marker),
            None => println!("  {} ({}){}", profile.conn_id, profile.host, marker),
        }
        for (key, value) in &profile.extra {
            println!("    {}: {}", key, value);
        }
    }
}

fn run_config_show(effective: &EffectiveConfig, json_output: bool) {
    let (value, redactions) = effective.redacted();

    if json_output {
        print_json(&serde_json::json!({
            "config": value,
            "sources": effective.sources,
            "redactions": redactions,
        }));
        return;
    }

    println!("Sources:");
    for source in &effective.sources {
        let origin = match source.origin {
            ConfigOrigin::Builtin => "builtin",
            ConfigOrigin::Host => "host",
            ConfigOrigin::Cli => "cli",
        };
        match source.path {
            Some(ref path) => println!("  {} ({})", origin, path),
            None => println!("  {}", origin),
        }
    }
    println!();
    print_json(&value);
}
