//! NLE bridge CLI - drive simulation modules through the execution bridge.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// NLE bridge - step a blocking simulation one action at a time
#[derive(Parser, Debug)]
#[command(name = "nle-bridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single episode
    Run {
        /// Simulation module file
        #[arg(required = true)]
        module: PathBuf,

        /// Core seed (default: random)
        #[arg(long)]
        seed: Option<u64>,

        /// Display seed (default: core seed + 1)
        #[arg(long)]
        disp_seed: Option<u64>,

        /// Level-generation seed ("none" disables it)
        #[arg(long)]
        lgen_seed: Option<String>,

        /// Re-derive auxiliary streams at reseed points
        #[arg(long)]
        reseed: bool,

        /// Maximum steps before giving up (default: 5000)
        #[arg(short = 'n', long, default_value = "5000")]
        max_steps: u64,

        /// Action policy
        #[arg(short, long, default_value = "random")]
        policy: cli::Policy,

        /// Settings file (JSON)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Write the trace to this file
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Run many episodes through reset, one session per module
    Rollout {
        /// Simulation module files; sessions run in parallel, one per module
        #[arg(required = true, num_args = 1..)]
        modules: Vec<PathBuf>,

        /// Episodes per module (default: 10)
        #[arg(short, long, default_value = "10")]
        episodes: u64,

        /// Starting seed (increments for each episode)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Maximum steps per episode (default: 5000)
        #[arg(short = 'n', long, default_value = "5000")]
        max_steps: u64,

        /// Action policy
        #[arg(short, long, default_value = "random")]
        policy: cli::Policy,

        /// Settings file (JSON)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Directory receiving one trace file per episode
        #[arg(long)]
        trace_dir: Option<PathBuf>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Play interactively in a terminal UI
    Play {
        /// Simulation module file
        #[arg(required = true)]
        module: PathBuf,

        /// Core seed (default: random)
        #[arg(long)]
        seed: Option<u64>,

        /// Settings file (JSON)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Write the trace to this file
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Summarise a trace file
    TraceInfo {
        /// Trace file
        #[arg(required = true)]
        trace: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nle_bridge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Commands::Run {
            module,
            seed,
            disp_seed,
            lgen_seed,
            reseed,
            max_steps,
            policy,
            settings,
            trace,
            format,
        } => cli::run::execute(&cli::run::RunArgs {
            module,
            seed,
            disp_seed,
            lgen_seed,
            reseed,
            max_steps,
            policy,
            settings,
            trace,
            format,
        }),

        Commands::Rollout {
            modules,
            episodes,
            seed,
            max_steps,
            policy,
            settings,
            trace_dir,
            threads,
            format,
            progress,
        } => cli::rollout::execute(&cli::rollout::RolloutArgs {
            modules,
            episodes,
            seed,
            max_steps,
            policy,
            settings,
            trace_dir,
            threads,
            format,
            progress,
        }),

        Commands::Play {
            module,
            seed,
            settings,
            trace,
        } => cli::play::execute(module, seed, settings, trace),

        Commands::TraceInfo { trace, format } => cli::trace_info::execute(&trace, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
