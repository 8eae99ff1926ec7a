//! Rollout command implementation.

use super::output::{EpisodeSummary, RolloutSummary, format_rollout, on_stairs};
use super::store::ObservationStore;
use super::{Agent, CliError, OutputFormat, Policy, clock_seed, load_settings};
use indicatif::{ProgressBar, ProgressStyle};
use nle_bridge::settings::Settings;
use nle_bridge::sim::demo::DemoLoader;
use nle_bridge::{Seeds, Session};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Arguments of the `rollout` command.
#[derive(Debug)]
pub(crate) struct RolloutArgs {
    pub(crate) modules: Vec<PathBuf>,
    pub(crate) episodes: u64,
    pub(crate) seed: Option<u64>,
    pub(crate) max_steps: u64,
    pub(crate) policy: Policy,
    pub(crate) settings: Option<PathBuf>,
    pub(crate) trace_dir: Option<PathBuf>,
    pub(crate) threads: Option<usize>,
    pub(crate) format: OutputFormat,
    pub(crate) progress: bool,
}

/// Per-thread accumulator.
#[derive(Debug, Default)]
struct RolloutStats {
    results: Vec<EpisodeSummary>,
    errors: Vec<String>,
}

impl RolloutStats {
    fn merge(&mut self, other: Self) {
        self.results.extend(other.results);
        self.errors.extend(other.errors);
    }
}

/// Execute the rollout command.
///
/// Each module gets its own session; sessions run in parallel and each one
/// plays its episodes back to back through `reset`.
///
/// # Errors
///
/// Returns an error if any session fails.
pub(crate) fn execute(args: &RolloutArgs) -> Result<(), CliError> {
    if args.episodes == 0 {
        return Err(CliError::new("Need at least 1 episode"));
    }
    let settings = load_settings(args.settings.as_deref())?;
    if let Some(dir) = &args.trace_dir {
        fs::create_dir_all(dir)?;
    }

    if let Some(num_threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let base_seed = args.seed.unwrap_or_else(clock_seed);
    let total = args.episodes * args.modules.len() as u64;
    tracing::info!(
        modules = args.modules.len(),
        episodes = total,
        base_seed,
        "starting rollout"
    );

    let pb = if args.progress {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} episodes ({per_sec})")
                .map_err(|e| CliError::new(format!("invalid progress template: {e}")))?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start_time = Instant::now();
    let stats = args
        .modules
        .par_iter()
        .enumerate()
        .fold(RolloutStats::default, |mut local, (index, module)| {
            let first_seed = base_seed.wrapping_add(index as u64 * args.episodes);
            match run_module(module, first_seed, args, &settings, pb.as_ref()) {
                Ok(results) => local.results.extend(results),
                Err(e) => local.errors.push(format!("{}: {e}", module.display())),
            }
            local
        })
        .reduce(RolloutStats::default, |mut a, b| {
            a.merge(b);
            a
        });
    let duration = start_time.elapsed();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    if !stats.errors.is_empty() {
        return Err(CliError::new(stats.errors.join("\n")));
    }

    let summary = summarize(stats.results, duration.as_secs_f64());
    match args.format {
        OutputFormat::Text => print!("{}", format_rollout(&summary)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Play every episode of one module in a single session.
fn run_module(
    module: &Path,
    first_seed: u64,
    args: &RolloutArgs,
    settings: &Settings,
    pb: Option<&ProgressBar>,
) -> Result<Vec<EpisodeSummary>, CliError> {
    let mut store = ObservationStore::new();
    let mut session = Session::new(module, &DemoLoader, settings.clone())?;
    session.set_buffers(store.bind_status()?)?;

    let mut results = Vec::with_capacity(usize::try_from(args.episodes).unwrap_or(0));
    for episode in 0..args.episodes {
        let seed = first_seed.wrapping_add(episode);
        let seeds = Seeds::new(seed, seed.wrapping_add(1), false);
        session.set_initial_seeds(seeds)?;

        let trace = args
            .trace_dir
            .as_deref()
            .map(|dir| trace_path(dir, module, episode));
        if episode == 0 {
            session.start(trace.as_deref())?;
        } else {
            session.reset(trace.as_deref())?;
        }

        let mut agent = Agent::new(args.policy, seed);
        while !session.done() && session.steps() < args.max_steps {
            let action = agent.next_action(on_stairs(&session));
            session.step(action)?;
        }
        results.push(EpisodeSummary::from_session(&session, seeds));
        if let Some(pb) = pb {
            pb.inc(1);
        }
    }
    session.end()?;
    Ok(results)
}

/// `<dir>/<module stem>-<episode>.ttyrec`
fn trace_path(dir: &Path, module: &Path, episode: u64) -> PathBuf {
    let stem = module
        .file_stem()
        .map_or_else(|| "module".to_string(), |s| s.to_string_lossy().to_string());
    dir.join(format!("{stem}-{episode:04}.ttyrec"))
}

#[allow(clippy::cast_precision_loss)]
fn summarize(mut results: Vec<EpisodeSummary>, duration_secs: f64) -> RolloutSummary {
    results.sort_by(|a, b| a.module.cmp(&b.module).then(a.seeds.core.cmp(&b.seeds.core)));

    let mut end_causes = BTreeMap::new();
    for result in &results {
        let cause = result.end.map_or("TIMEOUT", |how| how.name());
        *end_causes.entry(cause.to_string()).or_default() += 1;
    }
    let total_steps: u64 = results.iter().map(|r| r.steps).sum();
    let score_sum: i64 = results.iter().map(|r| r.score).sum();
    let episodes = results.len() as u64;

    RolloutSummary {
        episodes,
        total_steps,
        duration_secs,
        steps_per_sec: if duration_secs > 0.0 {
            total_steps as f64 / duration_secs
        } else {
            0.0
        },
        end_causes,
        mean_score: score_sum as f64 / episodes.max(1) as f64,
        max_depth: results.iter().map(|r| r.depth).max().unwrap_or(0),
        results,
    }
}
