//! Run command implementation.

use super::output::{EpisodeSummary, format_episode, on_stairs};
use super::store::ObservationStore;
use super::{Agent, CliError, OutputFormat, Policy, clock_seed, load_settings};
use nle_bridge::seed::parse_generation_seed;
use nle_bridge::sim::demo::DemoLoader;
use nle_bridge::{Seeds, Session};
use std::path::PathBuf;

/// Arguments of the `run` command.
#[derive(Debug)]
pub(crate) struct RunArgs {
    pub(crate) module: PathBuf,
    pub(crate) seed: Option<u64>,
    pub(crate) disp_seed: Option<u64>,
    pub(crate) lgen_seed: Option<String>,
    pub(crate) reseed: bool,
    pub(crate) max_steps: u64,
    pub(crate) policy: Policy,
    pub(crate) settings: Option<PathBuf>,
    pub(crate) trace: Option<PathBuf>,
    pub(crate) format: OutputFormat,
}

impl RunArgs {
    fn seeds(&self) -> Seeds {
        let core = self.seed.unwrap_or_else(clock_seed);
        let disp = self.disp_seed.unwrap_or_else(|| core.wrapping_add(1));
        let lgen = self.lgen_seed.as_deref().and_then(parse_generation_seed);
        Seeds::new(core, disp, self.reseed).with_lgen(lgen)
    }
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the module can't be loaded or the session fails.
pub(crate) fn execute(args: &RunArgs) -> Result<(), CliError> {
    let mut settings = load_settings(args.settings.as_deref())?;
    let seeds = args.seeds();
    settings.initial_seeds = Some(seeds);

    let mut store = ObservationStore::new();
    let mut session = Session::new(&args.module, &DemoLoader, settings)?;
    session.set_buffers(store.bind_status()?)?;
    session.start(args.trace.as_deref())?;

    let mut agent = Agent::new(args.policy, seeds.core);
    while !session.done() && session.steps() < args.max_steps {
        let action = agent.next_action(on_stairs(&session));
        session.step(action)?;
    }
    if !session.done() {
        tracing::warn!(max_steps = args.max_steps, "step limit reached");
    }

    let result = EpisodeSummary::from_session(&session, session.get_seeds()?);
    session.end()?;

    match args.format {
        OutputFormat::Text => print!("{}", format_episode(&result)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| CliError::new(format!("JSON serialization failed: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}
