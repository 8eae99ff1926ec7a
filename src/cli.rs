//! CLI command implementations for the NLE bridge.

pub(crate) mod play;
pub(crate) mod rollout;
pub(crate) mod run;
pub(crate) mod trace_info;

mod output;
mod store;

use clap::ValueEnum;
use nle_bridge::settings::{Settings, SettingsError};
use nle_bridge::sim::demo::ACTIONS;
use nle_bridge::BridgeError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::fmt;
use std::path::Path;

/// Output format for the `run`, `rollout` and `trace-info` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// How actions are chosen for unattended episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Policy {
    /// Uniform over movement, search and descend.
    Random,
    /// Like `random`, but always descends when standing on stairs.
    Descend,
    /// Search in place every turn.
    Wait,
}

/// Picks actions for one episode.
#[derive(Debug)]
pub(crate) struct Agent {
    policy: Policy,
    rng: StdRng,
}

impl Agent {
    /// An agent whose random choices are drawn from `seed`.
    pub(crate) fn new(policy: Policy, seed: u64) -> Self {
        Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next action given whether the hero stands on the down stairs.
    pub(crate) fn next_action(&mut self, on_stairs: bool) -> i32 {
        // Quit and escape are the last two entries; never pick them.
        let playable = &ACTIONS[..ACTIONS.len() - 2];
        let key = match self.policy {
            Policy::Wait => b's',
            Policy::Descend if on_stairs => b'>',
            Policy::Random | Policy::Descend => playable[self.rng.gen_range(0..playable.len())],
        };
        i32::from(key)
    }
}

/// Load settings from `path` if given, otherwise defaults.
pub(crate) fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    path.map_or_else(|| Ok(Settings::default()), |p| Ok(Settings::from_json_file(p)?))
}

/// A seed from the wall clock, for runs without `--seed`.
pub(crate) fn clock_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() ^ u64::from(d.subsec_nanos()))
        .unwrap_or(42)
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<BridgeError> for CliError {
    fn from(e: BridgeError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<SettingsError> for CliError {
    fn from(e: SettingsError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<nle_bridge::ValidationError> for CliError {
    fn from(e: nle_bridge::ValidationError) -> Self {
        Self::new(e.to_string())
    }
}
