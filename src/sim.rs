//! The seam between the bridge and the wrapped simulation.
//!
//! A [`ModuleLoader`] turns a module path into a [`SimulationModule`]; the
//! module instantiates one [`Simulation`] per episode; the simulation runs on
//! the worker and blocks on [`Host::wait_for_input`] whenever it needs an
//! action.

pub mod demo;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Host;
use crate::error::{Interrupted, LoadError};
use crate::settings::Settings;

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCause {
    /// Killed.
    Died,
    /// Choked on food.
    Choking,
    /// Succumbed to poison.
    Poisoning,
    /// Starved.
    Starving,
    /// Drowned.
    Drowning,
    /// Burned.
    Burning,
    /// Dissolved in lava.
    Dissolved,
    /// Crushed.
    Crushing,
    /// Turned to stone.
    Stoning,
    /// Turned into slime.
    TurnedSlime,
    /// Genocided.
    Genocided,
    /// The engine panicked.
    Panicked,
    /// The engine hit an impossible state.
    Tricked,
    /// Quit.
    Quit,
    /// Left the dungeon.
    Escaped,
    /// Won.
    Ascended,
}

impl EndCause {
    /// Every end cause, ordered by code.
    pub const ALL: [EndCause; 16] = [
        EndCause::Died,
        EndCause::Choking,
        EndCause::Poisoning,
        EndCause::Starving,
        EndCause::Drowning,
        EndCause::Burning,
        EndCause::Dissolved,
        EndCause::Crushing,
        EndCause::Stoning,
        EndCause::TurnedSlime,
        EndCause::Genocided,
        EndCause::Panicked,
        EndCause::Tricked,
        EndCause::Quit,
        EndCause::Escaped,
        EndCause::Ascended,
    ];

    /// Numeric code (0..=15).
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Decode a numeric code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EndCause::Died => "DIED",
            EndCause::Choking => "CHOKING",
            EndCause::Poisoning => "POISONING",
            EndCause::Starving => "STARVING",
            EndCause::Drowning => "DROWNING",
            EndCause::Burning => "BURNING",
            EndCause::Dissolved => "DISSOLVED",
            EndCause::Crushing => "CRUSHING",
            EndCause::Stoning => "STONING",
            EndCause::TurnedSlime => "TURNED_SLIME",
            EndCause::Genocided => "GENOCIDED",
            EndCause::Panicked => "PANICKED",
            EndCause::Tricked => "TRICKED",
            EndCause::Quit => "QUIT",
            EndCause::Escaped => "ESCAPED",
            EndCause::Ascended => "ASCENDED",
        }
    }
}

impl fmt::Display for EndCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A blocking, turn-based control flow.
///
/// `run` is called once on the worker. It writes observations through
/// [`Host::frame`] and calls [`Host::wait_for_input`] whenever it needs an
/// action; it must propagate [`Interrupted`] so the worker can unwind.
pub trait Simulation: Send {
    /// Play one episode.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] when the driver tears the episode down.
    fn run(&mut self, host: &mut Host) -> Result<EndCause, Interrupted>;
}

/// A loaded simulation module.
pub trait SimulationModule: Send + Sync {
    /// Module name, for logs.
    fn name(&self) -> &str;

    /// A fresh simulation for one episode.
    ///
    /// `trace_name` is the base name of the trace file the episode is
    /// recorded to, empty when it isn't recorded.
    fn instantiate(&self, settings: &Settings, trace_name: &str) -> Box<dyn Simulation>;
}

/// Resolves module paths.
pub trait ModuleLoader {
    /// Load the module at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the path is missing or not a module.
    fn load(&self, path: &Path) -> Result<Arc<dyn SimulationModule>, LoadError>;
}
