//! Environment session: the lifecycle state machine.
//!
//! ```text
//!  Unstarted ──start──▶ Suspended ──step──▶ Suspended ... ──step──▶ Done
//!                           ▲                                         │
//!                           └────────────────reset────────────────────┘
//!  any state ──end──▶ Closed
//! ```
//!
//! `Running` is only held while a call is inside the simulation.

mod lease;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lease::InstanceLease;

use crate::context::{ContextOptions, ExecutionContext, Transfer};
use crate::error::{BridgeError, BridgeResult, UsageError};
use crate::obs::{ChannelKey, Element, ObservationBuffers};
use crate::seed::{SeedController, Seeds};
use crate::settings::{Settings, trace_name_for};
use crate::sim::{EndCause, ModuleLoader, SimulationModule};
use crate::trace::TraceSink;

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Created; buffers may still be bound.
    Unstarted,
    /// A call is executing the simulation.
    Running,
    /// Parked at an input request.
    Suspended,
    /// The episode ended; only `reset` and `end` remain.
    Done,
    /// Torn down.
    Closed,
}

#[derive(Debug, Clone, Copy, Default)]
struct EpisodeStatus {
    how_done: Option<EndCause>,
    in_normal_game: bool,
    steps: u64,
}

/// One bridge instance coordinating one simulation lifetime.
///
/// The session borrows the caller's observation buffers for `'b`; read them
/// between calls through [`Session::observation`].
pub struct Session<'b> {
    module: Arc<dyn SimulationModule>,
    module_path: PathBuf,
    settings: Settings,
    trace_name: String,
    buffers: ObservationBuffers<'b>,
    seeds: SeedController,
    context: Option<ExecutionContext>,
    trace: Option<TraceSink>,
    lifecycle: Lifecycle,
    status: EpisodeStatus,
    episodes: u64,
    lease: Option<InstanceLease>,
}

impl<'b> Session<'b> {
    /// Load the module at `module_path` and claim it for this session.
    ///
    /// Pending seeds from `settings.initial_seeds` are queued for the first
    /// episode.
    ///
    /// # Errors
    ///
    /// Returns a validation error for oversized settings,
    /// [`BridgeError::Load`] if the module can't be loaded, and
    /// [`BridgeError::InstanceBusy`] if another session holds it.
    pub fn new(
        module_path: &Path,
        loader: &dyn ModuleLoader,
        settings: Settings,
    ) -> BridgeResult<Self> {
        settings.validate()?;
        let module = loader
            .load(module_path)
            .map_err(|source| BridgeError::Load {
                path: module_path.to_path_buf(),
                source,
            })?;
        let lease = InstanceLease::acquire(module_path).ok_or_else(|| BridgeError::InstanceBusy {
            path: module_path.to_path_buf(),
        })?;

        let mut seeds = SeedController::new();
        if let Some(initial) = settings.initial_seeds {
            seeds.set_initial(initial);
        }

        tracing::debug!(
            module = module.name(),
            path = %lease.key().display(),
            "session created"
        );
        Ok(Self {
            module,
            module_path: module_path.to_path_buf(),
            settings,
            trace_name: String::new(),
            buffers: ObservationBuffers::new(),
            seeds,
            context: None,
            trace: None,
            lifecycle: Lifecycle::Unstarted,
            status: EpisodeStatus::default(),
            episodes: 0,
            lease: Some(lease),
        })
    }

    /// Bind the observation buffers. Only legal before the first episode.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::BuffersAfterStart`] once started.
    pub fn set_buffers(&mut self, buffers: ObservationBuffers<'b>) -> BridgeResult<()> {
        match self.lifecycle {
            Lifecycle::Unstarted => {
                self.buffers = buffers;
                Ok(())
            }
            Lifecycle::Closed => Err(UsageError::Closed.into()),
            _ => Err(UsageError::BuffersAfterStart.into()),
        }
    }

    /// Run the first episode up to its first input request.
    ///
    /// With a trace path, the path is validated and the file opened before
    /// anything else happens.
    ///
    /// # Errors
    ///
    /// Usage errors if the session already started or closed, validation and
    /// [`BridgeError::TraceOpen`] errors for the trace path, and
    /// [`BridgeError::EndedBeforeInput`] if the simulation exits at once.
    pub fn start(&mut self, trace: Option<&Path>) -> BridgeResult<()> {
        match self.lifecycle {
            Lifecycle::Unstarted => {}
            Lifecycle::Closed => return Err(UsageError::Closed.into()),
            _ => return Err(UsageError::AlreadyStarted.into()),
        }
        if let Some(path) = trace {
            let name = trace_name_for(path)?;
            self.trace = Some(TraceSink::open(path)?);
            self.trace_name = name;
        }
        tracing::info!(module = self.module.name(), "starting session");
        self.launch()
    }

    /// Deliver `action` and run to the next input request or exit.
    ///
    /// Returns whether the episode is done.
    ///
    /// # Errors
    ///
    /// [`UsageError::NotStarted`] before `start`, [`UsageError::StepAfterDone`]
    /// once done, [`UsageError::AlreadyRunning`] while the simulation runs,
    /// [`BridgeError::TraceWrite`] if the trace can't be written,
    /// and context errors if the simulation crashed.
    pub fn step(&mut self, action: i32) -> BridgeResult<bool> {
        match self.lifecycle {
            Lifecycle::Suspended => {}
            Lifecycle::Unstarted => return Err(UsageError::NotStarted.into()),
            Lifecycle::Done => return Err(UsageError::StepAfterDone.into()),
            Lifecycle::Running => return Err(UsageError::AlreadyRunning.into()),
            Lifecycle::Closed => return Err(UsageError::Closed.into()),
        }
        let Some(context) = self.context.as_mut() else {
            return Err(UsageError::NotStarted.into());
        };
        if let Some(sink) = self.trace.as_mut() {
            sink.write_input(action).map_err(BridgeError::TraceWrite)?;
        }

        self.lifecycle = Lifecycle::Running;
        match context.resume(action, &mut self.buffers) {
            Ok(transfer) => {
                self.status.steps += 1;
                self.absorb(transfer)?;
                Ok(self.done())
            }
            Err(e) => {
                self.context = None;
                self.lifecycle = Lifecycle::Done;
                Err(e.into())
            }
        }
    }

    /// Discard the current episode and run a fresh one to its first input
    /// request.
    ///
    /// With a trace path the new file is opened before the old episode is
    /// touched; the old file is closed only after the new episode is
    /// running. If the new episode fails to start, the previous trace sink
    /// stays in place. Without a path the current sink keeps receiving
    /// frames and the embedded trace name is cleared.
    ///
    /// # Errors
    ///
    /// [`UsageError::NotStarted`] before `start`, trace validation and open
    /// errors, and [`BridgeError::EndedBeforeInput`] if the new episode exits
    /// at once.
    pub fn reset(&mut self, trace: Option<&Path>) -> BridgeResult<()> {
        match self.lifecycle {
            Lifecycle::Unstarted => return Err(UsageError::NotStarted.into()),
            Lifecycle::Closed => return Err(UsageError::Closed.into()),
            Lifecycle::Running | Lifecycle::Suspended | Lifecycle::Done => {}
        }
        let incoming = match trace {
            Some(path) => {
                let name = trace_name_for(path)?;
                Some((TraceSink::open(path)?, name))
            }
            None => None,
        };

        self.context = None;
        let previous_name = self.trace_name.clone();
        let retired = match incoming {
            Some((sink, name)) => {
                tracing::debug!(to = %sink.path().display(), "rotating trace");
                self.trace_name = name;
                Some(self.trace.replace(sink))
            }
            None => {
                self.trace_name.clear();
                None
            }
        };

        tracing::info!(module = self.module.name(), episode = self.episodes + 1, "resetting session");
        let launched = self.launch();

        let Some(old) = retired else {
            return launched;
        };
        match launched {
            Ok(()) => {
                if let Some(old) = old {
                    old.close().map_err(BridgeError::TraceWrite)?;
                }
                Ok(())
            }
            Err(e) => {
                let failed = std::mem::replace(&mut self.trace, old);
                self.trace_name = previous_name;
                if let Some(failed) = failed
                    && let Err(close_err) = failed.close()
                {
                    tracing::warn!(error = %close_err, "failed to close abandoned trace");
                }
                Err(e)
            }
        }
    }

    /// Tear everything down. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TraceWrite`] if buffered trace frames can't be
    /// flushed; the session is closed regardless.
    pub fn end(&mut self) -> BridgeResult<()> {
        if self.lifecycle == Lifecycle::Closed {
            return Ok(());
        }
        self.context = None;
        self.lifecycle = Lifecycle::Closed;
        self.lease = None;
        tracing::info!(
            module = self.module.name(),
            episodes = self.episodes,
            "session ended"
        );
        match self.trace.take() {
            Some(sink) => sink.close().map_err(BridgeError::TraceWrite),
            None => Ok(()),
        }
    }

    /// Replace the settings used by the next `start`/`reset`.
    ///
    /// The embedded trace name is kept; `initial_seeds` in the new settings
    /// are queued as pending.
    ///
    /// # Errors
    ///
    /// Validation errors for oversized fields and [`UsageError::Closed`]
    /// after `end`.
    pub fn update_settings(&mut self, settings: Settings) -> BridgeResult<()> {
        if self.lifecycle == Lifecycle::Closed {
            return Err(UsageError::Closed.into());
        }
        settings.validate()?;
        self.settings = settings;
        if let Some(initial) = self.settings.initial_seeds {
            self.seeds.set_initial(initial);
        }
        Ok(())
    }

    /// Queue seeds for the next `start`/`reset`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::Closed`] after `end`.
    pub fn set_initial_seeds(&mut self, seeds: Seeds) -> BridgeResult<()> {
        if self.lifecycle == Lifecycle::Closed {
            return Err(UsageError::Closed.into());
        }
        self.seeds.set_initial(seeds);
        Ok(())
    }

    /// Re-seed the running episode immediately.
    ///
    /// # Errors
    ///
    /// [`UsageError::SeedsBeforeStart`] before `start` and context errors if
    /// the simulation is gone.
    pub fn set_seeds(&mut self, seeds: Seeds) -> BridgeResult<()> {
        match self.lifecycle {
            Lifecycle::Unstarted => return Err(UsageError::SeedsBeforeStart.into()),
            Lifecycle::Closed => return Err(UsageError::Closed.into()),
            _ => {}
        }
        if let Some(context) = self.context.as_mut().filter(|c| !c.is_finished()) {
            context.reseed(&seeds)?;
        }
        self.seeds.set_live(seeds);
        Ok(())
    }

    /// Seeds in effect for the current episode.
    ///
    /// # Errors
    ///
    /// [`UsageError::SeedsBeforeStart`] before `start`.
    pub fn get_seeds(&self) -> BridgeResult<Seeds> {
        match self.lifecycle {
            Lifecycle::Unstarted => Err(UsageError::SeedsBeforeStart.into()),
            Lifecycle::Closed => Err(UsageError::Closed.into()),
            _ => self
                .seeds
                .current()
                .ok_or_else(|| UsageError::SeedsBeforeStart.into()),
        }
    }

    /// Whether seeds wait for the next episode.
    #[must_use]
    pub fn seeds_pending(&self) -> bool {
        self.seeds.is_pending()
    }

    /// Read a bound channel as of the latest suspend point.
    #[must_use]
    pub fn observation<T: Element>(&self, key: ChannelKey<T>) -> Option<&[T]> {
        self.buffers.get(key)
    }

    /// Whether the current episode ended.
    #[must_use]
    pub fn done(&self) -> bool {
        self.lifecycle == Lifecycle::Done
    }

    /// How the current episode ended, once done.
    #[must_use]
    pub fn how_done(&self) -> Option<EndCause> {
        self.status.how_done
    }

    /// Whether the simulation last asked for input from its normal loop.
    #[must_use]
    pub fn in_normal_game(&self) -> bool {
        self.status.in_normal_game
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Settings in effect.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Embedded trace name; empty without a trace.
    #[must_use]
    pub fn trace_name(&self) -> &str {
        &self.trace_name
    }

    /// Path of the trace currently written, if any.
    #[must_use]
    pub fn trace_path(&self) -> Option<&Path> {
        self.trace.as_ref().map(TraceSink::path)
    }

    /// Steps taken in the current episode.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.status.steps
    }

    /// Episodes started so far.
    #[must_use]
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    /// Path the module was loaded from.
    #[must_use]
    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// Instantiate the simulation and run it to its first input request.
    fn launch(&mut self) -> BridgeResult<()> {
        let seeds = self.seeds.begin_episode();
        let simulation = self.module.instantiate(&self.settings, &self.trace_name);
        let options = ContextOptions {
            stack_size: self.settings.stack_size,
        };

        self.episodes += 1;
        self.status = EpisodeStatus::default();
        self.lifecycle = Lifecycle::Running;

        let mut context = match ExecutionContext::create(simulation, seeds, options) {
            Ok(context) => context,
            Err(e) => {
                self.lifecycle = Lifecycle::Done;
                return Err(e.into());
            }
        };
        let transfer = match context.enter(&mut self.buffers) {
            Ok(transfer) => transfer,
            Err(e) => {
                self.lifecycle = Lifecycle::Done;
                return Err(e.into());
            }
        };
        self.context = Some(context);

        self.absorb(transfer)?;
        if self.done() {
            tracing::error!(how = ?self.status.how_done, "simulation ended before its first input request");
            return Err(BridgeError::EndedBeforeInput);
        }
        Ok(())
    }

    /// Update the episode state from a transfer, then write its trace frames.
    fn absorb(&mut self, mut transfer: Transfer) -> BridgeResult<()> {
        let frames = transfer.take_trace();
        match transfer {
            Transfer::Suspended(s) => {
                self.status.in_normal_game = s.in_normal_game;
                self.lifecycle = Lifecycle::Suspended;
            }
            Transfer::Exited(exit) => {
                self.status.how_done = Some(exit.how);
                self.status.in_normal_game = false;
                self.lifecycle = Lifecycle::Done;
                self.context = None;
                tracing::debug!(how = %exit.how, steps = self.status.steps, "episode done");
            }
        }
        if let Some(sink) = self.trace.as_mut() {
            for frame in &frames {
                sink.write_frame(frame).map_err(BridgeError::TraceWrite)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("module", &self.module.name())
            .field("module_path", &self.module_path)
            .field("lifecycle", &self.lifecycle)
            .field("buffers", &self.buffers)
            .field("trace", &self.trace_path())
            .field("episodes", &self.episodes)
            .finish_non_exhaustive()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.end() {
            tracing::warn!(error = %e, "error while ending session");
        }
    }
}
