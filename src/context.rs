//! Execution context bridge.
//!
//! The simulation runs on a dedicated worker thread and talks to the driver
//! through two zero-capacity rendezvous channels. Every send blocks until the
//! other side receives, so at any instant exactly one of driver and
//! simulation is running:
//!
//! ```text
//!  driver                         worker (simulation)
//!  ──────                         ───────────────────
//!  create() ───spawn──────────▶  parked, nothing run yet
//!  enter()  ───Start(target)──▶  run() ... wait_for_input()
//!           ◀──Suspended──────   (target dropped, parked)
//!  resume(a) ──Resume(a)──────▶  ... wait_for_input()
//!           ◀──Suspended──────
//!  resume(a) ──Resume(a)──────▶  ... run() returns
//!           ◀──Exited─────────   thread ends
//!  drop     ───close──────────▶  wait_for_input() -> Interrupted
//! ```

mod host;

pub use host::{Host, InputRequest};

use std::any::Any;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::error::ContextError;
use crate::obs::{FrameTarget, ObservationBuffers};
use crate::seed::{RngStreams, Seeds};
use crate::settings::DEFAULT_STACK_SIZE;
use crate::sim::{EndCause, Simulation};
use crate::trace::TraceFrame;

/// Name given to worker threads.
pub const WORKER_NAME: &str = "nle-sim";

/// Parameters for creating a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Stack size of the worker, in bytes.
    pub stack_size: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

/// Driver to worker.
pub(crate) enum Command {
    /// Run the simulation up to its first input request.
    Start(FrameTarget),
    /// Deliver an action and run to the next input request.
    Resume { action: i32, target: FrameTarget },
    /// Replace the RNG streams while suspended.
    Reseed(Seeds),
}

/// Worker to driver.
pub(crate) enum Reply {
    Transfer(Transfer),
    Reseeded,
}

/// What the simulation handed back when it gave up control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    /// Parked at an input request.
    Suspended(Suspension),
    /// The entry function returned; the context is inert.
    Exited(Exit),
}

impl Transfer {
    /// Trace output produced since the previous transfer.
    #[must_use]
    pub fn trace(&self) -> &[TraceFrame] {
        match self {
            Transfer::Suspended(s) => &s.trace,
            Transfer::Exited(e) => &e.trace,
        }
    }

    /// Take the trace output out of the transfer.
    pub fn take_trace(&mut self) -> Vec<TraceFrame> {
        match self {
            Transfer::Suspended(s) => std::mem::take(&mut s.trace),
            Transfer::Exited(e) => std::mem::take(&mut e.trace),
        }
    }
}

/// State reported at a suspend point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspension {
    /// Whether the simulation is inside its normal game loop.
    pub in_normal_game: bool,
    /// Trace output produced since the previous transfer.
    pub trace: Vec<TraceFrame>,
}

/// State reported when the simulation finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exit {
    /// How the episode ended.
    pub how: EndCause,
    /// Trace output produced since the previous transfer.
    pub trace: Vec<TraceFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextState {
    Created,
    Suspended,
    Finished,
}

/// A simulation's suspended control flow.
///
/// Dropping the context interrupts the simulation at its pending suspend
/// point and joins the worker. Both channel ends are closed before the
/// join, so a simulation that keeps asking for input after [`Interrupted`]
/// sees every later request fail instead of blocking.
///
/// [`Interrupted`]: crate::error::Interrupted
#[derive(Debug)]
pub struct ExecutionContext {
    commands: Option<SyncSender<Command>>,
    replies: Option<Receiver<Reply>>,
    worker: Option<JoinHandle<()>>,
    state: ContextState,
}

impl ExecutionContext {
    /// Bind `simulation` to a fresh worker. Nothing runs until
    /// [`ExecutionContext::enter`].
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Spawn`] if the worker thread can't be created.
    pub fn create(
        simulation: Box<dyn Simulation>,
        seeds: Seeds,
        options: ContextOptions,
    ) -> Result<Self, ContextError> {
        let (command_tx, command_rx) = mpsc::sync_channel::<Command>(0);
        let (reply_tx, reply_rx) = mpsc::sync_channel::<Reply>(0);

        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .stack_size(options.stack_size)
            .spawn(move || {
                worker_main(simulation, RngStreams::new(&seeds), command_rx, reply_tx);
            })
            .map_err(ContextError::Spawn)?;

        tracing::trace!(stack_size = options.stack_size, "execution context created");
        Ok(Self {
            commands: Some(command_tx),
            replies: Some(reply_rx),
            worker: Some(worker),
            state: ContextState::Created,
        })
    }

    /// Run the simulation until its first input request or exit.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::AlreadyEntered`] or [`ContextError::Finished`]
    /// if the context already ran, and [`ContextError::Crashed`] if the
    /// simulation panicked.
    pub fn enter(
        &mut self,
        buffers: &mut ObservationBuffers<'_>,
    ) -> Result<Transfer, ContextError> {
        match self.state {
            ContextState::Created => self.transfer(Command::Start(buffers.target())),
            ContextState::Suspended => Err(ContextError::AlreadyEntered),
            ContextState::Finished => Err(ContextError::Finished),
        }
    }

    /// Hand `action` to the suspended simulation and run it until its next
    /// input request or exit.
    ///
    /// `buffers` is exclusively borrowed for the whole call; the simulation
    /// writes into it and gives it back before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotEntered`] before [`ExecutionContext::enter`],
    /// [`ContextError::Finished`] after the simulation exited, and
    /// [`ContextError::Crashed`] if it panicked.
    pub fn resume(
        &mut self,
        action: i32,
        buffers: &mut ObservationBuffers<'_>,
    ) -> Result<Transfer, ContextError> {
        match self.state {
            ContextState::Created => Err(ContextError::NotEntered),
            ContextState::Suspended => self.transfer(Command::Resume {
                action,
                target: buffers.target(),
            }),
            ContextState::Finished => Err(ContextError::Finished),
        }
    }

    /// Re-seed the suspended simulation's RNG streams.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Finished`] after exit and
    /// [`ContextError::Crashed`] if the worker is gone.
    pub fn reseed(&mut self, seeds: &Seeds) -> Result<(), ContextError> {
        if self.state == ContextState::Finished {
            return Err(ContextError::Finished);
        }
        self.send(Command::Reseed(*seeds))?;
        match self.receive() {
            Some(Reply::Reseeded) => Ok(()),
            Some(Reply::Transfer(_)) | None => Err(self.reap()),
        }
    }

    /// Whether the simulation's entry function has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == ContextState::Finished
    }

    fn transfer(&mut self, command: Command) -> Result<Transfer, ContextError> {
        self.send(command)?;
        match self.receive() {
            Some(Reply::Transfer(transfer)) => {
                match transfer {
                    Transfer::Suspended(_) => self.state = ContextState::Suspended,
                    Transfer::Exited(_) => self.finish(),
                }
                Ok(transfer)
            }
            Some(Reply::Reseeded) | None => Err(self.reap()),
        }
    }

    fn receive(&self) -> Option<Reply> {
        self.replies.as_ref().and_then(|replies| replies.recv().ok())
    }

    /// Close both channel ends so the worker can't block on either.
    fn disconnect(&mut self) {
        self.commands = None;
        self.replies = None;
    }

    fn send(&mut self, command: Command) -> Result<(), ContextError> {
        let Some(commands) = self.commands.as_ref() else {
            return Err(ContextError::Finished);
        };
        if commands.send(command).is_err() {
            return Err(self.reap());
        }
        Ok(())
    }

    /// Normal exit: close the channel and join.
    fn finish(&mut self) {
        self.state = ContextState::Finished;
        self.disconnect();
        if let Some(worker) = self.worker.take()
            && let Err(payload) = worker.join()
        {
            tracing::warn!(
                panic = %panic_message(payload.as_ref()),
                "worker panicked after exit"
            );
        }
    }

    /// The worker vanished mid-protocol; collect why.
    fn reap(&mut self) -> ContextError {
        self.state = ContextState::Finished;
        self.disconnect();
        let message = match self.worker.take().map(JoinHandle::join) {
            Some(Err(payload)) => panic_message(payload.as_ref()),
            _ => "worker stopped without replying".to_string(),
        };
        tracing::error!(%message, "simulation crashed");
        ContextError::Crashed(message)
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.disconnect();
        if let Some(worker) = self.worker.take()
            && let Err(payload) = worker.join()
        {
            tracing::warn!(
                panic = %panic_message(payload.as_ref()),
                "simulation panicked during teardown"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn worker_main(
    mut simulation: Box<dyn Simulation>,
    rng: RngStreams,
    commands: Receiver<Command>,
    replies: SyncSender<Reply>,
) {
    let mut host = Host::new(rng, commands, replies);
    if host.park().is_err() {
        return;
    }
    match simulation.run(&mut host) {
        Ok(how) => host.exit(how),
        Err(_) => tracing::trace!("simulation interrupted"),
    }
}
