//! Simulation side of the execution context.

use std::mem;
use std::sync::mpsc::{Receiver, SyncSender};

use super::{Command, Exit, Reply, Suspension, Transfer};
use crate::error::Interrupted;
use crate::obs::{Frame, FrameTarget};
use crate::seed::{RngStreams, Seeds};
use crate::sim::EndCause;
use crate::trace::TraceFrame;

/// What the simulation reports when it asks for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRequest {
    /// Whether the request comes from the normal game loop, as opposed to a
    /// prompt or menu.
    pub in_normal_game: bool,
}

impl Default for InputRequest {
    fn default() -> Self {
        Self {
            in_normal_game: true,
        }
    }
}

/// Everything a running simulation may touch: the caller's buffers for the
/// current resume window, its RNG streams, and the trace output queue.
#[derive(Debug)]
pub struct Host {
    target: Option<FrameTarget>,
    rng: RngStreams,
    trace: Vec<TraceFrame>,
    commands: Receiver<Command>,
    replies: SyncSender<Reply>,
}

impl Host {
    pub(crate) fn new(
        rng: RngStreams,
        commands: Receiver<Command>,
        replies: SyncSender<Reply>,
    ) -> Self {
        Self {
            target: None,
            rng,
            trace: Vec::new(),
            commands,
            replies,
        }
    }

    /// The caller's buffers for the current resume window.
    pub fn frame(&mut self) -> Frame<'_> {
        Frame::new(self.target.as_mut())
    }

    /// The seeded random streams.
    pub fn rng(&mut self) -> &mut RngStreams {
        &mut self.rng
    }

    /// Queue bytes of display output for the trace.
    pub fn record(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.trace.push(TraceFrame::output(bytes.to_vec()));
        }
    }

    /// Suspend point: give control back to the driver and wait for the next
    /// action.
    ///
    /// The frame is detached while suspended. Reseed requests that arrive
    /// while parked are applied without waking the simulation.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] once the driver tore the context down. The
    /// simulation should propagate it and return.
    pub fn wait_for_input(&mut self, request: InputRequest) -> Result<i32, Interrupted> {
        self.target = None;
        let suspension = Suspension {
            in_normal_game: request.in_normal_game,
            trace: mem::take(&mut self.trace),
        };
        self.replies
            .send(Reply::Transfer(Transfer::Suspended(suspension)))
            .map_err(|_| Interrupted)?;

        loop {
            match self.commands.recv().map_err(|_| Interrupted)? {
                Command::Resume { action, target } => {
                    self.target = Some(target);
                    return Ok(action);
                }
                Command::Reseed(seeds) => self.apply_reseed(&seeds)?,
                Command::Start(_) => {
                    tracing::error!("start delivered to a running simulation");
                    return Err(Interrupted);
                }
            }
        }
    }

    /// Block until the driver enters the context.
    pub(crate) fn park(&mut self) -> Result<(), Interrupted> {
        loop {
            match self.commands.recv().map_err(|_| Interrupted)? {
                Command::Start(target) => {
                    self.target = Some(target);
                    return Ok(());
                }
                Command::Reseed(seeds) => self.apply_reseed(&seeds)?,
                Command::Resume { .. } => {
                    tracing::error!("action delivered before the simulation started");
                    return Err(Interrupted);
                }
            }
        }
    }

    /// Report the end of the simulation; the frame is detached first.
    pub(crate) fn exit(mut self, how: EndCause) {
        self.target = None;
        let exit = Exit {
            how,
            trace: mem::take(&mut self.trace),
        };
        if self
            .replies
            .send(Reply::Transfer(Transfer::Exited(exit)))
            .is_err()
        {
            tracing::debug!("driver went away before the exit was reported");
        }
    }

    fn apply_reseed(&mut self, seeds: &Seeds) -> Result<(), Interrupted> {
        self.rng.apply(seeds);
        tracing::debug!(core = seeds.core, disp = seeds.disp, "streams reseeded");
        self.replies.send(Reply::Reseeded).map_err(|_| Interrupted)
    }
}
