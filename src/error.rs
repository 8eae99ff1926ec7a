//! Error types for the execution bridge.
//!
//! Every failure is synchronous and raised by the call that caused it.
//! [`BridgeError`] is what the public API returns; the narrower enums
//! group the usage, validation, loading and execution-context failures.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::obs::{Channel, DType};

/// Result alias used throughout the crate.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Top-level error returned by the session and entry-point API.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The call is not legal in the session's current state.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// An input failed validation before any side effect happened.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The simulation module could not be loaded.
    #[error("failed to load simulation module {}: {source}", path.display())]
    Load {
        /// Module path that was requested.
        path: PathBuf,
        /// Underlying loader failure.
        #[source]
        source: LoadError,
    },

    /// Another live session already owns this module in this process.
    #[error("simulation module {} already has an active session", path.display())]
    InstanceBusy {
        /// Canonical module path.
        path: PathBuf,
    },

    /// The trace file could not be opened.
    #[error("failed to open trace file {}: {source}", path.display())]
    TraceOpen {
        /// Offending path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// Writing or flushing the trace sink failed.
    #[error("trace write failed: {0}")]
    TraceWrite(#[source] io::Error),

    /// The simulation terminated before reaching its first input request.
    #[error("simulation done right after reset")]
    EndedBeforeInput,

    /// The execution context failed.
    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Calls made in a lifecycle state that does not allow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    /// `step` (or a context-dependent call) before `start`/`reset`.
    #[error("step called without start() or reset()")]
    NotStarted,
    /// `start` on a session that already left the unstarted state.
    #[error("start called on a session that was already started")]
    AlreadyStarted,
    /// `step` after the episode finished.
    #[error("step called on a finished episode")]
    StepAfterDone,
    /// A call arrived while the simulation was still executing.
    #[error("step called while the simulation is running")]
    AlreadyRunning,
    /// Buffers rebound after the session engaged the simulation.
    #[error("set_buffers called after start()")]
    BuffersAfterStart,
    /// Seed query or live reseed before any episode started.
    #[error("seed access requires a started session")]
    SeedsBeforeStart,
    /// Any call other than `end` after the session was closed.
    #[error("session is closed")]
    Closed,
}

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A string does not fit its fixed embedded field.
    #[error("{field} too long ({len} bytes, capacity {capacity})")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Supplied length in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        capacity: usize,
    },

    /// Buffer element type disagrees with the channel contract.
    #[error("buffer dtype mismatch for {channel}: expected {expected}, got {actual}")]
    DtypeMismatch {
        /// Channel being bound.
        channel: Channel,
        /// Declared element type.
        expected: DType,
        /// Supplied element type.
        actual: DType,
    },

    /// Buffer has the wrong number of dimensions.
    #[error("array has wrong number of dimensions for {channel} (expected {expected}, got {actual})")]
    RankMismatch {
        /// Channel being bound.
        channel: Channel,
        /// Declared rank.
        expected: usize,
        /// Supplied rank.
        actual: usize,
    },

    /// Buffer extents disagree with the channel contract.
    #[error("array has wrong shape for {channel} (expected {expected:?}, got {actual:?})")]
    ShapeMismatch {
        /// Channel being bound.
        channel: Channel,
        /// Declared extents.
        expected: Vec<usize>,
        /// Supplied extents.
        actual: Vec<usize>,
    },

    /// Flat slice length disagrees with the product of the declared extents.
    #[error("buffer for {channel} has {actual} elements, expected {expected}")]
    LengthMismatch {
        /// Channel being bound.
        channel: Channel,
        /// Declared element count.
        expected: usize,
        /// Supplied element count.
        actual: usize,
    },

    /// Buffer is not laid out C-contiguously.
    #[error("array for {channel} isn't C contiguous")]
    NotContiguous {
        /// Channel being bound.
        channel: Channel,
    },

    /// Buffer address is not aligned for its element type.
    #[error("buffer for {channel} is not aligned to {align} bytes")]
    Misaligned {
        /// Channel being bound.
        channel: Channel,
        /// Required alignment.
        align: usize,
    },
}

/// Failures reported by a [`crate::sim::ModuleLoader`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The module file could not be accessed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The path exists but is not a loadable module.
    #[error("not a simulation module: {0}")]
    Invalid(String),
}

/// Failures of the execution context itself.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The worker unit could not be spawned.
    #[error("failed to spawn execution context: {0}")]
    Spawn(#[source] io::Error),
    /// `resume` on a context whose entry function already returned.
    #[error("resume called on a finished execution context")]
    Finished,
    /// `enter` on a context that is already running its simulation.
    #[error("execution context was already entered")]
    AlreadyEntered,
    /// `resume` with an action before the simulation asked for one.
    #[error("execution context was never entered")]
    NotEntered,
    /// The simulation panicked; the context is gone.
    #[error("simulation crashed: {0}")]
    Crashed(String),
}

/// Returned to the simulation from a suspend point when the driver has
/// torn the execution context down.
///
/// Simulations propagate it with `?` so their stack unwinds normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("execution context interrupted")]
pub struct Interrupted;
