// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! NLE bridge: a steppable execution bridge for blocking turn-based
//! simulations.
//!
//! The wrapped simulation keeps its own control flow: it loops, blocks on
//! input and writes world state as it goes. The bridge turns that into a
//! call-and-return `step(action)` interface:
//! - the simulation runs in a suspendable execution context
//! - observations land directly in caller-owned buffers
//! - seeds are injected deterministically at episode boundaries
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   api (start/step/reset/end)        │
//! ├─────────────────────────────────────┤
//! │   Session (lifecycle, trace, seeds) │
//! ├──────────────────┬──────────────────┤
//! │ ExecutionContext │ ObservationBufs  │
//! ├──────────────────┴──────────────────┤
//! │   Simulation (worker thread)        │
//! └─────────────────────────────────────┘
//! ```

pub mod api;
pub mod context;
pub mod error;
pub mod obs;
pub mod seed;
pub mod session;
pub mod settings;
pub mod sim;
pub mod trace;

pub use error::{BridgeError, BridgeResult, UsageError, ValidationError};

// Re-export the types most callers need at crate root
pub use obs::{Channel, ChannelKey, ObservationBuffers};
pub use seed::Seeds;
pub use session::{Lifecycle, Session};
pub use settings::Settings;
pub use sim::{EndCause, ModuleLoader, Simulation, SimulationModule};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_debug() {
        let debug = format!("{:?}", Lifecycle::Suspended);
        assert!(debug.contains("Suspended"));
    }
}
