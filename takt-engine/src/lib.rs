//! # takt-engine
//!
//! The tick loop orchestrator. One iteration per wake: drain inbound
//! records into the event queue, invoke the update handler, dispatch the
//! command queue to the network collaborator, reset both queues, evaluate
//! termination. All queue and arena operations happen on this one thread;
//! the tick boundary is the barrier, not locks.

pub mod cancel;
pub mod error;
pub mod runtime;
pub mod update;

pub use cancel::CancelToken;
pub use error::EngineError;
pub use runtime::{Runtime, RuntimeConfig};
pub use update::{UpdateContext, UpdateHandler};
