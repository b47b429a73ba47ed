//! # takt-proto
//!
//! The in-process envelope format exchanged over the chunk queues:
//! `[discriminant: u16 LE][variant payload]`.
//!
//! Two independent families share the envelope header. *Commands* travel
//! from the update loop to the network collaborator; *events* travel the
//! other way and are opaque to the tick loop itself — only the network
//! runner encodes them and only the update handler decodes them.
//!
//! Both sides of each family live in this process, so an unrecognized
//! discriminant means a producer/consumer mismatch. The codec reports it
//! as [`WireError::UnknownDiscriminant`] and the orchestrator treats that
//! as fatal; validating untrusted client input happens at the network
//! boundary, never here.

pub mod command;
pub mod event;
mod wire;

pub use command::{Command, MAX_COMMAND_WIRE_LEN};
pub use event::{Event, MAX_EVENT_WIRE_LEN};
pub use wire::{discriminant, WireError};

/// Identifier the network runner assigns to each connected client.
pub type ClientId = u16;
