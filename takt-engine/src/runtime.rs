//! Tick loop orchestrator and process-lifetime resource owner.
//!
//! `Runtime::new` carves every buffer from one freshly created arena;
//! `Runtime::run` drives ticks until the cancel token or the update phase
//! ends the run, then tears down in strict reverse-initialization order
//! with the arena last.

use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, trace};

use takt_core::{Arena, ArenaRegion, ChunkQueue, CHUNK_HEADER_LEN};
use takt_net::NetworkService;
use takt_proto::{Command, MAX_COMMAND_WIRE_LEN, MAX_EVENT_WIRE_LEN};

use crate::cancel::CancelToken;
use crate::error::EngineError;
use crate::update::{UpdateContext, UpdateHandler};

/// Buffer provisioning and pacing. Capacities are a static decision made
/// once here; exceeding them at runtime is fatal, not recoverable.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// The one block backing everything.
    pub arena_capacity: usize,
    /// Event queue bytes, chunk framing included.
    pub event_queue_capacity: usize,
    /// Command queue bytes, chunk framing included.
    pub command_queue_capacity: usize,
    /// Application scratch region handed to the update handler.
    pub scratch_capacity: usize,
    /// Sleep between tick iterations; zero means spin.
    pub tick_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            arena_capacity: 5 * 1024 * 1024,
            event_queue_capacity: (MAX_EVENT_WIRE_LEN + CHUNK_HEADER_LEN) * 100,
            command_queue_capacity: (MAX_COMMAND_WIRE_LEN + CHUNK_HEADER_LEN) * 100,
            scratch_capacity: 1024 * 1024,
            tick_interval: Duration::from_millis(1),
        }
    }
}

/// The tick-loop thread's exclusive state. Field order matters: the arena
/// is declared last so that even an early drop releases it after every
/// structure it backs.
pub struct Runtime<N, H> {
    event_queue: ChunkQueue,
    command_queue: ChunkQueue,
    network: N,
    net_thread: JoinHandle<()>,
    scratch: ArenaRegion,
    handler: H,
    tick_interval: Duration,
    arena: Arena,
}

impl<N, H> std::fmt::Debug for Runtime<N, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}

impl<N: NetworkService, H: UpdateHandler> Runtime<N, H> {
    /// Carves the event queue, command queue, and scratch region from one
    /// new arena. An `Err` here is a provisioning defect; the caller exits
    /// with it.
    pub fn new(
        config: RuntimeConfig,
        network: N,
        net_thread: JoinHandle<()>,
        handler: H,
    ) -> Result<Self, EngineError> {
        let mut arena = Arena::with_capacity(config.arena_capacity)?;
        let event_queue = ChunkQueue::bind(arena.allocate(config.event_queue_capacity)?);
        let command_queue = ChunkQueue::bind(arena.allocate(config.command_queue_capacity)?);
        let scratch = arena.allocate(config.scratch_capacity)?;
        info!(
            arena = arena.capacity(),
            used = arena.used(),
            "runtime memory provisioned"
        );

        Ok(Self {
            event_queue,
            command_queue,
            network,
            net_thread,
            scratch,
            handler,
            tick_interval: config.tick_interval,
            arena,
        })
    }

    /// Drives the tick loop until the cancel token is observed at a tick
    /// boundary or the update phase clears the running flag, then tears
    /// down. Consumes the runtime; there is no restart.
    pub fn run(mut self, cancel: CancelToken) -> Result<(), EngineError> {
        info!("tick loop running");
        let mut running = true;
        while running {
            if cancel.is_requested() {
                info!("termination requested");
                break;
            }
            self.tick(&mut running)?;
            if self.tick_interval > Duration::ZERO {
                std::thread::sleep(self.tick_interval);
            }
        }
        self.shutdown()
    }

    /// One Running iteration: poll-drain, update, dispatch, reset.
    fn tick(&mut self, running: &mut bool) -> Result<(), EngineError> {
        while let Some(chunk) = self.network.poll_event() {
            trace!(bytes = chunk.len(), "event drained");
            self.event_queue.write(&chunk)?;
        }

        {
            let mut ctx = UpdateContext {
                events: &mut self.event_queue,
                commands: &mut self.command_queue,
                scratch: self.scratch.as_mut_slice(),
                running,
            };
            self.handler.update(&mut ctx)?;
        }

        while let Some(chunk) = self.command_queue.read() {
            match Command::decode(chunk)? {
                Command::Broadcast {
                    client_ids,
                    message,
                } => {
                    trace!(clients = client_ids.len(), bytes = message.len(), "broadcast");
                    self.network.broadcast(&client_ids, &message);
                }
                Command::Shutdown => {
                    debug!("shutdown command dispatched");
                    self.network.stop();
                }
            }
        }
        self.command_queue.reset();
        self.event_queue.reset();
        Ok(())
    }

    /// Terminating state: stop the collaborator, join its thread, release
    /// resources in strict reverse-initialization order.
    fn shutdown(self) -> Result<(), EngineError> {
        let Runtime {
            event_queue,
            command_queue,
            mut network,
            net_thread,
            scratch,
            handler: _handler,
            tick_interval: _,
            arena,
        } = self;

        network.stop();
        info!("joining network thread");
        net_thread
            .join()
            .map_err(|_| EngineError::NetworkThreadPanicked)?;

        drop(event_queue);
        drop(command_queue);
        drop(network);
        drop(scratch);
        drop(arena);
        info!("tick loop terminated");
        Ok(())
    }
}
