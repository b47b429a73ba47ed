//! # takt configuration
//!
//! Layered configuration for the takt runtime. Every capacity here is a
//! static provisioning decision made once at startup: the runtime never
//! grows a buffer, so the budget check below is the only thing standing
//! between a thin config and a fatal capacity error at runtime.
//!
//! Hierarchy:
//! 1. Default values (the original's compiled-in constants)
//! 2. `config/takt.yaml`, if present
//! 3. `TAKT_*` environment variables (`__` as the section separator)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use takt_core::CHUNK_HEADER_LEN;
use takt_proto::{MAX_COMMAND_WIRE_LEN, MAX_EVENT_WIRE_LEN};

mod error;

pub use error::ConfigError;

const ENV_PREFIX: &str = "TAKT_";
const DEFAULT_FILE: &str = "config/takt.yaml";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct TaktConfig {
    /// Arena and scratch sizing.
    #[validate(nested)]
    pub memory: MemoryConfig,

    /// Chunk queue sizing.
    #[validate(nested)]
    pub queues: QueueConfig,

    /// Network collaborator parameters.
    #[validate(nested)]
    pub network: NetworkConfig,
}

/// Arena provisioning.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct MemoryConfig {
    /// Size of the one block obtained from the OS at startup.
    #[serde(default = "default_arena_capacity")]
    #[validate(range(min = 65536))]
    pub arena_capacity: usize,

    /// Application scratch region handed to the update handler.
    #[serde(default = "default_scratch_capacity")]
    #[validate(range(min = 4096))]
    pub scratch_capacity: usize,
}

/// Chunk queue provisioning. Depths are counts of worst-case chunks; the
/// byte capacities derive from the protocol's wire bounds.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct QueueConfig {
    /// Worst-case inbound events buffered per tick.
    #[serde(default = "default_queue_depth")]
    #[validate(range(min = 1, max = 65536))]
    pub event_depth: usize,

    /// Worst-case outbound commands buffered per tick.
    #[serde(default = "default_queue_depth")]
    #[validate(range(min = 1, max = 65536))]
    pub command_depth: usize,
}

/// Network runner parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct NetworkConfig {
    /// TCP listen address.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Connections accepted at once; later connects are refused.
    #[serde(default = "default_max_clients")]
    #[validate(range(min = 1, max = 65535))]
    pub max_clients: usize,

    /// Capacity of the channels between the tick loop and the network
    /// thread, in records.
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 16, max = 1048576))]
    pub channel_capacity: usize,
}

fn default_arena_capacity() -> usize {
    5 * 1024 * 1024
}

fn default_scratch_capacity() -> usize {
    1024 * 1024
}

fn default_queue_depth() -> usize {
    100
}

fn default_listen() -> SocketAddr {
    "127.0.0.1:4271".parse().expect("static addr")
}

fn default_max_clients() -> usize {
    64
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            arena_capacity: default_arena_capacity(),
            scratch_capacity: default_scratch_capacity(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            event_depth: default_queue_depth(),
            command_depth: default_queue_depth(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_clients: default_max_clients(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl QueueConfig {
    /// Event queue bytes: worst-case wire length plus framing, per slot.
    pub fn event_queue_capacity(&self) -> usize {
        (MAX_EVENT_WIRE_LEN + CHUNK_HEADER_LEN) * self.event_depth
    }

    /// Command queue bytes, same shape.
    pub fn command_queue_capacity(&self) -> usize {
        (MAX_COMMAND_WIRE_LEN + CHUNK_HEADER_LEN) * self.command_depth
    }
}

impl TaktConfig {
    /// Loads from defaults, the default YAML file if present, and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(TaktConfig::default()));
        if Path::new(DEFAULT_FILE).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_FILE));
        }
        Self::extract(figment)
    }

    /// Loads from a specific file (plus environment overrides).
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }
        let figment = Figment::from(Serialized::defaults(TaktConfig::default()))
            .merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        config.validate_budget()?;
        Ok(config)
    }

    /// The arena must cover both queues plus scratch, with headroom for
    /// the allocator's per-region alignment.
    fn validate_budget(&self) -> Result<(), ConfigError> {
        let events = self.queues.event_queue_capacity();
        let commands = self.queues.command_queue_capacity();
        let scratch = self.memory.scratch_capacity;
        const ALIGN_HEADROOM: usize = 64;
        if events + commands + scratch + ALIGN_HEADROOM > self.memory.arena_capacity {
            return Err(ConfigError::Budget {
                arena: self.memory.arena_capacity,
                events,
                commands,
                scratch,
            });
        }
        Ok(())
    }
}
