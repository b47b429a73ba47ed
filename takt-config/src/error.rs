use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error(
        "arena of {arena} bytes cannot cover event queue ({events}), \
         command queue ({commands}), and scratch ({scratch}) with alignment headroom"
    )]
    Budget {
        arena: usize,
        events: usize,
        commands: usize,
        scratch: usize,
    },
}
