use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::latfile::LatticeError;
use crate::core::models::beam::StateAccessError;
use crate::core::models::lattice::{LatticeLoadError, LookupError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Element not found in lattice: {0}")]
    ElementNotFound(String),

    #[error("Transport engine error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Lattice serialization failed: {source}")]
    Lattice {
        #[from]
        source: LatticeError,
    },

    #[error("Lattice snapshot could not be loaded: {source}")]
    Load {
        #[from]
        source: LatticeLoadError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Element lookup failed: {source}")]
    Lookup {
        #[from]
        source: LookupError,
    },

    #[error("Beam state access failed: {source}")]
    State {
        #[from]
        source: StateAccessError,
    },
}

impl EngineError {
    pub(crate) fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        EngineError::Transport(Box::new(err))
    }
}
