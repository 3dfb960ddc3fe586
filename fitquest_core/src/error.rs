//! Error types for the fitquest_core library.

use crate::{NodeState, SessionPhase};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fitquest_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed map or configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unrecognized user-supplied value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown node id
    #[error("Node not found: {0}")]
    NotFound(String),

    /// Node is in a state that does not allow the requested change
    #[error("Node '{node_id}' is {state:?}")]
    InvalidState { node_id: String, state: NodeState },

    /// Session method called from a phase that does not permit it
    #[error("Cannot {action} a session that is {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },
}
