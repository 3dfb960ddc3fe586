#![forbid(unsafe_code)]

//! Core logic for the FitQuest skill map.
//!
//! This crate provides:
//! - Domain types (exercises, nodes, units, sections, session phases)
//! - Map content loading and the bundled default map
//! - The progression graph and its linear unlock rule
//! - The workout session state machine with its one-shot XP reward
//! - Score model, configuration, logging and the workout journal

pub mod types;
pub mod error;
pub mod map;
pub mod graph;
pub mod session;
pub mod score;
pub mod config;
pub mod logging;
pub mod journal;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use map::{build_default_map, get_default_map, MapDefinition};
pub use graph::ProgressionGraph;
pub use session::{SessionController, SessionSettings};
pub use score::ScoreBoard;
pub use config::Config;
pub use journal::{JsonlSink, SessionOutcome, SessionRecord, SessionSink};
