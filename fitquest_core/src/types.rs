//! Core domain types for the FitQuest skill map.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and the node kinds that carry them
//! - Nodes, units and sections of the progression map
//! - Session phases, feedback levels and completion events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Exercise Types
// ============================================================================

/// Workout payload a node can launch
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

// ============================================================================
// Map Types
// ============================================================================

/// Classification of a node on the map
///
/// Only the renderer cares about the kind; unlock rules ignore it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Lesson,
    Boss,
    Chest,
    Practice,
}

/// Unlock state of a node
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Locked,
    Available,
    Completed,
}

/// A single entry on the progression map
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub state: NodeState,
    pub stars: u8,
    pub exercise: Option<Exercise>,
}

impl Node {
    /// Create a locked node with no stars
    pub fn new(id: impl Into<String>, kind: NodeKind, exercise: Option<Exercise>) -> Self {
        Self {
            id: id.into(),
            kind,
            state: NodeState::Locked,
            stars: 0,
            exercise,
        }
    }
}

/// Human-readable heading of a unit ("Section 1, Unit 2: Core basics")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitLabel {
    pub section_number: usize,
    pub unit_number: usize,
    pub title: String,
}

/// An ordered lane of nodes; order defines the linear unlock chain
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub label: UnitLabel,
    pub nodes: Vec<Node>,
}

/// An ordered group of units
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub units: Vec<Unit>,
}

/// Outcome of tapping a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectResult {
    /// Node is still locked
    Blocked,
    /// Node can be entered but has nothing to launch
    NoExercise,
    /// Node can be entered; hand the exercise to a new session
    Ready(Exercise),
}

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle phase of a single workout attempt
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Preparing,
    Running,
    Finished,
    FeedbackGiven,
    Canceled,
}

/// Perceived difficulty reported after a session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Hard,
    Normal,
    Easy,
}

impl std::str::FromStr for FeedbackLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hard" | "h" => Ok(FeedbackLevel::Hard),
            "normal" | "n" => Ok(FeedbackLevel::Normal),
            "easy" | "e" => Ok(FeedbackLevel::Easy),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown feedback level: {}",
                other
            ))),
        }
    }
}

/// One-shot reward emitted when a session first reaches its duration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionEvent {
    pub session_id: Uuid,
    pub exercise_id: String,
    pub xp_delta: u32,
}

/// Result of advancing a session clock
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    /// Fraction of the duration elapsed, clamped to `0.0..=1.0`
    pub progress: f64,
    /// Present only on the tick that completed the session
    pub event: Option<CompletionEvent>,
}

/// Immutable copy of a session's state for display
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub exercise_id: String,
    pub phase: SessionPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub feedback: Option<FeedbackLevel>,
    pub reward_granted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_feedback_level_parses_short_and_long_forms() {
        assert_eq!("h".parse::<FeedbackLevel>().unwrap(), FeedbackLevel::Hard);
        assert_eq!(" Normal ".parse::<FeedbackLevel>().unwrap(), FeedbackLevel::Normal);
        assert_eq!("EASY".parse::<FeedbackLevel>().unwrap(), FeedbackLevel::Easy);
    }

    #[test]
    fn test_unknown_feedback_level_is_invalid_input() {
        let err = "meh".parse::<FeedbackLevel>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("meh")));
        assert!(err.to_string().starts_with("Invalid input"));
    }
}
