//! Player score: XP, streak and lives.
//!
//! The score belongs to whoever renders the app. Neither the graph nor the
//! session controller holds one; the renderer applies completion events to it.

use crate::CompletionEvent;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBoard {
    pub xp: u64,
    pub streak: u32,
    pub lives: u32,
    pub max_lives: u32,
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ScoreBoard {
    pub fn new(starting_lives: u32) -> Self {
        Self {
            xp: 0,
            streak: 0,
            lives: starting_lives,
            max_lives: starting_lives,
        }
    }

    /// Credit a finished session
    pub fn apply_completion(&mut self, event: &CompletionEvent) {
        self.xp += u64::from(event.xp_delta);
        self.streak += 1;
        tracing::debug!(
            "Score: +{} XP (total {}), streak {}",
            event.xp_delta,
            self.xp,
            self.streak
        );
    }

    /// Quitting a workout costs a life and breaks the streak
    pub fn apply_cancel(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.streak = 0;
        tracing::debug!("Score: life lost, {} remaining", self.lives);
    }

    pub fn is_out_of_lives(&self) -> bool {
        self.lives == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn event(xp: u32) -> CompletionEvent {
        CompletionEvent {
            session_id: Uuid::new_v4(),
            exercise_id: "plank_hold".into(),
            xp_delta: xp,
        }
    }

    #[test]
    fn test_completion_adds_xp_and_streak() {
        let mut score = ScoreBoard::new(3);
        score.apply_completion(&event(10));
        score.apply_completion(&event(15));

        assert_eq!(score.xp, 25);
        assert_eq!(score.streak, 2);
        assert_eq!(score.lives, 3);
    }

    #[test]
    fn test_cancel_costs_life_and_streak() {
        let mut score = ScoreBoard::new(2);
        score.apply_completion(&event(10));
        score.apply_cancel();

        assert_eq!(score.lives, 1);
        assert_eq!(score.streak, 0);
        assert_eq!(score.xp, 10);
    }

    #[test]
    fn test_lives_never_go_negative() {
        let mut score = ScoreBoard::new(1);
        score.apply_cancel();
        score.apply_cancel();

        assert_eq!(score.lives, 0);
        assert!(score.is_out_of_lives());
    }
}
