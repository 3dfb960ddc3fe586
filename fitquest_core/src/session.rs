//! Workout session state machine.
//!
//! One `SessionController` drives one attempt at an exercise:
//!
//! ```text
//! Preparing -> Running -> Finished -> FeedbackGiven
//!     \           \
//!      +-----------+--> Canceled
//! ```
//!
//! Completion is detected by polling `tick` with the current time. The first
//! tick that sees the full duration elapsed returns the XP event; the latch
//! that guarantees this lives with the phase behind one mutex, so concurrent
//! ticks cannot both observe "not yet granted".

use crate::{
    CompletionEvent, Error, Exercise, FeedbackLevel, Result, SessionPhase, SessionSnapshot, Tick,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

/// Timing and reward parameters for a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    pub duration: Duration,
    pub earned_xp: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            duration: Duration::seconds(30),
            earned_xp: 10,
        }
    }
}

struct SessionInner {
    phase: SessionPhase,
    started_at: Option<DateTime<Utc>>,
    feedback: Option<FeedbackLevel>,
    reward_granted: bool,
}

impl SessionInner {
    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            phase: self.phase,
        }
    }

    fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.started_at
            .map(|t0| now - t0)
            .unwrap_or_else(Duration::zero)
    }
}

/// Drives a single workout attempt
pub struct SessionController {
    id: Uuid,
    exercise: Exercise,
    settings: SessionSettings,
    inner: Mutex<SessionInner>,
}

/// Round a remaining duration up to whole seconds for display
fn ceil_seconds(remaining: Duration) -> u64 {
    if remaining <= Duration::zero() {
        return 0;
    }
    let whole = remaining.num_seconds();
    let secs = if remaining > Duration::seconds(whole) {
        whole + 1
    } else {
        whole
    };
    secs as u64
}

/// Fractional seconds at chrono's nanosecond resolution
fn secs_f64(d: Duration) -> f64 {
    match d.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => d.num_milliseconds() as f64 / 1e3,
    }
}

impl SessionController {
    pub fn new(exercise: Exercise, settings: SessionSettings) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!("New session {} for exercise {}", id, exercise.id);
        Self {
            id,
            exercise,
            settings,
            inner: Mutex::new(SessionInner {
                phase: SessionPhase::Preparing,
                started_at: None,
                feedback: None,
                reward_granted: false,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    /// Begin the countdown at `now`
    pub fn start(&self, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.phase != SessionPhase::Preparing {
            return Err(inner.invalid("start"));
        }

        inner.started_at = Some(now);
        inner.phase = SessionPhase::Running;
        tracing::debug!("Session {} started at {}", self.id, now);
        Ok(())
    }

    /// Advance the session clock to `now`
    ///
    /// Returns the completion event on the first tick that reaches the full
    /// duration and never again.
    ///
    /// Ticks in `Finished` or `FeedbackGiven` are not errors: they report full
    /// progress and no event, so a render loop may keep ticking after the
    /// reward. Ticks in `Preparing` or `Canceled` fail with `InvalidTransition`.
    pub fn tick(&self, now: DateTime<Utc>) -> Result<Tick> {
        let mut inner = self.inner.lock();
        match inner.phase {
            SessionPhase::Running => {}
            SessionPhase::Finished | SessionPhase::FeedbackGiven => {
                return Ok(Tick {
                    progress: 1.0,
                    event: None,
                });
            }
            SessionPhase::Preparing | SessionPhase::Canceled => {
                return Err(inner.invalid("tick"));
            }
        }

        let elapsed = inner.elapsed(now);
        let duration = self.settings.duration;

        if elapsed < duration {
            let progress = if duration <= Duration::zero() {
                0.0
            } else {
                (secs_f64(elapsed) / secs_f64(duration)).clamp(0.0, 1.0)
            };
            return Ok(Tick {
                progress,
                event: None,
            });
        }

        inner.phase = SessionPhase::Finished;
        if std::mem::replace(&mut inner.reward_granted, true) {
            return Ok(Tick {
                progress: 1.0,
                event: None,
            });
        }

        let event = CompletionEvent {
            session_id: self.id,
            exercise_id: self.exercise.id.clone(),
            xp_delta: self.settings.earned_xp,
        };
        tracing::info!(
            "Session {} finished: +{} XP for {}",
            self.id,
            event.xp_delta,
            event.exercise_id
        );

        Ok(Tick {
            progress: 1.0,
            event: Some(event),
        })
    }

    /// Store how the workout felt
    pub fn record_feedback(&self, level: FeedbackLevel) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.phase != SessionPhase::Finished {
            return Err(inner.invalid("record feedback for"));
        }

        inner.feedback = Some(level);
        inner.phase = SessionPhase::FeedbackGiven;
        tracing::debug!("Session {} feedback: {:?}", self.id, level);
        Ok(())
    }

    /// Abandon the attempt without reward
    pub fn cancel(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.phase {
            SessionPhase::Preparing | SessionPhase::Running => {
                inner.phase = SessionPhase::Canceled;
                tracing::debug!("Session {} canceled", self.id);
                Ok(())
            }
            SessionPhase::Canceled => Ok(()),
            SessionPhase::Finished | SessionPhase::FeedbackGiven => Err(inner.invalid("cancel")),
        }
    }

    /// Seconds left on the countdown, rounded up
    pub fn remaining_time(&self, now: DateTime<Utc>) -> Result<u64> {
        let inner = self.inner.lock();
        match inner.phase {
            SessionPhase::Running | SessionPhase::Finished => {
                Ok(ceil_seconds(self.settings.duration - inner.elapsed(now)))
            }
            _ => Err(inner.invalid("read the countdown of")),
        }
    }

    pub fn feedback(&self) -> Option<FeedbackLevel> {
        self.inner.lock().feedback
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            session_id: self.id,
            exercise_id: self.exercise.id.clone(),
            phase: inner.phase,
            started_at: inner.started_at,
            feedback: inner.feedback,
            reward_granted: inner.reward_granted,
        }
    }
}
