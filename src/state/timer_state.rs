//! Timer state structure and its pure transitions
//!
//! Nothing in here touches the clock, the network or the disk. `AppState`
//! wraps these transitions with the session API and the state file.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Default Pomodoro length: 25 minutes
pub const DEFAULT_POMODORO_SECONDS: u64 = 25 * 60;

/// Server-side study session id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topic a study session is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(pub i64);

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Countdown (Pomodoro) or count-up (Normal) session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionType {
    #[default]
    Pomodoro,
    Normal,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Pomodoro => "Pomodoro",
            SessionType::Normal => "Normal",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase derived from the running/paused flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::Paused => "paused",
        };
        f.write_str(s)
    }
}

/// Study timer state, persisted verbatim to the state file.
///
/// Every field has a serde default so older or hand-edited files still load;
/// unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    /// Seconds remaining (Pomodoro) or elapsed (Normal)
    pub time_left: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub current_session_id: Option<SessionId>,
    /// Informational only
    pub start_time: Option<DateTime<Utc>>,
    pub selected_topic_id: Option<TopicId>,
    pub session_type: SessionType,
    /// Target length in seconds, only meaningful for Pomodoro
    pub planned_duration: u64,
}

impl TimerState {
    /// Create an idle Pomodoro state of the default length
    pub fn new() -> Self {
        Self::with_planned_duration(DEFAULT_POMODORO_SECONDS)
    }

    /// Create an idle Pomodoro state with a custom planned duration
    pub fn with_planned_duration(seconds: u64) -> Self {
        let planned_duration = seconds.max(1);
        Self {
            time_left: planned_duration,
            is_running: false,
            is_paused: false,
            current_session_id: None,
            start_time: None,
            selected_topic_id: None,
            session_type: SessionType::Pomodoro,
            planned_duration,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.is_running, self.is_paused) {
            (true, _) => Phase::Running,
            (false, true) => Phase::Paused,
            (false, false) => Phase::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == Phase::Idle
    }

    /// `timeLeft` a fresh session of the current mode starts from
    pub fn mode_default(&self) -> u64 {
        match self.session_type {
            SessionType::Pomodoro => self.planned_duration,
            SessionType::Normal => 0,
        }
    }

    /// Seconds of study accumulated so far, floored at one second
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = match self.session_type {
            SessionType::Pomodoro => self.planned_duration.saturating_sub(self.time_left),
            SessionType::Normal => self.time_left,
        };
        elapsed.max(1)
    }

    /// True when a running Pomodoro has hit zero and should be finished
    pub fn is_pomodoro_complete(&self) -> bool {
        self.is_running && self.session_type == SessionType::Pomodoro && self.time_left == 0
    }

    fn require(&self, operation: &'static str, expected: Phase) -> Result<(), TimerError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(TimerError::InvalidTransition { operation, phase })
        }
    }

    /// Switch between Pomodoro and Normal. Idle only.
    pub fn set_session_type(&mut self, session_type: SessionType) -> Result<(), TimerError> {
        self.require("set session type", Phase::Idle)?;
        self.session_type = session_type;
        self.time_left = self.mode_default();
        Ok(())
    }

    /// Set the Pomodoro target length. Idle only; zero is clamped to one second.
    pub fn set_planned_duration(&mut self, seconds: u64) -> Result<(), TimerError> {
        self.require("set planned duration", Phase::Idle)?;
        self.planned_duration = seconds.max(1);
        self.time_left = self.mode_default();
        Ok(())
    }

    pub fn set_topic_id(&mut self, topic_id: Option<TopicId>) {
        self.selected_topic_id = topic_id;
    }

    /// Check that a session may be started
    pub fn ensure_can_start(&self) -> Result<(), TimerError> {
        self.require("start session", Phase::Idle)
    }

    /// Enter Running with a freshly allocated server session
    pub fn begin(&mut self, session_id: SessionId, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.ensure_can_start()?;
        self.current_session_id = Some(session_id);
        self.start_time = Some(now);
        self.is_running = true;
        self.is_paused = false;
        self.time_left = self.mode_default();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.require("pause session", Phase::Running)?;
        self.is_running = false;
        self.is_paused = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.require("resume session", Phase::Paused)?;
        self.is_running = true;
        self.is_paused = false;
        Ok(())
    }

    /// Back to Idle, dropping the session link and elapsed time
    pub fn clear_session(&mut self) {
        self.current_session_id = None;
        self.start_time = None;
        self.is_running = false;
        self.is_paused = false;
        self.time_left = self.mode_default();
    }

    /// Advance one second. Returns whether anything changed.
    ///
    /// Never finishes a session; that belongs to the driver.
    pub fn tick(&mut self) -> bool {
        if !self.is_running {
            return false;
        }
        let before = self.time_left;
        self.time_left = match self.session_type {
            SessionType::Pomodoro => self.time_left.saturating_sub(1),
            SessionType::Normal => self.time_left.saturating_add(1),
        };
        self.time_left != before
    }

    /// Repair a state restored from disk. Returns a description of each fix.
    pub fn normalize(&mut self) -> Vec<&'static str> {
        let mut fixes = Vec::new();

        if self.planned_duration == 0 {
            self.planned_duration = 1;
            fixes.push("planned duration was zero, clamped to one second");
        }
        if self.is_running && self.is_paused {
            self.is_running = false;
            fixes.push("both running and paused, kept paused");
        }
        if self.session_type == SessionType::Pomodoro && self.time_left > self.planned_duration {
            self.time_left = self.planned_duration;
            fixes.push("time left exceeded planned duration, clamped");
        }
        match (self.is_idle(), self.current_session_id.is_some()) {
            (true, true) => {
                self.current_session_id = None;
                self.start_time = None;
                fixes.push("idle state carried a session id, dropped it");
            }
            (false, false) => {
                self.clear_session();
                fixes.push("active state had no session id, returned to idle");
            }
            _ => {}
        }

        fixes
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Format seconds as `MM:SS`, or `H:MM:SS` from one hour up
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
