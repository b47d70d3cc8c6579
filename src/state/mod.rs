//! State management module
//!
//! This module contains the timer state, its transitions and the store that owns it.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, FinishedSession};
pub use timer_state::{
    format_clock, Phase, SessionId, SessionType, TimerState, TopicId, DEFAULT_POMODORO_SECONDS,
};
