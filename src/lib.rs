//! Study Timer - A state-managed study timer daemon
//!
//! This library keeps a Pomodoro or open-ended study timer, mirrors each run
//! as a session on the study platform and persists the timer across restarts.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod persist;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use client::{HttpSessionApi, SessionApi};
pub use config::Config;
pub use error::{ApiError, PersistError, TimerError};
pub use persist::StateFile;
pub use state::AppState;
pub use utils::signals::shutdown_signal;
