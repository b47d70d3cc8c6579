//! Configuration and CLI argument handling

use std::path::PathBuf;
use clap::Parser;

use crate::persist::StateFile;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "study-timer")]
#[command(about = "A state-managed study timer that records sessions on the study platform")]
#[command(version)]
pub struct Config {
    /// Port to bind the control server to
    #[arg(short, long, env = "STUDY_TIMER_PORT", default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "STUDY_TIMER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Base URL of the study platform REST API
    #[arg(long, env = "STUDY_TIMER_API_URL")]
    pub api_url: String,

    /// Bearer token sent to the study platform
    #[arg(long, env = "STUDY_TIMER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Where the timer state is kept between restarts
    #[arg(long, env = "STUDY_TIMER_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Pomodoro length in minutes for a fresh timer
    #[arg(short, long, default_value = "25")]
    pub duration: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// State file from the flag, or the platform data dir
    pub fn state_file(&self) -> StateFile {
        StateFile::new(
            self.state_file
                .clone()
                .unwrap_or_else(StateFile::default_path),
        )
    }

    /// Default Pomodoro length in seconds
    pub fn planned_duration_seconds(&self) -> u64 {
        self.duration.max(1) * 60
    }
}
