//! Error types for the study timer

use std::path::PathBuf;

use thiserror::Error;

use crate::state::Phase;

/// Failures talking to the remote study platform
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid API base url: {0}")]
    BaseUrl(String),
}

/// Failures reading or writing the state file
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode timer state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors surfaced by timer store operations
#[derive(Error, Debug)]
pub enum TimerError {
    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("session API error: {0}")]
    Api(#[from] ApiError),

    #[error("timer state lock poisoned")]
    Poisoned,
}
