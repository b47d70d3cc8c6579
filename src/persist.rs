//! State file: the on-disk copy of the timer state
//!
//! Decoding is lenient. Missing fields fall back to defaults, unknown fields
//! are ignored and a corrupt file is replaced by a fresh state.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, info, warn};

use crate::{error::PersistError, state::TimerState};

const STATE_FILE_NAME: &str = "timer-state.json";

/// JSON file holding the last known `TimerState`
///
/// Clones share one write lock, so saves through any clone never interleave.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// `<data dir>/study-timer/timer-state.json`, or the working directory
    /// when the platform has no data dir
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("study-timer"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STATE_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored state, or `fallback` when there is nothing usable
    pub fn load_or(&self, fallback: TimerState) -> TimerState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No state file at {}, starting fresh", self.path.display());
                return fallback;
            }
            Err(e) => {
                warn!("Failed to read state file {}: {}", self.path.display(), e);
                return fallback;
            }
        };

        let mut state = match decode(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding unreadable state file {}: {}", self.path.display(), e);
                return fallback;
            }
        };

        for fix in state.normalize() {
            warn!("Restored timer state repaired: {}", fix);
        }
        info!(
            "Restored timer state: phase={}, type={}, time_left={}s, session={:?}",
            state.phase(),
            state.session_type,
            state.time_left,
            state.current_session_id
        );
        state
    }

    /// Write the state atomically (temp file, then rename)
    pub fn save(&self, state: &TimerState) -> Result<(), PersistError> {
        let encoded = serde_json::to_vec_pretty(state)?;
        let write_err = |source: std::io::Error| PersistError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        // The lock only guards the temp file, so a poisoned one is still usable
        let _write = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &encoded).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;

        debug!("Saved timer state to {}", self.path.display());
        Ok(())
    }
}

fn decode(raw: &str) -> Result<TimerState, serde_json::Error> {
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Phase, SessionId, SessionType, TopicId};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_fallback() {
        let dir = tempdir().unwrap();
        let file = StateFile::new(dir.path().join("absent.json"));
        let state = file.load_or(TimerState::with_planned_duration(600));
        assert_eq!(state.planned_duration, 600);
        assert!(state.is_idle());
    }

    #[test]
    fn save_then_load_restores_running_session() {
        let dir = tempdir().unwrap();
        let file = StateFile::new(dir.path().join("nested").join("state.json"));

        let mut state = TimerState::new();
        state.set_topic_id(Some(TopicId(4)));
        state.begin(SessionId(99), chrono::Utc::now()).unwrap();
        state.tick();
        file.save(&state).unwrap();

        let restored = file.load_or(TimerState::new());
        assert_eq!(restored, state);
        assert_eq!(restored.phase(), Phase::Running);
    }

    #[test]
    fn partial_and_unknown_fields_are_tolerated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"sessionType":"Normal","timeLeft":42,"theme":"dark","version":3}"#,
        )
        .unwrap();

        let state = StateFile::new(&path).load_or(TimerState::new());
        assert_eq!(state.session_type, SessionType::Normal);
        assert_eq!(state.time_left, 42);
        assert_eq!(state.planned_duration, 1500);
        assert!(state.is_idle());
    }

    #[test]
    fn on_disk_names_are_camel_case() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        StateFile::new(&path).save(&TimerState::new()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        for key in [
            "timeLeft",
            "isRunning",
            "isPaused",
            "currentSessionId",
            "startTime",
            "selectedTopicId",
            "sessionType",
            "plannedDuration",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["sessionType"], "Pomodoro");
    }

    #[test]
    fn corrupt_file_is_replaced_by_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let state = StateFile::new(&path).load_or(TimerState::new());
        assert_eq!(state, TimerState::new());
    }

    #[test]
    fn inconsistent_file_is_normalized_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{"isRunning":true,"isPaused":true,"currentSessionId":5,"timeLeft":9999,"plannedDuration":60}"#,
        )
        .unwrap();

        let state = StateFile::new(&path).load_or(TimerState::new());
        assert_eq!(state.phase(), Phase::Paused);
        assert_eq!(state.time_left, 60);
        assert_eq!(state.current_session_id, Some(SessionId(5)));
    }

    #[test]
    fn saves_from_clones_never_interleave() {
        let dir = tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));

        let writers: Vec<_> = (1..=8u64)
            .map(|n| {
                let file = file.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        file.save(&TimerState::with_planned_duration(n * 60)).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let raw = fs::read_to_string(file.path()).unwrap();
        let restored = decode(&raw).unwrap();
        assert_eq!(restored.planned_duration % 60, 0);
        assert!(restored.is_idle());
    }
}
