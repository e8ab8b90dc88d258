//! Persistence of the single in-progress workout.
//!
//! There is exactly one storage slot. Saving a state overwrites whatever was
//! there, saving `None` removes it. Loading never fails on bad data: a
//! missing, unreadable or corrupt file simply means there is nothing to
//! resume.

use crate::{ActiveWorkoutState, Error, Result};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage boundary for the active workout snapshot
pub trait ActiveWorkoutStore {
    /// Persist `state`, or clear the slot when `None`
    fn save(&mut self, state: Option<&ActiveWorkoutState>) -> Result<()>;
    /// Last persisted snapshot, `None` if absent or unreadable
    fn load(&self) -> Option<ActiveWorkoutState>;
}

/// Single-file JSON store with file locking
pub struct FileActiveStore {
    path: PathBuf,
}

impl FileActiveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_locked(&self) -> std::io::Result<String> {
        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let result = std::io::BufReader::new(&file).read_to_string(&mut contents);
        let _ = file.unlock();
        result.map(|_| contents)
    }

    /// Atomically writes state by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn write_atomic(&self, state: &ActiveWorkoutState) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            Error::State(format!("active workout path {:?} has no parent", self.path))
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(state)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl ActiveWorkoutStore for FileActiveStore {
    fn save(&mut self, state: Option<&ActiveWorkoutState>) -> Result<()> {
        match state {
            Some(state) => {
                self.write_atomic(state)?;
                tracing::debug!(
                    "Saved active workout '{}' at slot {} set {}",
                    state.template.id,
                    state.current_slot_index,
                    state.current_set_index
                );
            }
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => tracing::debug!("Cleared active workout {:?}", self.path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    fn load(&self) -> Option<ActiveWorkoutState> {
        if !self.path.exists() {
            tracing::debug!("No active workout at {:?}", self.path);
            return None;
        }

        let contents = match self.read_locked() {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(
                    "Unable to read active workout {:?}: {}. Nothing to resume.",
                    self.path,
                    e
                );
                return None;
            }
        };

        match serde_json::from_str::<ActiveWorkoutState>(&contents) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse active workout {:?}: {}. Nothing to resume.",
                    self.path,
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{get_default_catalog, SetLog};
    use chrono::{Duration, Utc};

    fn mid_session_state() -> ActiveWorkoutState {
        let template = get_default_catalog().template("dia_1").unwrap().clone();
        let mut state = ActiveWorkoutState::new(template, Utc::now() - Duration::minutes(20));
        state.session_logs.insert(
            "d1_e1".into(),
            vec![
                SetLog {
                    set_number: 1,
                    weight_kg: 32.5,
                    repetitions: 12,
                },
                SetLog {
                    set_number: 2,
                    weight_kg: 32.5,
                    repetitions: 9,
                },
            ],
        );
        state.current_set_index = 2;
        state.timer_end_time = Some(Utc::now() + Duration::seconds(45));
        state
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileActiveStore::new(temp_dir.path().join("active_workout.json"));

        let state = mid_session_state();
        store.save(Some(&state)).unwrap();

        let fresh = FileActiveStore::new(temp_dir.path().join("active_workout.json"));
        assert_eq!(fresh.load(), Some(state));
    }

    #[test]
    fn test_save_none_clears() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileActiveStore::new(temp_dir.path().join("active_workout.json"));

        store.save(Some(&mid_session_state())).unwrap();
        store.save(None).unwrap();

        assert!(store.load().is_none());
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.save(None).unwrap();
    }

    #[test]
    fn test_new_save_overwrites_previous() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileActiveStore::new(temp_dir.path().join("active_workout.json"));

        store.save(Some(&mid_session_state())).unwrap();
        let template = get_default_catalog().template("dia_2").unwrap().clone();
        let replacement = ActiveWorkoutState::new(template, Utc::now());
        store.save(Some(&replacement)).unwrap();

        assert_eq!(store.load().unwrap().template.id, "dia_2");
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = FileActiveStore::new(temp_dir.path().join("nonexistent.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_corrupted_state_returns_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("active_workout.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let store = FileActiveStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileActiveStore::new(temp_dir.path().join("active_workout.json"));
        store.save(Some(&mid_session_state())).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "active_workout.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only active_workout.json, found extras: {:?}",
            extras
        );
    }
}
