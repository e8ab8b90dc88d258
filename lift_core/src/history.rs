//! Completed-session history.
//!
//! Sessions are stored one JSON document per line (JSONL) with file locking
//! so that separate `lift` invocations can share the file safely. Appends
//! lock and write a single line; updates and deletes rewrite the whole file
//! atomically through a temp file.

use crate::{Error, Result, WorkoutSession};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage boundary for completed sessions
pub trait HistoryStore {
    /// All sessions, newest first
    fn list(&self) -> Result<Vec<WorkoutSession>>;
    fn add(&mut self, session: &WorkoutSession) -> Result<()>;
    /// Replace the stored session with the same id
    fn update(&mut self, session: &WorkoutSession) -> Result<()>;
    fn delete(&mut self, session_id: &str) -> Result<()>;
}

/// JSONL-based history store with file locking
pub struct JsonlHistoryStore {
    path: PathBuf,
}

impl JsonlHistoryStore {
    /// Create a new JSONL store for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Load, transform and atomically rewrite the whole file
    fn rewrite<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<WorkoutSession>) -> Result<()>,
    {
        self.ensure_parent_dir()?;
        let mut sessions = read_sessions(&self.path)?;
        f(&mut sessions)?;

        let dir = self.path.parent().ok_or_else(|| {
            Error::History(format!("history path {:?} has no parent", self.path))
        })?;
        let temp = NamedTempFile::new_in(dir)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            for session in &sessions {
                serde_json::to_writer(&mut writer, session)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn list(&self) -> Result<Vec<WorkoutSession>> {
        let mut sessions = read_sessions(&self.path)?;
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    fn add(&mut self, session: &WorkoutSession) -> Result<()> {
        self.ensure_parent_dir()?;

        if read_sessions(&self.path)?.iter().any(|s| s.id == session.id) {
            return Err(Error::History(format!(
                "session {} already exists",
                session.id
            )));
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(session)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        tracing::debug!("Appended session {} to history", session.id);
        Ok(())
    }

    fn update(&mut self, session: &WorkoutSession) -> Result<()> {
        self.rewrite(|sessions| {
            let slot = sessions
                .iter_mut()
                .find(|s| s.id == session.id)
                .ok_or_else(|| Error::NotFound(format!("session {}", session.id)))?;
            *slot = session.clone();
            Ok(())
        })?;
        tracing::debug!("Updated session {}", session.id);
        Ok(())
    }

    fn delete(&mut self, session_id: &str) -> Result<()> {
        self.rewrite(|sessions| {
            let before = sessions.len();
            sessions.retain(|s| s.id != session_id);
            if sessions.len() == before {
                return Err(Error::NotFound(format!("session {}", session_id)));
            }
            Ok(())
        })?;
        tracing::debug!("Deleted session {}", session_id);
        Ok(())
    }
}

/// Read all sessions from a JSONL file, skipping unreadable lines
pub fn read_sessions(path: &Path) -> Result<Vec<WorkoutSession>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut sessions = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WorkoutSession>(&line) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                tracing::warn!("Failed to parse session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} sessions from {:?}", sessions.len(), path);
    Ok(sessions)
}

/// Sort by completion date, newest first
pub fn sort_newest_first(sessions: &mut [WorkoutSession]) {
    sessions.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Most recent session of `template_id`, optionally ignoring one session id.
///
/// Does not assume any ordering of `history`.
pub fn last_session_for_template<'a>(
    history: &'a [WorkoutSession],
    template_id: &str,
    exclude_id: Option<&str>,
) -> Option<&'a WorkoutSession> {
    history
        .iter()
        .filter(|s| s.template_id == template_id)
        .filter(|s| exclude_id != Some(s.id.as_str()))
        .max_by_key(|s| s.date)
}

/// Weight of set 1 for `slot_id` in the latest session of `template_id`
pub fn previous_first_set_weight(
    history: &[WorkoutSession],
    template_id: &str,
    slot_id: &str,
) -> Option<f64> {
    last_session_for_template(history, template_id, None)
        .and_then(|s| s.logs.get(slot_id))
        .and_then(|sets| sets.first())
        .map(|set| set.weight_kg)
}

/// Latest session date for each template that has been trained
pub fn last_workout_dates(history: &[WorkoutSession]) -> HashMap<String, DateTime<Utc>> {
    let mut dates: HashMap<String, DateTime<Utc>> = HashMap::new();
    for session in history {
        dates
            .entry(session.template_id.clone())
            .and_modify(|d| *d = (*d).max(session.date))
            .or_insert(session.date);
    }
    dates
}
