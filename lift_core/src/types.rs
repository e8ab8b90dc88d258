//! Core domain types for the workout tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise definitions and routine templates (static catalog data)
//! - Set logs and completed workout sessions (history)
//! - The resumable in-progress workout record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of sets performed for every slot of a template.
pub const SETS_PER_SLOT: usize = 3;

// ============================================================================
// Catalog Types
// ============================================================================

/// An exercise (e.g., "Press Pecho Plano (Máquina)")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
    /// Rest after each set, in seconds
    pub default_rest_seconds: u32,
}

/// One exercise position inside a template.
///
/// The same exercise may appear in several slots (left/right variants), so
/// logs are always keyed by `id`, never by `exercise_id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineExerciseSlot {
    pub id: String,
    pub exercise_id: String,
    pub order: u32,
}

/// A named, ordered sequence of slots
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    pub slots: Vec<RoutineExerciseSlot>,
}

impl WorkoutTemplate {
    pub fn slot(&self, slot_id: &str) -> Option<&RoutineExerciseSlot> {
        self.slots.iter().find(|s| s.id == slot_id)
    }
}

// ============================================================================
// Log and Session Types
// ============================================================================

/// A single logged set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetLog {
    /// 1-based position within the slot
    pub set_number: u32,
    pub weight_kg: f64,
    pub repetitions: u32,
}

/// Slot id → sets logged for that slot, in set order
pub type SessionLogs = BTreeMap<String, Vec<SetLog>>;

/// A completed workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    pub id: String,
    pub template_id: String,
    /// Completion time, not start time
    pub date: DateTime<Utc>,
    pub logs: SessionLogs,
}

impl WorkoutSession {
    /// Reps of set 1 for `slot_id`, if logged
    pub fn first_set_reps(&self, slot_id: &str) -> Option<u32> {
        self.logs
            .get(slot_id)
            .and_then(|sets| sets.first())
            .map(|set| set.repetitions)
    }
}

// ============================================================================
// Active Workout
// ============================================================================

/// The resumable in-progress workout.
///
/// Only one exists at a time. Every mutation is followed by a save through
/// [`crate::active::ActiveWorkoutStore`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActiveWorkoutState {
    pub template: WorkoutTemplate,
    pub session_logs: SessionLogs,
    pub current_slot_index: usize,
    /// 0, 1 or 2
    pub current_set_index: usize,
    pub start_time: DateTime<Utc>,
    /// Absolute rest expiry; `None` when not resting
    pub timer_end_time: Option<DateTime<Utc>>,
    /// Weight chosen for the current slot, cleared when the slot changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
}

impl ActiveWorkoutState {
    /// Fresh state positioned at the first set of the first slot
    pub fn new(template: WorkoutTemplate, now: DateTime<Utc>) -> Self {
        Self {
            template,
            session_logs: SessionLogs::new(),
            current_slot_index: 0,
            current_set_index: 0,
            start_time: now,
            timer_end_time: None,
            weight_kg: None,
        }
    }

    pub fn current_slot(&self) -> Option<&RoutineExerciseSlot> {
        self.template.slots.get(self.current_slot_index)
    }

    pub fn next_slot(&self) -> Option<&RoutineExerciseSlot> {
        self.template.slots.get(self.current_slot_index + 1)
    }

    /// Sets already logged for the current slot
    pub fn current_slot_logs(&self) -> &[SetLog] {
        self.current_slot()
            .and_then(|slot| self.session_logs.get(&slot.id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Fraction of slots fully completed, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        if self.template.slots.is_empty() {
            return 1.0;
        }
        self.current_slot_index as f64 / self.template.slots.len() as f64
    }

    /// Whole seconds since the workout started
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_seconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn two_slot_template() -> WorkoutTemplate {
        WorkoutTemplate {
            id: "t".into(),
            name: "Test".into(),
            slots: vec![
                RoutineExerciseSlot {
                    id: "s1".into(),
                    exercise_id: "e1".into(),
                    order: 1,
                },
                RoutineExerciseSlot {
                    id: "s2".into(),
                    exercise_id: "e2".into(),
                    order: 2,
                },
            ],
        }
    }

    #[test]
    fn test_new_state_starts_at_first_set() {
        let state = ActiveWorkoutState::new(two_slot_template(), Utc::now());
        assert_eq!(state.current_slot().unwrap().id, "s1");
        assert_eq!(state.next_slot().unwrap().id, "s2");
        assert!(state.current_slot_logs().is_empty());
        assert!(state.timer_end_time.is_none());
    }

    #[test]
    fn test_progress_and_elapsed() {
        let start = Utc::now();
        let mut state = ActiveWorkoutState::new(two_slot_template(), start);
        assert_eq!(state.progress(), 0.0);
        state.current_slot_index = 1;
        assert_eq!(state.progress(), 0.5);
        assert_eq!(state.elapsed_seconds(start + Duration::seconds(75)), 75);
        assert_eq!(state.elapsed_seconds(start - Duration::seconds(5)), 0);
    }

    #[test]
    fn test_first_set_reps() {
        let mut logs = SessionLogs::new();
        logs.insert(
            "s1".into(),
            vec![SetLog {
                set_number: 1,
                weight_kg: 40.0,
                repetitions: 11,
            }],
        );
        let session = WorkoutSession {
            id: "x".into(),
            template_id: "t".into(),
            date: Utc::now(),
            logs,
        };
        assert_eq!(session.first_set_reps("s1"), Some(11));
        assert_eq!(session.first_set_reps("s2"), None);
    }
}
