//! The active-workout state machine.
//!
//! ```text
//!  start ──► AwaitingWeight ──weight──► ReadyToLog ──log_set──► Resting
//!                 ▲                                                │
//!                 └──────────── tick (expired) / skip_rest ◄───────┘
//!                                      log_set on final set ──► Complete
//! ```
//!
//! The controller owns the one in-progress [`ActiveWorkoutState`] and saves
//! it after every mutation. Store and notifier failures are logged and do
//! not undo the local change.

use crate::active::ActiveWorkoutStore;
use crate::estimator::{estimate_target_reps, TargetQuery};
use crate::history::{previous_first_set_weight, HistoryStore};
use crate::timer::{remaining_seconds, RestNotice, RestNotifier, RestSchedule, RestToken};
use crate::{
    ActiveWorkoutState, Catalog, Error, ExerciseDefinition, ProgressionConfig, Result, SetLog,
    WorkoutSession, SETS_PER_SLOT,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Where the user currently is in the flow
#[derive(Clone, Debug, PartialEq)]
pub enum WorkoutPhase {
    /// No workout in progress
    Idle,
    /// First set of a slot, no weight chosen yet
    AwaitingWeight { suggested: Option<f64> },
    ReadyToLog { weight_kg: f64, target: u32 },
    Resting { remaining: u64, next_up: String },
    /// The last workout was just finished
    Complete,
}

/// Something the caller should surface to the user
#[derive(Clone, Debug, PartialEq)]
pub enum WorkoutEvent {
    /// The slot's three sets met the 12/8/8 minimums; add weight next time
    ProgressionUnlocked {
        slot_id: String,
        exercise_name: String,
        reps: Vec<u32>,
    },
    RestStarted(RestNotice),
    WorkoutCompleted(WorkoutSession),
}

/// Result of a rest-timer tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to count down
    Idle,
    Resting { remaining: u64 },
    /// Rest just ran out and was cleared
    Elapsed,
}

/// Drives one workout at a time through its sets
pub struct WorkoutController<'a> {
    catalog: &'a Catalog,
    rules: ProgressionConfig,
    active_store: Box<dyn ActiveWorkoutStore>,
    history_store: Box<dyn HistoryStore>,
    notifier: Box<dyn RestNotifier>,
    history: Vec<WorkoutSession>,
    active: Option<ActiveWorkoutState>,
    schedule: RestSchedule,
    last_finished: Option<WorkoutSession>,
}

impl<'a> WorkoutController<'a> {
    pub fn new(
        catalog: &'a Catalog,
        rules: ProgressionConfig,
        active_store: Box<dyn ActiveWorkoutStore>,
        history_store: Box<dyn HistoryStore>,
        notifier: Box<dyn RestNotifier>,
    ) -> Self {
        Self {
            catalog,
            rules,
            active_store,
            history_store,
            notifier,
            history: Vec::new(),
            active: None,
            schedule: RestSchedule::default(),
            last_finished: None,
        }
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Pull a fresh snapshot from the history store
    pub fn load_history(&mut self) -> Result<()> {
        let sessions = self.history_store.list()?;
        self.refresh_history(sessions);
        Ok(())
    }

    /// Replace the history snapshot. Targets are computed on demand, so they
    /// follow the new history immediately.
    pub fn refresh_history(&mut self, sessions: Vec<WorkoutSession>) {
        tracing::debug!("History snapshot now has {} sessions", sessions.len());
        self.history = sessions;
    }

    pub fn history(&self) -> &[WorkoutSession] {
        &self.history
    }

    /// Write an edited session through to the store.
    ///
    /// The local snapshot is updated first and kept even if the store fails.
    pub fn update_session(&mut self, session: WorkoutSession) -> Result<()> {
        if let Some(existing) = self.history.iter_mut().find(|s| s.id == session.id) {
            *existing = session.clone();
        }
        self.history_store.update(&session).inspect_err(|e| {
            tracing::warn!("Failed to update session {}: {}", session.id, e);
        })
    }

    /// Delete a session locally and in the store
    pub fn delete_session(&mut self, session_id: &str) -> Result<()> {
        self.history.retain(|s| s.id != session_id);
        self.history_store.delete(session_id).inspect_err(|e| {
            tracing::warn!("Failed to delete session {}: {}", session_id, e);
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start `template_id`, replacing any workout in progress
    pub fn start(&mut self, template_id: &str, now: DateTime<Utc>) -> Result<()> {
        let template = self
            .catalog
            .template(template_id)
            .ok_or_else(|| Error::NotFound(format!("template {}", template_id)))?;
        if template.slots.is_empty() {
            return Err(Error::Workout(format!("template {} has no exercises", template_id)));
        }

        if let Some(previous) = &self.active {
            tracing::info!("Discarding workout '{}' in favour of '{}'", previous.template.id, template_id);
        }

        self.active = Some(ActiveWorkoutState::new(template.clone(), now));
        self.last_finished = None;
        self.schedule.clear();
        self.cancel_notice();
        self.persist();
        tracing::info!("Started workout '{}'", template_id);
        Ok(())
    }

    /// Whether a persisted workout is waiting to be resumed
    pub fn has_resumable(&self) -> bool {
        self.active.is_none() && self.active_store.load().is_some()
    }

    /// Load the persisted workout into memory. Returns false if there is none.
    pub fn resume(&mut self) -> bool {
        let Some(mut state) = self.active_store.load() else {
            return false;
        };
        if state.current_slot().is_none() {
            tracing::warn!(
                "Persisted workout '{}' has no current slot; discarding",
                state.template.id
            );
            self.discard();
            return false;
        }

        // Weight is fixed after the first set of a slot
        if state.weight_kg.is_none() && state.current_set_index > 0 {
            state.weight_kg = state.current_slot_logs().last().map(|set| set.weight_kg);
        }
        match state.timer_end_time {
            Some(end) => {
                self.schedule.arm(end);
            }
            None => self.schedule.clear(),
        }
        tracing::debug!(
            "Resumed workout '{}' at slot {} set {}",
            state.template.id,
            state.current_slot_index,
            state.current_set_index
        );
        self.active = Some(state);
        true
    }

    /// Drop the workout in progress, in memory and in storage
    pub fn discard(&mut self) {
        self.active = None;
        self.schedule.clear();
        self.cancel_notice();
        self.persist();
        tracing::info!("Discarded active workout");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn active(&self) -> Option<&ActiveWorkoutState> {
        self.active.as_ref()
    }

    pub fn weight(&self) -> Option<f64> {
        self.active.as_ref()?.weight_kg
    }

    /// The session produced by the most recent completion
    pub fn last_finished(&self) -> Option<&WorkoutSession> {
        self.last_finished.as_ref()
    }

    pub fn rest_token(&self) -> Option<RestToken> {
        self.schedule.current()
    }

    pub fn current_exercise(&self) -> Option<&'a ExerciseDefinition> {
        let slot = self.active.as_ref()?.current_slot()?;
        self.catalog.exercise_for_slot(slot)
    }

    /// Weight proposed for the first set of the current slot: set 1 of the
    /// same slot in the latest session of this template
    pub fn suggested_weight(&self) -> Option<f64> {
        let state = self.active.as_ref()?;
        if state.current_set_index != 0 {
            return None;
        }
        let slot = state.current_slot()?;
        previous_first_set_weight(&self.history, &state.template.id, &slot.id)
    }

    /// Rep goal for the current set, once a weight is known
    pub fn target_reps(&self) -> Option<u32> {
        let state = self.active.as_ref()?;
        let weight_kg = state.weight_kg?;
        let slot = state.current_slot()?;
        let exercise = self.catalog.exercise_for_slot(slot)?;
        Some(estimate_target_reps(
            self.catalog,
            &self.history,
            &TargetQuery {
                template_id: &state.template.id,
                slot_id: &slot.id,
                exercise,
                weight_kg,
                set_index: state.current_set_index,
            },
            &self.rules,
        ))
    }

    pub fn phase(&self, now: DateTime<Utc>) -> WorkoutPhase {
        let Some(state) = &self.active else {
            return if self.last_finished.is_some() {
                WorkoutPhase::Complete
            } else {
                WorkoutPhase::Idle
            };
        };

        if let Some(end) = state.timer_end_time {
            let remaining = remaining_seconds(end, now);
            if remaining > 0 {
                return WorkoutPhase::Resting {
                    remaining,
                    next_up: self.upcoming_label(state),
                };
            }
        }

        match (state.weight_kg, self.target_reps()) {
            (Some(weight_kg), Some(target)) => WorkoutPhase::ReadyToLog { weight_kg, target },
            _ => WorkoutPhase::AwaitingWeight {
                suggested: self.suggested_weight(),
            },
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Choose the weight for the current slot
    pub fn set_weight(&mut self, weight_kg: f64) -> Result<()> {
        let state = self
            .active
            .as_mut()
            .ok_or_else(|| Error::Workout("no workout in progress".into()))?;
        if state.current_set_index != 0 {
            return Err(Error::Workout(
                "weight can only be changed before the first set of an exercise".into(),
            ));
        }
        if !weight_kg.is_finite() || weight_kg < 0.0 {
            return Err(Error::Workout(format!("invalid weight {}", weight_kg)));
        }
        state.weight_kg = Some(weight_kg);
        self.persist();
        Ok(())
    }

    /// Take the suggested weight ("same as last time")
    pub fn accept_suggested_weight(&mut self) -> Result<f64> {
        let weight_kg = self
            .suggested_weight()
            .ok_or_else(|| Error::Workout("no previous weight for this exercise".into()))?;
        self.set_weight(weight_kg)?;
        Ok(weight_kg)
    }

    /// Record a set and move to the next position.
    ///
    /// Without a chosen weight this is a silent no-op returning no events.
    pub fn log_set(&mut self, repetitions: u32, now: DateTime<Utc>) -> Result<Vec<WorkoutEvent>> {
        if repetitions == 0 || repetitions > self.rules.max_reps {
            return Err(Error::Workout(format!(
                "repetitions must be between 1 and {}",
                self.rules.max_reps
            )));
        }
        let catalog = self.catalog;
        let state = self
            .active
            .as_mut()
            .ok_or_else(|| Error::Workout("no workout in progress".into()))?;
        if let Some(end) = state.timer_end_time {
            let remaining = remaining_seconds(end, now);
            if remaining > 0 {
                return Err(Error::Workout(format!(
                    "resting for another {}s; skip rest first",
                    remaining
                )));
            }
        }
        let Some(weight_kg) = state.weight_kg else {
            tracing::debug!("Ignoring set: no weight chosen");
            return Ok(Vec::new());
        };

        let slot = state
            .current_slot()
            .cloned()
            .ok_or_else(|| Error::State("active workout is past its last slot".into()))?;
        let exercise = catalog
            .exercise_for_slot(&slot)
            .ok_or_else(|| Error::NotFound(format!("exercise {}", slot.exercise_id)))?;

        let set = SetLog {
            set_number: state.current_set_index as u32 + 1,
            weight_kg,
            repetitions,
        };
        tracing::info!(
            "Logged {} set {}: {} x {} kg",
            exercise.name,
            set.set_number,
            repetitions,
            weight_kg
        );
        state.session_logs.entry(slot.id.clone()).or_default().push(set);

        let mut events = Vec::new();

        if state.current_set_index == SETS_PER_SLOT - 1 {
            let reps: Vec<u32> = state
                .session_logs
                .get(&slot.id)
                .map(|sets| sets.iter().map(|s| s.repetitions).collect())
                .unwrap_or_default();
            if milestone_reached(&reps, &self.rules) {
                tracing::info!("Progression unlocked for {}: {:?}", exercise.name, reps);
                events.push(WorkoutEvent::ProgressionUnlocked {
                    slot_id: slot.id.clone(),
                    exercise_name: exercise.name.clone(),
                    reps,
                });
            }
        }

        let duration = exercise.default_rest_seconds;
        let expires_at = now + Duration::seconds(i64::from(duration));
        let next_up = next_up_after_log(state, catalog);
        let notice = RestNotice {
            duration,
            next_up,
            issued_at: now,
            token: self.schedule.arm(expires_at),
        };

        state.current_set_index += 1;
        if state.current_set_index >= SETS_PER_SLOT {
            state.current_set_index = 0;
            state.current_slot_index += 1;
            state.weight_kg = None;
        }

        if state.current_slot_index >= state.template.slots.len() {
            let session = WorkoutSession {
                id: Uuid::new_v4().to_string(),
                template_id: state.template.id.clone(),
                date: now,
                logs: state.session_logs.clone(),
            };
            self.send_notice(&notice);
            events.push(WorkoutEvent::RestStarted(notice));
            self.finish(session.clone());
            events.push(WorkoutEvent::WorkoutCompleted(session));
            return Ok(events);
        }

        state.timer_end_time = Some(expires_at);
        self.persist();
        self.send_notice(&notice);
        events.push(WorkoutEvent::RestStarted(notice));
        Ok(events)
    }

    /// End the rest early
    pub fn skip_rest(&mut self) -> bool {
        let Some(state) = self.active.as_mut() else {
            return false;
        };
        if state.timer_end_time.take().is_none() {
            return false;
        }
        self.schedule.clear();
        self.cancel_notice();
        self.persist();
        tracing::debug!("Rest skipped");
        true
    }

    /// Recompute remaining rest; clears the timer once it runs out
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let Some(state) = self.active.as_mut() else {
            return TickOutcome::Idle;
        };
        let Some(end) = state.timer_end_time else {
            return TickOutcome::Idle;
        };

        let remaining = remaining_seconds(end, now);
        if remaining > 0 {
            return TickOutcome::Resting { remaining };
        }

        state.timer_end_time = None;
        self.schedule.clear();
        self.persist();
        tracing::debug!("Rest elapsed");
        TickOutcome::Elapsed
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn finish(&mut self, session: WorkoutSession) {
        tracing::info!(
            "Workout '{}' complete with {} exercises",
            session.template_id,
            session.logs.len()
        );
        if let Err(e) = self.history_store.add(&session) {
            tracing::warn!("Failed to store session {}: {}", session.id, e);
        }
        self.history.insert(0, session.clone());
        self.active = None;
        self.schedule.clear();
        self.last_finished = Some(session);
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = self.active_store.save(self.active.as_ref()) {
            tracing::warn!("Failed to persist active workout: {}", e);
        }
    }

    fn send_notice(&mut self, notice: &RestNotice) {
        if let Err(e) = self.notifier.schedule(notice) {
            tracing::warn!("Failed to schedule rest notice: {}", e);
        }
    }

    fn cancel_notice(&mut self) {
        if let Err(e) = self.notifier.cancel() {
            tracing::warn!("Failed to cancel rest notice: {}", e);
        }
    }

    /// What the user will do once the current rest ends
    fn upcoming_label(&self, state: &ActiveWorkoutState) -> String {
        if state.current_set_index > 0 {
            return format!("Set {}", state.current_set_index + 1);
        }
        state
            .current_slot()
            .and_then(|slot| self.catalog.exercise_for_slot(slot))
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "Last Set!".to_string())
    }
}

/// Label for the rest notice, computed before the position advances
fn next_up_after_log(state: &ActiveWorkoutState, catalog: &Catalog) -> String {
    if state.current_set_index < SETS_PER_SLOT - 1 {
        return format!("Set {}", state.current_set_index + 2);
    }
    state
        .next_slot()
        .and_then(|slot| catalog.exercise_for_slot(slot))
        .map(|e| e.name.clone())
        .unwrap_or_else(|| "Last Set!".to_string())
}

/// 12/8/8: first set at the first-set minimum, the rest at the follow-up one
pub fn milestone_reached(reps: &[u32], rules: &ProgressionConfig) -> bool {
    match reps {
        [first, rest @ ..] if rest.len() == SETS_PER_SLOT - 1 => {
            *first >= rules.milestone_first_set
                && rest.iter().all(|r| *r >= rules.milestone_follow_up)
        }
        _ => false,
    }
}
