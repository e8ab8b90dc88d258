//! Target-rep estimation.
//!
//! Only the first set of a slot adapts to history; sets 2 and 3 always aim
//! for the baseline. For the first set the target ratchets one rep above the
//! best result ever recorded for the exercise at the entered weight:
//!
//! 1. Collect every historical set whose slot resolves to an exercise with the
//!    same *name* and whose weight equals the entered weight. None → baseline.
//! 2. `max_historic` = most reps across those sets.
//! 3. Take the latest session of the same template and its first set at this
//!    weight for the same *slot id*. If it reached `max_historic`, target its
//!    reps + 1, otherwise `max_historic` + 1.
//!
//! Matching by name lets left/right variants share one record; the
//! session-to-session comparison stays per slot.

use crate::{Catalog, ExerciseDefinition, ProgressionConfig, WorkoutSession};

/// Everything the estimator needs to know about the set being performed
#[derive(Clone, Debug)]
pub struct TargetQuery<'a> {
    pub template_id: &'a str,
    pub slot_id: &'a str,
    pub exercise: &'a ExerciseDefinition,
    pub weight_kg: f64,
    /// 0, 1 or 2
    pub set_index: usize,
}

/// Compute the rep goal for the set described by `query`.
///
/// Callers must only ask once a weight has been chosen.
pub fn estimate_target_reps(
    catalog: &Catalog,
    history: &[WorkoutSession],
    query: &TargetQuery<'_>,
    rules: &ProgressionConfig,
) -> u32 {
    if query.set_index > 0 {
        return rules.baseline_target;
    }

    let Some(max_historic) = historic_max_reps(catalog, history, &query.exercise.name, query.weight_kg)
    else {
        tracing::debug!(
            "No history for '{}' at {} kg, using baseline target",
            query.exercise.name,
            query.weight_kg
        );
        return rules.baseline_target;
    };

    let last_first_set = crate::history::last_session_for_template(history, query.template_id, None)
        .and_then(|session| session.logs.get(query.slot_id))
        .and_then(|sets| sets.iter().find(|set| set.weight_kg == query.weight_kg))
        .map(|set| set.repetitions);

    let target = match last_first_set {
        Some(reps) if reps >= max_historic => reps + 1,
        _ => max_historic + 1,
    };

    tracing::debug!(
        "Target for '{}' at {} kg: {} (historic max {}, last {:?})",
        query.exercise.name,
        query.weight_kg,
        target,
        max_historic,
        last_first_set
    );
    target
}

/// Best rep count ever logged for `exercise_name` at exactly `weight_kg`
fn historic_max_reps(
    catalog: &Catalog,
    history: &[WorkoutSession],
    exercise_name: &str,
    weight_kg: f64,
) -> Option<u32> {
    history
        .iter()
        .flat_map(|session| session.logs.iter())
        .filter(|(slot_id, _)| {
            catalog
                .slot_info(slot_id)
                .is_some_and(|info| info.exercise_name == exercise_name)
        })
        .flat_map(|(_, sets)| sets.iter())
        .filter(|set| set.weight_kg == weight_kg)
        .map(|set| set.repetitions)
        .max()
}
