//! Read-side views over completed sessions and the edits the history screen
//! allows.

use crate::{Catalog, Error, ProgressionConfig, Result, SetLog, WorkoutSession, SETS_PER_SLOT};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

/// How a slot's first set compares with the previous session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Improved,
    Declined,
    Same,
    NoPrevious,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlotSummary {
    pub slot_id: String,
    pub exercise_name: String,
    pub sets: Vec<SetLog>,
    pub trend: Trend,
}

/// Per-slot results of `session`, in template order, each compared with the
/// previous session of the same template
pub fn summarize_session(
    catalog: &Catalog,
    history: &[WorkoutSession],
    session: &WorkoutSession,
) -> Vec<SlotSummary> {
    let previous = history
        .iter()
        .filter(|s| s.template_id == session.template_id && s.id != session.id)
        .filter(|s| s.date <= session.date)
        .max_by_key(|s| s.date);

    ordered_slot_ids(catalog, session)
        .into_iter()
        .filter_map(|slot_id| {
            let sets = session.logs.get(&slot_id)?.clone();
            let current = sets.first().map(|s| s.repetitions);
            let before = previous.and_then(|p| p.first_set_reps(&slot_id));
            let trend = match (current, before) {
                (Some(now), Some(then)) if now > then => Trend::Improved,
                (Some(now), Some(then)) if now < then => Trend::Declined,
                (Some(_), Some(_)) => Trend::Same,
                _ => Trend::NoPrevious,
            };
            Some(SlotSummary {
                exercise_name: exercise_name(catalog, &slot_id),
                slot_id,
                sets,
                trend,
            })
        })
        .collect()
}

/// Sessions bucketed by the Monday starting their (UTC) week.
///
/// Weeks are newest first, sessions within a week newest first.
pub fn group_by_week(history: &[WorkoutSession]) -> Vec<(NaiveDate, Vec<&WorkoutSession>)> {
    let mut weeks: BTreeMap<NaiveDate, Vec<&WorkoutSession>> = BTreeMap::new();
    for session in history {
        weeks.entry(week_start(session.date)).or_default().push(session);
    }
    weeks
        .into_iter()
        .rev()
        .map(|(monday, mut sessions)| {
            sessions.sort_by(|a, b| b.date.cmp(&a.date));
            (monday, sessions)
        })
        .collect()
}

/// Monday of the week containing `date`
pub fn week_start(date: DateTime<Utc>) -> NaiveDate {
    let day = date.date_naive();
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// One line of the tabular history view
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryRow {
    pub session_id: String,
    pub date: DateTime<Utc>,
    pub template_name: String,
    pub slot_id: String,
    pub exercise_name: String,
    /// Weight of the first set
    pub weight_kg: f64,
    pub reps: [Option<u32>; SETS_PER_SLOT],
}

/// Flatten sessions into one row per logged slot, newest session first
pub fn history_rows(catalog: &Catalog, history: &[WorkoutSession]) -> Vec<HistoryRow> {
    let mut sessions: Vec<&WorkoutSession> = history.iter().collect();
    sessions.sort_by(|a, b| b.date.cmp(&a.date));

    let mut rows = Vec::new();
    for session in sessions {
        let template_name = catalog
            .template(&session.template_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| session.template_id.clone());

        for slot_id in ordered_slot_ids(catalog, session) {
            let Some(sets) = session.logs.get(&slot_id) else {
                continue;
            };
            let Some(first) = sets.first() else {
                continue;
            };
            let mut reps = [None; SETS_PER_SLOT];
            for (i, set) in sets.iter().take(SETS_PER_SLOT).enumerate() {
                reps[i] = Some(set.repetitions);
            }
            rows.push(HistoryRow {
                session_id: session.id.clone(),
                date: session.date,
                template_name: template_name.clone(),
                exercise_name: exercise_name(catalog, &slot_id),
                slot_id,
                weight_kg: first.weight_kg,
                reps,
            });
        }
    }
    rows
}

/// Set the weight of every set logged for `slot_id`
pub fn set_slot_weight(session: &mut WorkoutSession, slot_id: &str, weight_kg: f64) -> Result<()> {
    if !weight_kg.is_finite() || weight_kg < 0.0 {
        return Err(Error::History(format!("invalid weight {}", weight_kg)));
    }
    let sets = session
        .logs
        .get_mut(slot_id)
        .ok_or_else(|| Error::NotFound(format!("slot {} in session {}", slot_id, session.id)))?;
    for set in sets.iter_mut() {
        set.weight_kg = weight_kg;
    }
    Ok(())
}

/// Change the reps of one set (1-based `set_number`)
pub fn set_reps(
    session: &mut WorkoutSession,
    slot_id: &str,
    set_number: u32,
    repetitions: u32,
    rules: &ProgressionConfig,
) -> Result<()> {
    if repetitions == 0 || repetitions > rules.max_reps {
        return Err(Error::History(format!(
            "repetitions must be between 1 and {}",
            rules.max_reps
        )));
    }
    let session_id = session.id.clone();
    let set = session
        .logs
        .get_mut(slot_id)
        .and_then(|sets| sets.iter_mut().find(|s| s.set_number == set_number))
        .ok_or_else(|| {
            Error::NotFound(format!(
                "set {} of slot {} in session {}",
                set_number, slot_id, session_id
            ))
        })?;
    set.repetitions = repetitions;
    Ok(())
}

/// Slot ids of `session` in template order; unknown slots follow in key order
fn ordered_slot_ids(catalog: &Catalog, session: &WorkoutSession) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(session.logs.len());
    if let Some(template) = catalog.template(&session.template_id) {
        let mut slots: Vec<_> = template.slots.iter().collect();
        slots.sort_by_key(|s| s.order);
        ids.extend(
            slots
                .into_iter()
                .filter(|s| session.logs.contains_key(&s.id))
                .map(|s| s.id.clone()),
        );
    }
    for slot_id in session.logs.keys() {
        if !ids.contains(slot_id) {
            ids.push(slot_id.clone());
        }
    }
    ids
}

fn exercise_name(catalog: &Catalog, slot_id: &str) -> String {
    catalog
        .slot_info(slot_id)
        .map(|info| info.exercise_name.clone())
        .unwrap_or_else(|| slot_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_default_catalog, SessionLogs};
    use chrono::TimeZone;

    fn session(id: &str, template_id: &str, date: DateTime<Utc>, logs: &[(&str, f64, &[u32])]) -> WorkoutSession {
        let mut map = SessionLogs::new();
        for (slot_id, weight, reps) in logs {
            map.insert(
                (*slot_id).to_string(),
                reps.iter()
                    .zip(1..)
                    .map(|(r, n)| SetLog {
                        set_number: n,
                        weight_kg: *weight,
                        repetitions: *r,
                    })
                    .collect(),
            );
        }
        WorkoutSession {
            id: id.into(),
            template_id: template_id.into(),
            date,
            logs: map,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_summary_trends() {
        let catalog = build_default_catalog();
        let older = session(
            "a",
            "dia_1",
            day(2024, 3, 4),
            &[("d1_e1", 20.0, &[10, 8, 8]), ("d1_e2", 40.0, &[12, 8, 8]), ("d1_e3", 30.0, &[9, 9, 9])],
        );
        let newer = session(
            "b",
            "dia_1",
            day(2024, 3, 11),
            &[
                ("d1_e1", 20.0, &[11, 8, 8]),
                ("d1_e2", 40.0, &[10, 8, 8]),
                ("d1_e3", 30.0, &[9, 8, 8]),
                ("d1_e4", 25.0, &[8, 8, 8]),
            ],
        );
        let history = vec![newer.clone(), older];

        let summary = summarize_session(&catalog, &history, &newer);
        let trends: Vec<(&str, Trend)> = summary
            .iter()
            .map(|s| (s.slot_id.as_str(), s.trend))
            .collect();
        assert_eq!(
            trends,
            vec![
                ("d1_e1", Trend::Improved),
                ("d1_e2", Trend::Declined),
                ("d1_e3", Trend::Same),
                ("d1_e4", Trend::NoPrevious),
            ]
        );
        assert_eq!(summary[0].sets.len(), 3);
    }

    #[test]
    fn test_summary_ignores_later_and_other_templates() {
        let catalog = build_default_catalog();
        let first = session("a", "dia_1", day(2024, 3, 4), &[("d1_e1", 20.0, &[10, 8, 8])]);
        let later = session("c", "dia_1", day(2024, 3, 18), &[("d1_e1", 20.0, &[5, 5, 5])]);
        let other = session("d", "dia_2", day(2024, 3, 3), &[("d1_e1", 20.0, &[5, 5, 5])]);
        let history = vec![later, other, first.clone()];

        let summary = summarize_session(&catalog, &history, &first);
        assert_eq!(summary[0].trend, Trend::NoPrevious);
    }

    #[test]
    fn test_summary_orders_slots_by_template() {
        let catalog = build_default_catalog();
        // Logged out of order
        let s = session(
            "a",
            "dia_1",
            day(2024, 3, 4),
            &[("d1_e2", 40.0, &[8, 8, 8]), ("d1_e1", 20.0, &[8, 8, 8])],
        );

        let ids: Vec<String> = summarize_session(&catalog, &[], &s)
            .into_iter()
            .map(|s| s.slot_id)
            .collect();
        assert_eq!(ids, vec!["d1_e1", "d1_e2"]);
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-03-10 is a Sunday, 2024-03-11 a Monday
        assert_eq!(week_start(day(2024, 3, 10)), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(week_start(day(2024, 3, 11)), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(week_start(day(2024, 3, 13)), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_group_by_week_newest_first() {
        let history = vec![
            session("mon", "dia_1", day(2024, 3, 4), &[]),
            session("wed", "dia_2", day(2024, 3, 6), &[]),
            session("next", "dia_3", day(2024, 3, 12), &[]),
        ];

        let weeks = group_by_week(&history);

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].0, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(weeks[0].1.len(), 1);
        let ids: Vec<&str> = weeks[1].1.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["wed", "mon"]);
    }

    #[test]
    fn test_history_rows() {
        let catalog = build_default_catalog();
        let history = vec![
            session("old", "dia_1", day(2024, 3, 4), &[("d1_e1", 20.0, &[10, 9])]),
            session("new", "dia_2", day(2024, 3, 6), &[("d2_e1", 50.0, &[12, 8, 8])]),
        ];

        let rows = history_rows(&catalog, &history);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].session_id, "new");
        assert_eq!(rows[0].template_name, catalog.template("dia_2").unwrap().name);
        assert_eq!(rows[0].reps, [Some(12), Some(8), Some(8)]);
        assert_eq!(rows[1].weight_kg, 20.0);
        assert_eq!(rows[1].reps, [Some(10), Some(9), None]);
        assert_eq!(rows[1].exercise_name, catalog.slot_info("d1_e1").unwrap().exercise_name);
    }

    #[test]
    fn test_edit_slot_weight() {
        let mut s = session("a", "dia_1", day(2024, 3, 4), &[("d1_e1", 20.0, &[10, 9, 8])]);

        set_slot_weight(&mut s, "d1_e1", 22.5).unwrap();
        assert!(s.logs["d1_e1"].iter().all(|set| set.weight_kg == 22.5));

        assert!(matches!(set_slot_weight(&mut s, "d1_e1", -1.0), Err(Error::History(_))));
        assert!(matches!(set_slot_weight(&mut s, "nope", 10.0), Err(Error::NotFound(_))));
        assert!(s.logs["d1_e1"].iter().all(|set| set.weight_kg == 22.5));
    }

    #[test]
    fn test_edit_reps() {
        let rules = ProgressionConfig::default();
        let mut s = session("a", "dia_1", day(2024, 3, 4), &[("d1_e1", 20.0, &[10, 9, 8])]);

        set_reps(&mut s, "d1_e1", 2, 11, &rules).unwrap();
        assert_eq!(
            s.logs["d1_e1"].iter().map(|set| set.repetitions).collect::<Vec<_>>(),
            vec![10, 11, 8]
        );

        assert!(set_reps(&mut s, "d1_e1", 2, 0, &rules).is_err());
        assert!(set_reps(&mut s, "d1_e1", 2, 14, &rules).is_err());
        assert!(matches!(set_reps(&mut s, "d1_e1", 4, 9, &rules), Err(Error::NotFound(_))));
    }
}
