//! Personal record ledger.
//!
//! Read-only comparisons over history:
//! - Epley estimated one-rep max and set volume
//! - All-time bests per exercise definition
//! - Real-time PR check for a just-completed set
//! - Maintenance sweep re-deriving every stored PR flag

use crate::{
    ExerciseDefinition, ExerciseRecords, ExerciseSet, PersonalRecordResult, Store,
};
use std::collections::HashMap;
use uuid::Uuid;

/// Epley estimate; a single rep is the weight itself
pub fn estimated_one_rep_max(weight: f64, reps: u32) -> f64 {
    if weight <= 0.0 || reps == 0 {
        return 0.0;
    }
    if reps > 1 {
        weight * (1.0 + f64::from(reps) / 30.0)
    } else {
        weight
    }
}

pub fn volume(weight: f64, reps: u32) -> f64 {
    weight * f64::from(reps)
}

/// Best weight, estimated 1RM and volume ever logged for a definition
///
/// Scans every logged exercise of the definition in session order, over
/// completed working sets with positive weight and reps. `excluding` skips
/// one set so a set is never compared against itself. Ties keep the first
/// match.
pub fn all_time_records(
    store: &Store,
    definition_id: &str,
    excluding: Option<Uuid>,
) -> ExerciseRecords {
    let mut records = ExerciseRecords::default();

    for exercise in store.exercises_of_definition(definition_id) {
        let date = store.session_start_of(exercise);
        for set in store.sets_in(exercise.id) {
            if !set.counts_toward_records() || Some(set.id) == excluding {
                continue;
            }

            if set.weight > records.best_weight {
                records.best_weight = set.weight;
                records.best_weight_date = date;
            }
            let e1rm = estimated_one_rep_max(set.weight, set.reps);
            if e1rm > records.best_estimated_1rm {
                records.best_estimated_1rm = e1rm;
                records.best_estimated_1rm_date = date;
            }
            let vol = volume(set.weight, set.reps);
            if vol > records.best_volume {
                records.best_volume = vol;
                records.best_volume_date = date;
            }
        }
    }

    records
}

/// Compare one completed working set against all-time bests, itself excluded
pub fn check_for_pr(
    store: &Store,
    set: &ExerciseSet,
    definition: &ExerciseDefinition,
) -> PersonalRecordResult {
    if definition.is_cardio || !set.counts_toward_records() {
        return PersonalRecordResult::none();
    }

    let records = all_time_records(store, &definition.id, Some(set.id));

    PersonalRecordResult {
        is_weight_pr: set.weight > records.best_weight,
        is_estimated_1rm_pr: estimated_one_rep_max(set.weight, set.reps)
            > records.best_estimated_1rm,
        is_volume_pr: volume(set.weight, set.reps) > records.best_volume,
    }
}

#[derive(Default)]
struct RunningBest {
    weight: f64,
    e1rm: f64,
    volume: f64,
}

/// Re-derive every PR flag in finished sessions from scratch
///
/// Walks finished sessions oldest first keeping a running best per
/// definition. Idempotent for a given history. Returns the number of sets
/// carrying at least one flag afterwards.
pub fn backfill_pr_flags(store: &mut Store) -> usize {
    let mut bests: HashMap<String, RunningBest> = HashMap::new();
    let mut updates: Vec<(Uuid, PersonalRecordResult)> = Vec::new();

    for session in store.finished_sessions() {
        for exercise in store.exercises_in(session.id) {
            let Some(definition) = store.definition(&exercise.definition_id) else {
                continue;
            };
            if definition.is_cardio {
                continue;
            }
            let best = bests.entry(definition.id.clone()).or_default();

            for set in store.sets_in(exercise.id) {
                if !set.counts_toward_records() {
                    updates.push((set.id, PersonalRecordResult::none()));
                    continue;
                }

                let mut result = PersonalRecordResult::none();
                if set.weight > best.weight {
                    result.is_weight_pr = true;
                    best.weight = set.weight;
                }
                let e1rm = estimated_one_rep_max(set.weight, set.reps);
                if e1rm > best.e1rm {
                    result.is_estimated_1rm_pr = true;
                    best.e1rm = e1rm;
                }
                let vol = volume(set.weight, set.reps);
                if vol > best.volume {
                    result.is_volume_pr = true;
                    best.volume = vol;
                }
                updates.push((set.id, result));
            }
        }
    }

    let mut flagged = 0;
    for (set_id, result) in updates {
        if let Some(set) = store.sets.get_mut(&set_id) {
            set.apply_pr(result);
            if result.is_any() {
                flagged += 1;
            }
        }
    }

    tracing::info!("Backfilled PR flags: {} sets flagged", flagged);
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoggedExercise, MuscleGroup, Session, SetKind};
    use chrono::{Duration, Utc};

    fn definition(id: &str, is_cardio: bool) -> ExerciseDefinition {
        ExerciseDefinition {
            id: id.into(),
            name: id.into(),
            muscle_group: MuscleGroup::Chest,
            is_cardio,
            default_rest_seconds: None,
            last_used_at: None,
        }
    }

    /// Adds a finished session holding completed sets `(weight, reps, kind)`
    fn add_session(store: &mut Store, days_ago: i64, sets: &[(f64, u32, SetKind)]) -> Vec<Uuid> {
        let start = Utc::now() - Duration::days(days_ago);
        let mut session = Session::new(start);
        session.ended_at = Some(start + Duration::hours(1));
        let exercise = LoggedExercise::new(session.id, "bench_press", 0);
        let exercise_id = exercise.id;
        store.insert_session(session);
        store.insert_exercise(exercise);

        sets.iter()
            .enumerate()
            .map(|(order, (weight, reps, kind))| {
                let mut set = ExerciseSet::new(exercise_id, order)
                    .with_values(*weight, *reps)
                    .with_kind(*kind);
                set.is_completed = true;
                let id = set.id;
                store.insert_set(set);
                id
            })
            .collect()
    }

    fn store() -> Store {
        let mut store = Store::new();
        store.upsert_definition(definition("bench_press", false));
        store
    }

    #[test]
    fn test_one_rep_max_formula() {
        assert_eq!(estimated_one_rep_max(100.0, 1), 100.0);
        assert!((estimated_one_rep_max(100.0, 10) - 133.333).abs() < 0.001);
        assert_eq!(estimated_one_rep_max(0.0, 5), 0.0);
        assert_eq!(estimated_one_rep_max(100.0, 0), 0.0);
    }

    #[test]
    fn test_one_rep_max_exceeds_weight_for_multiple_reps() {
        for weight in [2.5, 45.0, 135.0, 500.0] {
            assert_eq!(estimated_one_rep_max(weight, 1), weight);
            for reps in 2..20 {
                assert!(estimated_one_rep_max(weight, reps) > weight);
            }
        }
    }

    #[test]
    fn test_all_time_records_skip_warmups_and_excluded() {
        let mut store = store();
        let ids = add_session(
            &mut store,
            3,
            &[(200.0, 1, SetKind::Warmup), (135.0, 5, SetKind::Normal), (150.0, 3, SetKind::Normal)],
        );

        let records = all_time_records(&store, "bench_press", None);
        assert_eq!(records.best_weight, 150.0);
        assert_eq!(records.best_volume, 675.0);

        let without_top = all_time_records(&store, "bench_press", Some(ids[2]));
        assert_eq!(without_top.best_weight, 135.0);
    }

    #[test]
    fn test_first_lift_is_all_three_prs() {
        let mut store = store();
        let ids = add_session(&mut store, 1, &[(135.0, 5, SetKind::Normal)]);
        let set = store.sets.get(&ids[0]).unwrap().clone();

        let result = check_for_pr(&store, &set, &definition("bench_press", false));
        assert!(result.is_weight_pr);
        assert!(result.is_estimated_1rm_pr);
        assert!(result.is_volume_pr);
    }

    #[test]
    fn test_lighter_set_is_not_pr() {
        let mut store = store();
        add_session(&mut store, 2, &[(135.0, 5, SetKind::Normal)]);
        let ids = add_session(&mut store, 1, &[(95.0, 5, SetKind::Normal)]);
        let set = store.sets.get(&ids[0]).unwrap().clone();

        let result = check_for_pr(&store, &set, &definition("bench_press", false));
        assert_eq!(result, PersonalRecordResult::none());
    }

    #[test]
    fn test_equal_set_is_not_pr() {
        let mut store = store();
        add_session(&mut store, 2, &[(135.0, 5, SetKind::Normal)]);
        let ids = add_session(&mut store, 1, &[(135.0, 5, SetKind::Normal)]);
        let set = store.sets.get(&ids[0]).unwrap().clone();

        assert!(!check_for_pr(&store, &set, &definition("bench_press", false)).is_any());
    }

    #[test]
    fn test_more_reps_is_volume_and_e1rm_pr_only() {
        let mut store = store();
        add_session(&mut store, 2, &[(135.0, 5, SetKind::Normal)]);
        let ids = add_session(&mut store, 1, &[(135.0, 8, SetKind::Normal)]);
        let set = store.sets.get(&ids[0]).unwrap().clone();

        let result = check_for_pr(&store, &set, &definition("bench_press", false));
        assert!(!result.is_weight_pr);
        assert!(result.is_estimated_1rm_pr);
        assert!(result.is_volume_pr);
    }

    #[test]
    fn test_cardio_warmup_and_incomplete_never_pr() {
        let mut store = store();
        let ids = add_session(&mut store, 1, &[(135.0, 5, SetKind::Warmup)]);
        let warmup = store.sets.get(&ids[0]).unwrap().clone();
        assert!(!check_for_pr(&store, &warmup, &definition("bench_press", false)).is_any());

        let mut incomplete = warmup.clone().with_kind(SetKind::Normal);
        incomplete.is_completed = false;
        assert!(!check_for_pr(&store, &incomplete, &definition("bench_press", false)).is_any());

        let working = warmup.with_kind(SetKind::Normal);
        assert!(!check_for_pr(&store, &working, &definition("bench_press", true)).is_any());
    }

    #[test]
    fn test_backfill_matches_chronology() {
        let mut store = store();
        let first = add_session(&mut store, 3, &[(100.0, 5, SetKind::Normal)]);
        let second = add_session(&mut store, 2, &[(90.0, 10, SetKind::Normal)]);
        let third = add_session(&mut store, 1, &[(95.0, 5, SetKind::Normal), (60.0, 5, SetKind::Warmup)]);

        // Stale flags that the sweep must correct
        store.sets.get_mut(&third[0]).unwrap().is_weight_pr = true;
        store.sets.get_mut(&third[1]).unwrap().is_volume_pr = true;

        let flagged = backfill_pr_flags(&mut store);
        assert_eq!(flagged, 2);

        let flags = |id: &Uuid| store.sets.get(id).unwrap().pr_flags();
        assert!(flags(&first[0]).is_weight_pr);
        assert!(flags(&first[0]).is_volume_pr);

        let second_flags = flags(&second[0]);
        assert!(!second_flags.is_weight_pr);
        assert!(second_flags.is_estimated_1rm_pr);
        assert!(second_flags.is_volume_pr);

        assert_eq!(flags(&third[0]), PersonalRecordResult::none());
        assert_eq!(flags(&third[1]), PersonalRecordResult::none());
    }

    #[test]
    fn test_backfill_is_idempotent() {
        let mut store = store();
        add_session(&mut store, 3, &[(100.0, 5, SetKind::Normal), (110.0, 3, SetKind::Normal)]);
        add_session(&mut store, 1, &[(120.0, 1, SetKind::Normal)]);

        backfill_pr_flags(&mut store);
        let once = store.clone();
        backfill_pr_flags(&mut store);
        assert_eq!(once, store);
    }
}
