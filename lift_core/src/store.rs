//! Arena store for sessions, logged exercises, sets and exercise definitions.
//!
//! Each entity lives in its own table keyed by identity. Parent links are
//! foreign keys (`session_id`, `logged_exercise_id`), and deletes cascade
//! explicitly: children are removed before their parent.

use crate::{ExerciseDefinition, ExerciseSet, LoggedExercise, Session, SessionSummary};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One keyed table of entities
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Table<K: Ord, V> {
    rows: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> Table<K, V> {
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.rows.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.rows.remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.rows.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.rows.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.rows.values_mut()
    }

    /// Rows matching `predicate`, ordered by `sort`, truncated to `limit`
    pub fn fetch<P, S>(&self, predicate: P, mut sort: S, limit: Option<usize>) -> Vec<&V>
    where
        P: Fn(&V) -> bool,
        S: FnMut(&V, &V) -> Ordering,
    {
        let mut rows: Vec<&V> = self.rows.values().filter(|v| predicate(*v)).collect();
        rows.sort_by(|a, b| sort(*a, *b));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// All persisted entities
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Store {
    #[serde(default)]
    pub sessions: Table<Uuid, Session>,
    #[serde(default)]
    pub exercises: Table<Uuid, LoggedExercise>,
    #[serde(default)]
    pub sets: Table<Uuid, ExerciseSet>,
    #[serde(default)]
    pub definitions: Table<String, ExerciseDefinition>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Inserts
    // ------------------------------------------------------------------

    pub fn insert_session(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    pub fn insert_exercise(&mut self, exercise: LoggedExercise) {
        self.exercises.insert(exercise.id, exercise);
    }

    pub fn insert_set(&mut self, set: ExerciseSet) {
        self.sets.insert(set.id, set);
    }

    /// Insert or replace a definition, keeping an existing `last_used_at`
    pub fn upsert_definition(&mut self, mut definition: ExerciseDefinition) {
        if let Some(existing) = self.definitions.get(&definition.id) {
            if definition.last_used_at.is_none() {
                definition.last_used_at = existing.last_used_at;
            }
        }
        self.definitions.insert(definition.id.clone(), definition);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn definition(&self, id: &str) -> Option<&ExerciseDefinition> {
        self.definitions.get(&id.to_string())
    }

    /// The single session without an end timestamp
    pub fn active_session(&self) -> Option<&Session> {
        self.sessions
            .fetch(|s| s.is_active(), |a, b| b.started_at.cmp(&a.started_at), Some(1))
            .into_iter()
            .next()
    }

    /// Finished sessions, oldest first
    pub fn finished_sessions(&self) -> Vec<&Session> {
        self.sessions.fetch(
            |s| !s.is_active(),
            |a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)),
            None,
        )
    }

    /// Logged exercises of a session, by order
    pub fn exercises_in(&self, session_id: Uuid) -> Vec<&LoggedExercise> {
        self.exercises.fetch(
            |e| e.session_id == session_id,
            |a, b| a.order.cmp(&b.order),
            None,
        )
    }

    /// Sets of a logged exercise, by order
    pub fn sets_in(&self, logged_exercise_id: Uuid) -> Vec<&ExerciseSet> {
        self.sets.fetch(
            |s| s.logged_exercise_id == logged_exercise_id,
            |a, b| a.order.cmp(&b.order),
            None,
        )
    }

    /// Start date of the session owning a logged exercise
    pub fn session_start_of(&self, exercise: &LoggedExercise) -> Option<chrono::DateTime<chrono::Utc>> {
        self.sessions.get(&exercise.session_id).map(|s| s.started_at)
    }

    fn session_is_finished(&self, session_id: Uuid) -> bool {
        self.sessions
            .get(&session_id)
            .map(|s| !s.is_active())
            .unwrap_or(false)
    }

    /// Most recent finished-session occurrence of an exercise definition
    pub fn last_finished_exercise(&self, definition_id: &str) -> Option<&LoggedExercise> {
        self.exercises
            .fetch(
                |e| e.definition_id == definition_id && self.session_is_finished(e.session_id),
                |a, b| {
                    self.session_start_of(b)
                        .cmp(&self.session_start_of(a))
                        .then(a.order.cmp(&b.order))
                },
                Some(1),
            )
            .into_iter()
            .next()
    }

    /// Every logged exercise of a definition in scan order
    /// (session start ascending, then exercise order)
    pub fn exercises_of_definition(&self, definition_id: &str) -> Vec<&LoggedExercise> {
        self.exercises.fetch(
            |e| e.definition_id == definition_id,
            |a, b| {
                self.session_start_of(a)
                    .cmp(&self.session_start_of(b))
                    .then(a.session_id.cmp(&b.session_id))
                    .then(a.order.cmp(&b.order))
            },
            None,
        )
    }

    pub fn is_cardio(&self, exercise: &LoggedExercise) -> bool {
        self.definition(&exercise.definition_id)
            .map(|d| d.is_cardio)
            .unwrap_or(false)
    }

    /// Summary used by external collaborators once a session is finished
    pub fn session_summary(&self, session_id: Uuid) -> Option<SessionSummary> {
        let session = self.sessions.get(&session_id)?;
        let ended_at = session.ended_at?;
        let exercises = self.exercises_in(session_id);

        let mut completed_sets = 0;
        let mut total_volume = 0.0;
        for exercise in &exercises {
            for set in self.sets_in(exercise.id) {
                if set.is_completed {
                    completed_sets += 1;
                    total_volume += set.weight * f64::from(set.reps);
                }
            }
        }

        Some(SessionSummary {
            session_id,
            started_at: session.started_at,
            ended_at,
            exercise_count: exercises.len(),
            completed_sets,
            total_volume,
        })
    }

    // ------------------------------------------------------------------
    // Deletes and renumbering
    // ------------------------------------------------------------------

    /// Remove a set and close the gap it leaves in its siblings' order
    pub fn delete_set(&mut self, set_id: Uuid) -> Option<ExerciseSet> {
        let removed = self.sets.remove(&set_id)?;
        for set in self.sets.values_mut() {
            if set.logged_exercise_id == removed.logged_exercise_id && set.order > removed.order {
                set.order -= 1;
            }
        }
        Some(removed)
    }

    /// Remove a logged exercise after its sets
    pub fn delete_logged_exercise(&mut self, exercise_id: Uuid) -> Option<LoggedExercise> {
        let set_ids: Vec<Uuid> = self
            .sets
            .values()
            .filter(|s| s.logged_exercise_id == exercise_id)
            .map(|s| s.id)
            .collect();
        for id in set_ids {
            self.sets.remove(&id);
        }
        self.exercises.remove(&exercise_id)
    }

    /// Remove a session after its whole subtree
    pub fn delete_session(&mut self, session_id: Uuid) -> Option<Session> {
        let exercise_ids: Vec<Uuid> = self
            .exercises
            .values()
            .filter(|e| e.session_id == session_id)
            .map(|e| e.id)
            .collect();
        for id in exercise_ids {
            self.delete_logged_exercise(id);
        }
        self.sessions.remove(&session_id)
    }

    /// Reassign dense 0-based orders to a session's exercises, keeping relative order
    pub fn renumber_exercises(&mut self, session_id: Uuid) {
        let ids: Vec<Uuid> = self.exercises_in(session_id).iter().map(|e| e.id).collect();
        for (index, id) in ids.iter().enumerate() {
            if let Some(exercise) = self.exercises.get_mut(id) {
                exercise.order = index;
            }
        }
    }

    /// Reassign dense 0-based orders to an exercise's sets, keeping relative order
    pub fn renumber_sets(&mut self, logged_exercise_id: Uuid) {
        let ids: Vec<Uuid> = self.sets_in(logged_exercise_id).iter().map(|s| s.id).collect();
        for (index, id) in ids.iter().enumerate() {
            if let Some(set) = self.sets.get_mut(id) {
                set.order = index;
            }
        }
    }
}
