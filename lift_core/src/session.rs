//! Session controller.
//!
//! Owns the active session aggregate and every mutation on it. Each
//! operation is a defensive no-op when its preconditions fail (no active
//! session, an id from another session), and every mutation ends with a
//! best-effort save whose failure is logged and dropped; the in-memory store
//! stays authoritative and the next save retries naturally.

use crate::clock::{Clock, SystemClock};
use crate::collaborators::{
    FeedbackEmitter, HealthSync, LogNotifier, NotificationScheduler, TerminalFeedback,
};
use crate::grouping;
use crate::records;
use crate::repository::Repository;
use crate::rest_timer::{RestTimer, RestTimerSnapshot};
use crate::template::{plan_sets, LastPerformance, WorkoutTemplate};
use crate::toast::{PrToast, PrToastSnapshot};
use crate::{
    Config, ExerciseDefinition, ExerciseRecords, ExerciseSet, LoggedExercise,
    PersonalRecordResult, Result, Session, SetKind, Store,
};
use std::sync::Arc;
use std::thread::JoinHandle;
use uuid::Uuid;

/// External services the controller drives
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub notifier: Arc<dyn NotificationScheduler>,
    pub feedback: Arc<dyn FeedbackEmitter>,
    pub health: Option<Arc<dyn HealthSync>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            notifier: Arc::new(LogNotifier),
            feedback: Arc::new(TerminalFeedback),
            health: None,
        }
    }
}

pub struct SessionController<R: Repository> {
    store: Store,
    repository: R,
    active: Option<Uuid>,
    rest_timer: RestTimer,
    pr_toast: PrToast,
    clock: Arc<dyn Clock>,
    health: Option<Arc<dyn HealthSync>>,
    pending_sync: Vec<JoinHandle<()>>,
    config: Config,
}

impl<R: Repository> SessionController<R> {
    /// Load the store, seed the catalog if empty and pick up any active session
    pub fn open(repository: R, collaborators: Collaborators, config: Config) -> Result<Self> {
        let mut store = repository.load()?;
        let seeded = crate::catalog::seed_store(&mut store);
        let active = store.active_session().map(|s| s.id);

        let rest_timer = RestTimer::new(
            collaborators.clock.clone(),
            collaborators.notifier,
            collaborators.feedback,
            config.rest_timer.clone(),
        );
        let pr_toast = PrToast::new(config.records.toast_duration());

        let mut controller = Self {
            store,
            repository,
            active,
            rest_timer,
            pr_toast,
            clock: collaborators.clock,
            health: collaborators.health,
            pending_sync: Vec::new(),
            config,
        };

        if let Some(id) = active {
            tracing::info!("Resuming active session {}", id);
        }
        if seeded > 0 {
            controller.persist();
        }
        Ok(controller)
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.and_then(|id| self.store.sessions.get(&id))
    }

    /// Exercises of the active session, by order
    pub fn active_exercises(&self) -> Vec<&LoggedExercise> {
        self.active
            .map(|id| self.store.exercises_in(id))
            .unwrap_or_default()
    }

    pub fn sets(&self, logged_exercise_id: Uuid) -> Vec<&ExerciseSet> {
        self.store.sets_in(logged_exercise_id)
    }

    pub fn definition(&self, id: &str) -> Option<&ExerciseDefinition> {
        self.store.definition(id)
    }

    /// Superset groups of the active session
    pub fn grouped_exercises(&self) -> Vec<Vec<LoggedExercise>> {
        grouping::group_exercises(&self.active_exercise_list())
    }

    pub fn rest_timer(&self) -> RestTimerSnapshot {
        self.rest_timer.snapshot()
    }

    /// Shared handle to the rest timer, for displays that poll it
    pub fn rest_timer_handle(&self) -> &RestTimer {
        &self.rest_timer
    }

    pub fn pr_toast(&self) -> PrToastSnapshot {
        self.pr_toast.snapshot()
    }

    pub fn records(&self, definition_id: &str) -> ExerciseRecords {
        records::all_time_records(&self.store, definition_id, None)
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Start an empty session; no-op while another is active
    pub fn start(&mut self) -> Option<Uuid> {
        if self.active.is_some() {
            tracing::warn!("A session is already active; not starting another");
            return None;
        }

        let session = Session::new(self.clock.now());
        let id = session.id;
        self.store.insert_session(session);
        self.active = Some(id);
        self.persist();

        tracing::info!("Started session {}", id);
        Some(id)
    }

    /// Start a session pre-populated from a template
    pub fn start_from_template(&mut self, template: &WorkoutTemplate) -> Option<Uuid> {
        if self.active.is_some() {
            tracing::warn!("A session is already active; not starting template '{}'", template.name);
            return None;
        }

        let now = self.clock.now();
        let session = Session::new(now);
        let session_id = session.id;
        self.store.insert_session(session);

        let mut created: Vec<LoggedExercise> = Vec::new();
        let mut planned_sets: Vec<ExerciseSet> = Vec::new();

        for template_exercise in template.sorted_exercises() {
            let Some(definition) = self.store.definition(&template_exercise.exercise_id).cloned()
            else {
                tracing::warn!(
                    "Template '{}' references unknown exercise '{}'; skipping",
                    template.name,
                    template_exercise.exercise_id
                );
                continue;
            };

            let mut exercise = LoggedExercise::new(session_id, definition.id.clone(), created.len());
            exercise.superset_group_id = template_exercise.superset_group_id;
            let last = self.store.last_finished_exercise(&definition.id).cloned();

            if definition.is_cardio {
                exercise.duration_seconds = template_exercise
                    .default_duration_seconds
                    .or(last.as_ref().and_then(|l| l.duration_seconds));
                exercise.distance_meters = template_exercise
                    .default_distance_meters
                    .or(last.as_ref().and_then(|l| l.distance_meters));
            } else {
                let last_performance = last.as_ref().and_then(|l| {
                    self.store
                        .sets_in(l.id)
                        .first()
                        .map(|s| LastPerformance::from(*s))
                });
                let plan = plan_sets(
                    template_exercise,
                    last_performance,
                    self.config.templates.warmup_ratio,
                );
                for (order, planned) in plan.into_iter().enumerate() {
                    planned_sets.push(
                        ExerciseSet::new(exercise.id, order)
                            .with_values(planned.weight, planned.reps)
                            .with_kind(planned.kind),
                    );
                }
            }

            self.touch_definition(&definition.id, now);
            created.push(exercise);
        }

        grouping::dissolve_singleton_groups(&mut created);
        for exercise in created {
            self.store.insert_exercise(exercise);
        }
        for set in planned_sets {
            self.store.insert_set(set);
        }

        self.active = Some(session_id);
        self.persist();

        tracing::info!("Started session {} from template '{}'", session_id, template.name);
        Some(session_id)
    }

    /// Finish the active session and return it
    ///
    /// Incomplete sets are dropped, then strength exercises left without a
    /// completed set. The session is kept even if nothing remains.
    pub fn finish_active(&mut self) -> Option<Session> {
        self.rest_timer.skip();
        let session_id = self.active?;

        let exercises: Vec<(Uuid, bool)> = self
            .store
            .exercises_in(session_id)
            .iter()
            .map(|e| (e.id, self.store.is_cardio(e)))
            .collect();

        for (exercise_id, is_cardio) in exercises {
            let incomplete: Vec<Uuid> = self
                .store
                .sets_in(exercise_id)
                .iter()
                .filter(|s| !s.is_completed)
                .map(|s| s.id)
                .collect();
            for set_id in incomplete {
                self.store.sets.remove(&set_id);
            }

            let has_completed = !self.store.sets_in(exercise_id).is_empty();
            if !has_completed && !is_cardio {
                tracing::debug!("Dropping exercise {} with no completed sets", exercise_id);
                self.store.delete_logged_exercise(exercise_id);
            } else {
                self.store.renumber_sets(exercise_id);
            }
        }

        self.store.renumber_exercises(session_id);
        let mut remaining = self.active_exercise_list();
        if !grouping::dissolve_singleton_groups(&mut remaining).is_empty() {
            self.write_back(remaining);
        }

        let now = self.clock.now();
        let session = self.store.sessions.get_mut(&session_id).map(|s| {
            s.ended_at = Some(now);
            s.clone()
        })?;
        self.active = None;
        self.persist();

        tracing::info!(
            "Finished session {} with {} exercises",
            session_id,
            self.store.exercises_in(session_id).len()
        );
        self.hand_off_to_health(session_id);
        Some(session)
    }

    /// Delete the active session and everything in it
    pub fn discard_active(&mut self) -> bool {
        self.rest_timer.skip();
        let Some(session_id) = self.active.take() else {
            return false;
        };
        self.store.delete_session(session_id);
        self.persist();
        tracing::info!("Discarded session {}", session_id);
        true
    }

    /// Wait for in-flight health sync hand-offs
    pub fn wait_for_sync(&mut self) {
        for handle in self.pending_sync.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Health sync worker panicked");
            }
        }
    }

    fn hand_off_to_health(&mut self, session_id: Uuid) {
        let Some(health) = self.health.clone() else {
            return;
        };
        let Some(summary) = self.store.session_summary(session_id) else {
            return;
        };
        self.pending_sync.retain(|h| !h.is_finished());
        self.pending_sync.push(std::thread::spawn(move || {
            if let Err(e) = health.save_session(&summary) {
                tracing::warn!("Health sync failed for session {}: {}", summary.session_id, e);
            }
        }));
    }

    // ========================================================================
    // Exercises
    // ========================================================================

    /// Append an exercise, pre-filled from its last finished session
    pub fn add_exercise(&mut self, definition_id: &str) -> Option<Uuid> {
        let session_id = self.active?;
        let Some(definition) = self.store.definition(definition_id).cloned() else {
            tracing::warn!("Unknown exercise '{}'", definition_id);
            return None;
        };

        let order = self.store.exercises_in(session_id).len();
        let mut exercise = LoggedExercise::new(session_id, definition.id.clone(), order);
        let last = self.store.last_finished_exercise(&definition.id).cloned();

        if definition.is_cardio {
            if let Some(last) = &last {
                exercise.duration_seconds = last.duration_seconds;
                exercise.distance_meters = last.distance_meters;
            }
        } else {
            let mut set = ExerciseSet::new(exercise.id, 0);
            if let Some(first) = last.as_ref().and_then(|l| self.store.sets_in(l.id).first().copied()) {
                set.weight = first.weight;
                set.reps = first.reps;
            }
            self.store.insert_set(set);
        }

        let id = exercise.id;
        self.store.insert_exercise(exercise);
        self.touch_definition(&definition.id, self.clock.now());
        self.persist();

        tracing::info!("Added {} to session {}", definition.name, session_id);
        Some(id)
    }

    /// Remove an exercise, leaving its superset group first
    pub fn remove_exercise(&mut self, logged_exercise_id: Uuid) -> bool {
        let Some(exercise) = self.active_exercise(logged_exercise_id).cloned() else {
            return false;
        };

        if exercise.is_in_superset() {
            let mut exercises = self.active_exercise_list();
            grouping::unlink(&mut exercises, exercise.id);
            self.write_back(exercises);
        }

        self.store.delete_logged_exercise(exercise.id);
        self.store.renumber_exercises(exercise.session_id);
        self.touch_definition(&exercise.definition_id, self.clock.now());
        self.persist();
        true
    }

    pub fn update_cardio(
        &mut self,
        logged_exercise_id: Uuid,
        duration_seconds: Option<u32>,
        distance_meters: Option<f64>,
    ) -> bool {
        if self.active_exercise(logged_exercise_id).is_none() {
            return false;
        }
        if let Some(exercise) = self.store.exercises.get_mut(&logged_exercise_id) {
            exercise.duration_seconds = duration_seconds;
            exercise.distance_meters = distance_meters.map(|d| d.max(0.0));
        }
        self.persist();
        true
    }

    /// Change an exercise's configured rest; `None` or zero disables the timer
    pub fn set_rest_seconds(&mut self, definition_id: &str, seconds: Option<u32>) -> bool {
        let Some(definition) = self.store.definitions.get_mut(&definition_id.to_string()) else {
            return false;
        };
        definition.default_rest_seconds = seconds;
        self.persist();
        true
    }

    /// Upsert custom definitions, keeping their last-used stamps
    pub fn import_definitions(&mut self, definitions: Vec<ExerciseDefinition>) -> usize {
        let count = definitions.len();
        for definition in definitions {
            self.store.upsert_definition(definition);
        }
        if count > 0 {
            self.persist();
        }
        count
    }

    // ========================================================================
    // Sets
    // ========================================================================

    /// Append a set copying the previous set of the same exercise
    pub fn add_set(&mut self, logged_exercise_id: Uuid) -> Option<Uuid> {
        self.active_exercise(logged_exercise_id)?;

        let sets = self.store.sets_in(logged_exercise_id);
        let mut set = ExerciseSet::new(logged_exercise_id, sets.len());
        if let Some(last) = sets.last() {
            set.weight = last.weight;
            set.reps = last.reps;
        }

        let id = set.id;
        self.store.insert_set(set);
        self.persist();
        Some(id)
    }

    pub fn delete_set(&mut self, set_id: Uuid, logged_exercise_id: Uuid) -> bool {
        match self.active_set(set_id) {
            Some((set, _)) if set.logged_exercise_id == logged_exercise_id => {}
            _ => return false,
        }
        self.store.delete_set(set_id);
        self.persist();
        true
    }

    /// Edit weight and/or reps, then carry them forward
    pub fn edit_set(&mut self, set_id: Uuid, weight: Option<f64>, reps: Option<u32>) -> bool {
        let Some(logged_exercise_id) = self.active_set(set_id).map(|(_, e)| e.id) else {
            return false;
        };
        if let Some(set) = self.store.sets.get_mut(&set_id) {
            if let Some(weight) = weight {
                set.weight = weight.max(0.0);
            }
            if let Some(reps) = reps {
                set.reps = reps;
            }
        }
        self.propagate_values(set_id, logged_exercise_id);
        true
    }

    /// Copy weight/reps to later, not-yet-completed sets of the same kind
    ///
    /// Returns how many sets were updated.
    pub fn propagate_values(&mut self, set_id: Uuid, logged_exercise_id: Uuid) -> usize {
        if self.active_exercise(logged_exercise_id).is_none() {
            return 0;
        }
        let sets: Vec<ExerciseSet> = self
            .store
            .sets_in(logged_exercise_id)
            .into_iter()
            .cloned()
            .collect();
        let Some(index) = sets.iter().position(|s| s.id == set_id) else {
            return 0;
        };
        let changed = &sets[index];

        let targets: Vec<Uuid> = sets[index + 1..]
            .iter()
            .filter(|s| !s.is_completed && s.kind == changed.kind)
            .map(|s| s.id)
            .collect();
        for id in &targets {
            if let Some(set) = self.store.sets.get_mut(id) {
                set.weight = changed.weight;
                set.reps = changed.reps;
            }
        }

        self.persist();
        targets.len()
    }

    /// Toggle completion, detecting records and starting rest on completion
    ///
    /// Returns the PR flags now stored on the set.
    pub fn complete_set(&mut self, set_id: Uuid) -> Option<PersonalRecordResult> {
        let (_, exercise) = self.active_set(set_id)?;
        let exercise = exercise.clone();
        let definition = self.store.definition(&exercise.definition_id).cloned()?;

        let set = self.store.sets.get_mut(&set_id)?;
        let was_completed = set.is_completed;
        set.is_completed = !was_completed;

        if was_completed {
            set.clear_pr();
            self.persist();
            return Some(PersonalRecordResult::none());
        }

        let completed = set.clone();
        let result = if completed.kind == SetKind::Normal && !definition.is_cardio {
            records::check_for_pr(&self.store, &completed, &definition)
        } else {
            PersonalRecordResult::none()
        };
        if let Some(set) = self.store.sets.get_mut(&set_id) {
            set.apply_pr(result);
        }

        if result.is_any() {
            tracing::info!(
                "New personal record on {}: {:?}",
                definition.name,
                result.kinds()
            );
            self.pr_toast.show(definition.name.clone(), result.kinds());
        }

        self.persist();
        self.trigger_rest_timer(&exercise, &definition);
        Some(result)
    }

    /// Start rest after a completed set
    ///
    /// Inside a superset only the last exercise of the group starts the
    /// timer, using the longest rest configured across the group.
    fn trigger_rest_timer(&self, exercise: &LoggedExercise, definition: &ExerciseDefinition) {
        if !exercise.is_in_superset() {
            if let Some(seconds) = definition.rest_seconds() {
                self.rest_timer.start(seconds, Some(definition.name.clone()));
            }
            return;
        }

        let exercises = self.active_exercise_list();
        let members = grouping::group_members(&exercises, exercise);
        if members.last().map(|m| m.id) != Some(exercise.id) {
            tracing::debug!("Not last in superset; rest timer waits");
            return;
        }

        let definitions: Vec<&ExerciseDefinition> = members
            .iter()
            .filter_map(|m| self.store.definition(&m.definition_id))
            .collect();
        let Some(seconds) = definitions.iter().filter_map(|d| d.rest_seconds()).max() else {
            return;
        };
        let label = definitions
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(" + ");
        self.rest_timer.start(seconds, Some(label));
    }

    /// Flip a set between working and warm-up
    pub fn toggle_set_type(&mut self, set_id: Uuid) -> Option<SetKind> {
        self.active_set(set_id)?;
        let set = self.store.sets.get_mut(&set_id)?;
        set.kind = set.kind.toggled();
        if set.kind == SetKind::Warmup {
            set.rpe = None;
            set.clear_pr();
        }
        let kind = set.kind;
        self.persist();
        Some(kind)
    }

    /// Record RPE on a working set, clamped to 1..=10
    pub fn set_rpe(&mut self, set_id: Uuid, rpe: Option<f64>) -> bool {
        if self.active_set(set_id).is_none() {
            return false;
        }
        let Some(set) = self.store.sets.get_mut(&set_id) else {
            return false;
        };
        if set.kind != SetKind::Normal {
            return false;
        }
        set.rpe = rpe.map(|r| r.clamp(1.0, 10.0));
        self.persist();
        true
    }

    // ========================================================================
    // Supersets
    // ========================================================================

    pub fn link_as_superset(&mut self, a: Uuid, b: Uuid) -> Option<Uuid> {
        if a == b {
            return None;
        }
        let mut exercises = self.active_exercise_list();
        let index_a = exercises.iter().position(|e| e.id == a)?;
        let index_b = exercises.iter().position(|e| e.id == b)?;

        let mut first = exercises[index_a].clone();
        let mut second = exercises[index_b].clone();
        let group_id = grouping::link_as_superset(&mut first, &mut second);
        exercises[index_a] = first;
        exercises[index_b] = second;
        grouping::dissolve_singleton_groups(&mut exercises);
        grouping::gather_group(&mut exercises, group_id);

        self.write_back(exercises);
        self.persist();
        tracing::info!("Linked superset {}", group_id);
        Some(group_id)
    }

    pub fn unlink_superset(&mut self, logged_exercise_id: Uuid) -> bool {
        let mut exercises = self.active_exercise_list();
        let group_id = exercises
            .iter()
            .find(|e| e.id == logged_exercise_id)
            .and_then(|e| e.superset_group_id);
        if grouping::unlink(&mut exercises, logged_exercise_id).is_empty() {
            return false;
        }
        // Leaving from the middle must not split what remains
        if let Some(group_id) = group_id {
            grouping::gather_group(&mut exercises, group_id);
        }
        self.write_back(exercises);
        self.persist();
        true
    }

    /// Move a whole group (or single exercise) in the grouped view
    pub fn move_exercise_group(&mut self, from: usize, to: usize) -> bool {
        let mut groups = self.grouped_exercises();
        if !grouping::move_group(&mut groups, from, to) {
            return false;
        }
        self.write_back(groups.into_iter().flatten().collect());
        self.persist();
        true
    }

    // ========================================================================
    // Rest timer and PR toast
    // ========================================================================

    pub fn start_rest_timer(&self, seconds: u32, label: Option<String>) {
        self.rest_timer.start(seconds, label);
    }

    pub fn adjust_rest_timer(&self, delta_seconds: i32) {
        self.rest_timer.adjust(delta_seconds);
    }

    pub fn skip_rest_timer(&self) {
        self.rest_timer.skip();
    }

    pub fn toggle_rest_timer_expanded(&self) {
        self.rest_timer.toggle_expanded();
    }

    pub fn dismiss_pr_toast(&self) {
        self.pr_toast.dismiss();
    }

    // ========================================================================
    // Records maintenance
    // ========================================================================

    /// Re-derive every stored PR flag from history
    pub fn backfill_pr_flags(&mut self) -> usize {
        let flagged = records::backfill_pr_flags(&mut self.store);
        self.persist();
        flagged
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn active_exercise(&self, logged_exercise_id: Uuid) -> Option<&LoggedExercise> {
        let session_id = self.active?;
        self.store
            .exercises
            .get(&logged_exercise_id)
            .filter(|e| e.session_id == session_id)
    }

    fn active_set(&self, set_id: Uuid) -> Option<(&ExerciseSet, &LoggedExercise)> {
        let set = self.store.sets.get(&set_id)?;
        let exercise = self.active_exercise(set.logged_exercise_id)?;
        Some((set, exercise))
    }

    fn active_exercise_list(&self) -> Vec<LoggedExercise> {
        self.active_exercises().into_iter().cloned().collect()
    }

    fn write_back(&mut self, exercises: Vec<LoggedExercise>) {
        for exercise in exercises {
            self.store.insert_exercise(exercise);
        }
    }

    fn touch_definition(&mut self, definition_id: &str, at: chrono::DateTime<chrono::Utc>) {
        if let Some(definition) = self.store.definitions.get_mut(&definition_id.to_string()) {
            definition.last_used_at = Some(at);
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.repository.save(&self.store) {
            tracing::warn!("Failed to save store (will retry on next change): {}", e);
        }
    }
}
