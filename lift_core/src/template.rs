//! Workout templates consumed when starting a session.
//!
//! Templates are authored elsewhere; this module only loads them and works
//! out the default weight/reps for each set a template asks for.

use crate::{Error, ExerciseSet, Result, SetKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<TemplateExercise>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    pub exercise_id: String,
    #[serde(default)]
    pub order: usize,
    #[serde(default = "default_set_count")]
    pub set_count: usize,
    #[serde(default)]
    pub warmup_set_count: usize,
    #[serde(default)]
    pub default_weight: f64,
    #[serde(default)]
    pub default_reps: u32,
    pub default_duration_seconds: Option<u32>,
    pub default_distance_meters: Option<f64>,
    pub superset_group_id: Option<Uuid>,
    /// Explicit per-set values; when present they replace the counts above
    #[serde(default)]
    pub sets: Vec<TemplateSet>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateSet {
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub kind: SetKind,
}

fn default_set_count() -> usize {
    3
}

impl WorkoutTemplate {
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let template: WorkoutTemplate = toml::from_str(&contents)?;
        if template.exercises.is_empty() {
            return Err(Error::Template(format!(
                "template '{}' has no exercises",
                template.name
            )));
        }
        tracing::info!("Loaded template '{}' from {:?}", template.name, path);
        Ok(template)
    }

    /// Exercises by template order
    pub fn sorted_exercises(&self) -> Vec<&TemplateExercise> {
        let mut exercises: Vec<&TemplateExercise> = self.exercises.iter().collect();
        exercises.sort_by_key(|e| e.order);
        exercises
    }
}

/// Weight/reps a set falls back to when the template leaves them open
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LastPerformance {
    pub weight: f64,
    pub reps: u32,
}

impl From<&ExerciseSet> for LastPerformance {
    fn from(set: &ExerciseSet) -> Self {
        Self {
            weight: set.weight,
            reps: set.reps,
        }
    }
}

/// Resolved values for one set of a strength exercise
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedSet {
    pub kind: SetKind,
    pub weight: f64,
    pub reps: u32,
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        fallback
    }
}

fn nonzero_or(value: u32, fallback: u32) -> u32 {
    if value > 0 {
        value
    } else {
        fallback
    }
}

/// Resolve the sets a strength template exercise starts with
///
/// Precedence per value: explicit per-set template values, then a warm-up
/// weight derived from the working weight (`warmup_ratio`, rounded), then
/// the last session's first set.
pub fn plan_sets(
    exercise: &TemplateExercise,
    last: Option<LastPerformance>,
    warmup_ratio: f64,
) -> Vec<PlannedSet> {
    let last = last.unwrap_or_default();
    let working_weight = positive_or(exercise.default_weight, last.weight);
    let working_reps = nonzero_or(exercise.default_reps, last.reps);
    let warmup_weight = (working_weight * warmup_ratio).round();

    let fallback_weight = |kind: SetKind| match kind {
        SetKind::Normal => working_weight,
        SetKind::Warmup => warmup_weight,
    };

    if !exercise.sets.is_empty() {
        return exercise
            .sets
            .iter()
            .map(|set| PlannedSet {
                kind: set.kind,
                weight: positive_or(set.weight, fallback_weight(set.kind)),
                reps: nonzero_or(set.reps, working_reps),
            })
            .collect();
    }

    let warmups = (0..exercise.warmup_set_count).map(|_| PlannedSet {
        kind: SetKind::Warmup,
        weight: warmup_weight,
        reps: working_reps,
    });
    let working = (0..exercise.set_count).map(|_| PlannedSet {
        kind: SetKind::Normal,
        weight: working_weight,
        reps: working_reps,
    });
    warmups.chain(working).collect()
}
