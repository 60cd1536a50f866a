//! Core domain types for the lift session engine.
//!
//! This module defines the entities stored in the arena tables:
//! - Exercise definitions (the catalog)
//! - Sessions, logged exercises and sets
//! - Personal record results and all-time records
//! - Summaries handed to external collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Catalog Types
// ============================================================================

/// Primary muscle group an exercise trains
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Legs,
    Glutes,
    Core,
    FullBody,
    Cardio,
}

impl MuscleGroup {
    /// Parse a muscle group name, accepting a few common spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "chest" => Some(Self::Chest),
            "back" => Some(Self::Back),
            "shoulders" | "shoulder" => Some(Self::Shoulders),
            "biceps" => Some(Self::Biceps),
            "triceps" => Some(Self::Triceps),
            "legs" | "quads" | "hamstrings" => Some(Self::Legs),
            "glutes" => Some(Self::Glutes),
            "core" | "abs" => Some(Self::Core),
            "full_body" | "fullbody" => Some(Self::FullBody),
            "cardio" => Some(Self::Cardio),
            _ => None,
        }
    }
}

/// An exercise definition from the catalog (e.g., "Bench Press")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    pub muscle_group: MuscleGroup,
    pub is_cardio: bool,
    pub default_rest_seconds: Option<u32>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ExerciseDefinition {
    /// Configured rest duration, treating zero as "no rest timer"
    pub fn rest_seconds(&self) -> Option<u32> {
        self.default_rest_seconds.filter(|s| *s > 0)
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// One workout attempt. Active while `ended_at` is `None`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at,
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Elapsed seconds for a finished session
    pub fn duration_seconds(&self) -> Option<i64> {
        self.ended_at.map(|end| (end - self.started_at).num_seconds())
    }
}

/// One exercise instance within a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedExercise {
    pub id: Uuid,
    pub session_id: Uuid,
    pub definition_id: String,
    pub order: usize,
    pub duration_seconds: Option<u32>,
    pub distance_meters: Option<f64>,
    pub superset_group_id: Option<Uuid>,
}

impl LoggedExercise {
    pub fn new(session_id: Uuid, definition_id: impl Into<String>, order: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            definition_id: definition_id.into(),
            order,
            duration_seconds: None,
            distance_meters: None,
            superset_group_id: None,
        }
    }

    pub fn is_in_superset(&self) -> bool {
        self.superset_group_id.is_some()
    }
}

/// Kind of set: working sets count toward records, warm-ups never do
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SetKind {
    #[default]
    Normal,
    Warmup,
}

impl SetKind {
    pub fn toggled(self) -> Self {
        match self {
            SetKind::Normal => SetKind::Warmup,
            SetKind::Warmup => SetKind::Normal,
        }
    }
}

/// One performed unit (weight x reps) within a logged exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSet {
    pub id: Uuid,
    pub logged_exercise_id: Uuid,
    pub order: usize,
    pub weight: f64,
    pub reps: u32,
    pub is_completed: bool,
    #[serde(default)]
    pub kind: SetKind,
    pub rpe: Option<f64>,
    #[serde(default)]
    pub is_weight_pr: bool,
    #[serde(default)]
    pub is_estimated_1rm_pr: bool,
    #[serde(default)]
    pub is_volume_pr: bool,
}

impl ExerciseSet {
    pub fn new(logged_exercise_id: Uuid, order: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            logged_exercise_id,
            order,
            weight: 0.0,
            reps: 0,
            is_completed: false,
            kind: SetKind::Normal,
            rpe: None,
            is_weight_pr: false,
            is_estimated_1rm_pr: false,
            is_volume_pr: false,
        }
    }

    pub fn with_values(mut self, weight: f64, reps: u32) -> Self {
        self.weight = weight;
        self.reps = reps;
        self
    }

    pub fn with_kind(mut self, kind: SetKind) -> Self {
        self.kind = kind;
        self
    }

    /// Stamp the three PR flags from a ledger result
    pub fn apply_pr(&mut self, result: PersonalRecordResult) {
        self.is_weight_pr = result.is_weight_pr;
        self.is_estimated_1rm_pr = result.is_estimated_1rm_pr;
        self.is_volume_pr = result.is_volume_pr;
    }

    pub fn clear_pr(&mut self) {
        self.apply_pr(PersonalRecordResult::none());
    }

    pub fn pr_flags(&self) -> PersonalRecordResult {
        PersonalRecordResult {
            is_weight_pr: self.is_weight_pr,
            is_estimated_1rm_pr: self.is_estimated_1rm_pr,
            is_volume_pr: self.is_volume_pr,
        }
    }

    /// Completed working set with positive load, the only kind that can set records
    pub fn counts_toward_records(&self) -> bool {
        self.is_completed && self.kind == SetKind::Normal && self.weight > 0.0 && self.reps > 0
    }
}

// ============================================================================
// Personal Record Types
// ============================================================================

/// Metric a personal record was set on
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Weight,
    Estimated1Rm,
    Volume,
}

/// Outcome of a personal record comparison for one set
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonalRecordResult {
    pub is_weight_pr: bool,
    pub is_estimated_1rm_pr: bool,
    pub is_volume_pr: bool,
}

impl PersonalRecordResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_any(&self) -> bool {
        self.is_weight_pr || self.is_estimated_1rm_pr || self.is_volume_pr
    }

    pub fn kinds(&self) -> Vec<RecordKind> {
        let mut kinds = Vec::new();
        if self.is_weight_pr {
            kinds.push(RecordKind::Weight);
        }
        if self.is_estimated_1rm_pr {
            kinds.push(RecordKind::Estimated1Rm);
        }
        if self.is_volume_pr {
            kinds.push(RecordKind::Volume);
        }
        kinds
    }
}

/// Best-ever values for one exercise definition, each with the session date achieving it
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseRecords {
    pub best_weight: f64,
    pub best_weight_date: Option<DateTime<Utc>>,
    pub best_estimated_1rm: f64,
    pub best_estimated_1rm_date: Option<DateTime<Utc>>,
    pub best_volume: f64,
    pub best_volume_date: Option<DateTime<Utc>>,
}

// ============================================================================
// Collaborator Payloads
// ============================================================================

/// Summary of a finished session handed to health sync
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub exercise_count: usize,
    pub completed_sets: usize,
    pub total_volume: f64,
}

/// A local notification request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}
