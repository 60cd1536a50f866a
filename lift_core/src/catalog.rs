//! Exercise catalog.
//!
//! Provides the built-in exercise definitions seeded into an empty store,
//! and CSV import of custom exercises.

use crate::{Error, ExerciseDefinition, MuscleGroup, Result, Store};
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;

/// Cached default catalog - built once and reused
static DEFAULT_CATALOG: Lazy<Vec<ExerciseDefinition>> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn default_catalog() -> &'static [ExerciseDefinition] {
    &DEFAULT_CATALOG
}

fn strength(id: &str, name: &str, group: MuscleGroup, rest: u32) -> ExerciseDefinition {
    ExerciseDefinition {
        id: id.into(),
        name: name.into(),
        muscle_group: group,
        is_cardio: false,
        default_rest_seconds: Some(rest),
        last_used_at: None,
    }
}

fn cardio(id: &str, name: &str) -> ExerciseDefinition {
    ExerciseDefinition {
        id: id.into(),
        name: name.into(),
        muscle_group: MuscleGroup::Cardio,
        is_cardio: true,
        default_rest_seconds: None,
        last_used_at: None,
    }
}

/// Builds the built-in exercise definitions
pub fn build_default_catalog() -> Vec<ExerciseDefinition> {
    vec![
        strength("bench_press", "Bench Press", MuscleGroup::Chest, 120),
        strength("incline_dumbbell_press", "Incline Dumbbell Press", MuscleGroup::Chest, 90),
        strength("overhead_press", "Overhead Press", MuscleGroup::Shoulders, 120),
        strength("lateral_raise", "Lateral Raise", MuscleGroup::Shoulders, 60),
        strength("barbell_row", "Barbell Row", MuscleGroup::Back, 120),
        strength("pull_up", "Pull-up", MuscleGroup::Back, 90),
        strength("lat_pulldown", "Lat Pulldown", MuscleGroup::Back, 90),
        strength("barbell_curl", "Barbell Curl", MuscleGroup::Biceps, 60),
        strength("triceps_pushdown", "Triceps Pushdown", MuscleGroup::Triceps, 60),
        strength("back_squat", "Back Squat", MuscleGroup::Legs, 180),
        strength("romanian_deadlift", "Romanian Deadlift", MuscleGroup::Legs, 120),
        strength("deadlift", "Deadlift", MuscleGroup::Back, 180),
        strength("hip_thrust", "Hip Thrust", MuscleGroup::Glutes, 90),
        strength("plank", "Plank", MuscleGroup::Core, 60),
        cardio("treadmill_run", "Treadmill Run"),
        cardio("rowing_machine", "Rowing Machine"),
        cardio("stationary_bike", "Stationary Bike"),
    ]
}

/// Seed the default catalog into a store that has no definitions yet
///
/// Returns the number of definitions inserted.
pub fn seed_store(store: &mut Store) -> usize {
    if !store.definitions.is_empty() {
        return 0;
    }
    for definition in default_catalog() {
        store.upsert_definition(definition.clone());
    }
    tracing::info!("Seeded {} default exercises", store.definitions.len());
    store.definitions.len()
}

/// CSV row format for custom exercises
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    name: String,
    muscle_group: String,
    #[serde(default)]
    is_cardio: bool,
    default_rest_seconds: Option<u32>,
}

impl TryFrom<CsvRow> for ExerciseDefinition {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = row.id.trim().to_string();
        if id.is_empty() {
            return Err(Error::Catalog("exercise id must not be empty".into()));
        }
        let muscle_group = MuscleGroup::parse(&row.muscle_group).ok_or_else(|| {
            Error::Catalog(format!("Unknown muscle group: {}", row.muscle_group))
        })?;

        Ok(ExerciseDefinition {
            id,
            name: row.name.trim().to_string(),
            muscle_group,
            is_cardio: row.is_cardio,
            default_rest_seconds: row.default_rest_seconds,
            last_used_at: None,
        })
    }
}

/// Load custom exercise definitions from a CSV file
///
/// Expected headers: `id,name,muscle_group,is_cardio,default_rest_seconds`.
/// Rows that fail to parse are logged and skipped.
pub fn import_catalog_csv(path: &Path) -> Result<Vec<ExerciseDefinition>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut definitions = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match ExerciseDefinition::try_from(row) {
                Ok(definition) => definitions.push(definition),
                Err(e) => {
                    tracing::warn!("Failed to parse exercise row: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize exercise row: {}", e);
            }
        }
    }

    tracing::info!("Imported {} exercises from {:?}", definitions.len(), path);
    Ok(definitions)
}
