use clap::{Parser, Subcommand};
use lift_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type Controller = SessionController<JsonFileRepository>;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Strength workout session logger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session
    Start {
        /// Pre-populate the session from a TOML template
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Show the active session
    Show,

    /// Finish the active session, dropping unfinished work
    Finish,

    /// Throw away the active session
    Discard,

    /// Add an exercise to the active session
    Add { exercise_id: String },

    /// Remove exercise N from the active session
    Remove { exercise: usize },

    /// Work with the sets of an exercise
    #[command(subcommand)]
    Set(SetCommand),

    /// Put exercises A and B in the same superset
    Link { a: usize, b: usize },

    /// Take exercise N out of its superset
    Unlink { exercise: usize },

    /// Move group FROM to position TO (as numbered by `show`)
    Move { from: usize, to: usize },

    /// Show all-time records for an exercise
    Records { exercise_id: String },

    /// Recompute PR flags across all finished sessions
    Backfill,

    /// Run a rest timer in the foreground
    Rest { seconds: u32 },

    /// List the exercise catalog
    Exercises,

    /// Import custom exercises from CSV
    ImportExercises { file: PathBuf },

    /// Set the rest duration for an exercise (0 disables the timer)
    RestTime { exercise_id: String, seconds: u32 },
}

#[derive(Subcommand)]
enum SetCommand {
    /// Append a set to exercise N
    Add { exercise: usize },

    /// Change weight and/or reps of set S
    Edit {
        exercise: usize,
        set: usize,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        reps: Option<u32>,
    },

    /// Delete set S
    Delete { exercise: usize, set: usize },

    /// Toggle completion of set S
    Done {
        exercise: usize,
        set: usize,
        /// Stay in the foreground until the rest timer ends
        #[arg(long)]
        wait: bool,
    },

    /// Toggle set S between working and warm-up
    Kind { exercise: usize, set: usize },

    /// Record RPE for set S
    Rpe { exercise: usize, set: usize, value: f64 },
}

fn main() -> Result<()> {
    lift_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    std::fs::create_dir_all(&data_dir)?;
    tracing::debug!("Using data directory {:?}", data_dir);

    let mut controller = open_controller(&data_dir, &config)?;

    let result = match cli.command {
        Commands::Start { template } => cmd_start(&mut controller, template.as_deref()),
        Commands::Show => cmd_show(&controller),
        Commands::Finish => cmd_finish(&mut controller),
        Commands::Discard => cmd_discard(&mut controller),
        Commands::Add { exercise_id } => cmd_add(&mut controller, &exercise_id),
        Commands::Remove { exercise } => {
            let id = exercise_at(&controller, exercise)?;
            controller.remove_exercise(id);
            cmd_show(&controller)
        }
        Commands::Set(command) => cmd_set(&mut controller, command),
        Commands::Link { a, b } => {
            let a = exercise_at(&controller, a)?;
            let b = exercise_at(&controller, b)?;
            if controller.link_as_superset(a, b).is_none() {
                return Err(Error::Other("Cannot link an exercise with itself".into()));
            }
            cmd_show(&controller)
        }
        Commands::Unlink { exercise } => {
            let id = exercise_at(&controller, exercise)?;
            if !controller.unlink_superset(id) {
                println!("Exercise {} is not in a superset.", exercise);
            }
            cmd_show(&controller)
        }
        Commands::Move { from, to } => {
            require_active(&controller)?;
            if from == 0 || to == 0 || !controller.move_exercise_group(from - 1, to - 1) {
                return Err(Error::Other(format!("Cannot move group {} to {}", from, to)));
            }
            cmd_show(&controller)
        }
        Commands::Records { exercise_id } => cmd_records(&controller, &exercise_id),
        Commands::Backfill => {
            let flagged = controller.backfill_pr_flags();
            println!("✓ Recomputed PR flags: {} sets hold a record", flagged);
            Ok(())
        }
        Commands::Rest { seconds } => {
            controller.start_rest_timer(seconds, None);
            wait_for_rest(&controller)
        }
        Commands::Exercises => cmd_exercises(&controller),
        Commands::ImportExercises { file } => {
            let definitions = import_catalog_csv(&file)?;
            let count = controller.import_definitions(definitions);
            println!("✓ Imported {} exercises", count);
            Ok(())
        }
        Commands::RestTime {
            exercise_id,
            seconds,
        } => {
            let seconds = (seconds > 0).then_some(seconds);
            if !controller.set_rest_seconds(&exercise_id, seconds) {
                return Err(Error::Other(format!("Unknown exercise: {}", exercise_id)));
            }
            match seconds {
                Some(s) => println!("✓ Rest for {} set to {}s", exercise_id, s),
                None => println!("✓ Rest timer disabled for {}", exercise_id),
            }
            Ok(())
        }
    };

    controller.wait_for_sync();
    result
}

fn open_controller(data_dir: &Path, config: &Config) -> Result<Controller> {
    let repository = JsonFileRepository::new(data_dir.join("store.json"));

    let mut collaborators = Collaborators::default();
    if config.health.enabled {
        let path = config.health_export_path(data_dir);
        collaborators.health = Some(Arc::new(JsonlHealthSync::new(path)));
    }

    SessionController::open(repository, collaborators, config.clone())
}

fn require_active(controller: &Controller) -> Result<&Session> {
    controller
        .active_session()
        .ok_or_else(|| Error::Other("No active session. Run `lift start` first.".into()))
}

/// Resolve a 1-based exercise position in the active session
fn exercise_at(controller: &Controller, position: usize) -> Result<Uuid> {
    require_active(controller)?;
    position
        .checked_sub(1)
        .and_then(|index| controller.active_exercises().get(index).map(|e| e.id))
        .ok_or_else(|| Error::Other(format!("No exercise {} in this session", position)))
}

/// Resolve a 1-based set position inside an exercise
fn set_at(controller: &Controller, exercise: usize, position: usize) -> Result<(Uuid, Uuid)> {
    let exercise_id = exercise_at(controller, exercise)?;
    position
        .checked_sub(1)
        .and_then(|index| controller.sets(exercise_id).get(index).map(|s| s.id))
        .map(|set_id| (exercise_id, set_id))
        .ok_or_else(|| Error::Other(format!("No set {} on exercise {}", position, exercise)))
}

fn cmd_start(controller: &mut Controller, template: Option<&Path>) -> Result<()> {
    let started = match template {
        Some(path) => {
            let template = WorkoutTemplate::load_from(path)?;
            controller.start_from_template(&template)
        }
        None => controller.start(),
    };

    if started.is_none() {
        return Err(Error::Other(
            "A session is already active. Finish or discard it first.".into(),
        ));
    }
    println!("✓ Session started");
    cmd_show(controller)
}

fn cmd_add(controller: &mut Controller, exercise_id: &str) -> Result<()> {
    require_active(controller)?;
    if controller.add_exercise(exercise_id).is_none() {
        return Err(Error::Other(format!(
            "Unknown exercise: {}. See `lift exercises`.",
            exercise_id
        )));
    }
    cmd_show(controller)
}

fn cmd_set(controller: &mut Controller, command: SetCommand) -> Result<()> {
    match command {
        SetCommand::Add { exercise } => {
            let id = exercise_at(controller, exercise)?;
            controller.add_set(id);
        }
        SetCommand::Edit {
            exercise,
            set,
            weight,
            reps,
        } => {
            let (_, set_id) = set_at(controller, exercise, set)?;
            controller.edit_set(set_id, weight, reps);
        }
        SetCommand::Delete { exercise, set } => {
            let (exercise_id, set_id) = set_at(controller, exercise, set)?;
            controller.delete_set(set_id, exercise_id);
        }
        SetCommand::Done {
            exercise,
            set,
            wait,
        } => {
            let (_, set_id) = set_at(controller, exercise, set)?;
            controller.complete_set(set_id);
            cmd_show(controller)?;
            print_pr_toast(controller);
            print_rest_timer(controller);
            if wait {
                wait_for_rest(controller)?;
            }
            return Ok(());
        }
        SetCommand::Kind { exercise, set } => {
            let (_, set_id) = set_at(controller, exercise, set)?;
            controller.toggle_set_type(set_id);
        }
        SetCommand::Rpe {
            exercise,
            set,
            value,
        } => {
            let (_, set_id) = set_at(controller, exercise, set)?;
            if !controller.set_rpe(set_id, Some(value)) {
                return Err(Error::Other("RPE can only be set on working sets".into()));
            }
        }
    }
    cmd_show(controller)
}

fn cmd_finish(controller: &mut Controller) -> Result<()> {
    require_active(controller)?;
    let Some(session) = controller.finish_active() else {
        return Err(Error::Other("Failed to finish session".into()));
    };

    let summary = controller.store().session_summary(session.id);
    println!("✓ Session finished");
    if let Some(summary) = summary {
        println!("  Exercises: {}", summary.exercise_count);
        println!("  Completed sets: {}", summary.completed_sets);
        println!("  Volume: {}", summary.total_volume);
    }
    if let Some(minutes) = session.duration_seconds().map(|s| s / 60) {
        println!("  Duration: {} min", minutes);
    }
    Ok(())
}

fn cmd_discard(controller: &mut Controller) -> Result<()> {
    if !controller.discard_active() {
        return Err(Error::Other("No active session to discard".into()));
    }
    println!("✓ Session discarded");
    Ok(())
}

fn cmd_show(controller: &Controller) -> Result<()> {
    let session = require_active(controller)?;
    println!(
        "\nSession started {}",
        session
            .started_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
    );

    let mut position = 0;
    for (group_index, group) in controller.grouped_exercises().iter().enumerate() {
        if group.len() > 1 {
            println!("  [group {}] superset", group_index + 1);
        } else {
            println!("  [group {}]", group_index + 1);
        }

        for exercise in group {
            position += 1;
            let name = controller
                .definition(&exercise.definition_id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| exercise.definition_id.clone());
            println!("  {}. {}", position, name);

            if controller.store().is_cardio(exercise) {
                println!("       {}", format_cardio(exercise));
                continue;
            }
            for set in controller.sets(exercise.id) {
                println!("       {}. {}", set.order + 1, format_set(set));
            }
        }
    }

    println!();
    Ok(())
}

fn format_set(set: &ExerciseSet) -> String {
    let mut line = format!("{} x {}", set.weight, set.reps);
    if set.kind == SetKind::Warmup {
        line.push_str(" (warm-up)");
    }
    if let Some(rpe) = set.rpe {
        line.push_str(&format!(" @{}", rpe));
    }
    if set.is_completed {
        line.push_str(" ✓");
    }
    let kinds = set.pr_flags().kinds();
    if !kinds.is_empty() {
        line.push_str(&format!(" [PR: {}]", format_kinds(&kinds)));
    }
    line
}

fn format_cardio(exercise: &LoggedExercise) -> String {
    let duration = exercise
        .duration_seconds
        .map(|s| format!("{}:{:02}", s / 60, s % 60))
        .unwrap_or_else(|| "--:--".into());
    let distance = exercise
        .distance_meters
        .map(|m| format!("{} m", m))
        .unwrap_or_else(|| "-- m".into());
    format!("{}  {}", duration, distance)
}

fn format_kinds(kinds: &[RecordKind]) -> String {
    kinds
        .iter()
        .map(|k| match k {
            RecordKind::Weight => "weight",
            RecordKind::Estimated1Rm => "e1RM",
            RecordKind::Volume => "volume",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_pr_toast(controller: &Controller) {
    let toast = controller.pr_toast();
    if !toast.visible {
        return;
    }
    println!(
        "★ New PR on {}: {}",
        toast.exercise_name.unwrap_or_default(),
        format_kinds(&toast.kinds)
    );
}

fn print_rest_timer(controller: &Controller) {
    let timer = controller.rest_timer();
    if !timer.is_active() {
        return;
    }
    match &timer.label {
        Some(label) => println!("Rest {} ({})", timer.display_text(), label),
        None => println!("Rest {}", timer.display_text()),
    }
}

/// Show the countdown until the timer returns to idle
fn wait_for_rest(controller: &Controller) -> Result<()> {
    let timer = controller.rest_timer_handle();
    let mut stdout = io::stdout();
    let mut announced = false;

    loop {
        let snapshot = timer.snapshot();
        match snapshot.phase {
            RestPhase::Idle => break,
            RestPhase::Running => {
                write!(stdout, "\rRest {}   ", snapshot.display_text())?;
            }
            RestPhase::Completed if !announced => {
                write!(stdout, "\rRest complete!   ")?;
                announced = true;
            }
            RestPhase::Completed => {}
        }
        stdout.flush()?;
        std::thread::sleep(Duration::from_millis(250));
    }

    writeln!(stdout)?;
    Ok(())
}

fn cmd_records(controller: &Controller, exercise_id: &str) -> Result<()> {
    let Some(definition) = controller.definition(exercise_id) else {
        return Err(Error::Other(format!("Unknown exercise: {}", exercise_id)));
    };
    let records = controller.records(exercise_id);

    let date = |d: Option<chrono::DateTime<chrono::Utc>>| {
        d.map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".into())
    };

    println!("{}", definition.name);
    println!(
        "  Best weight: {} ({})",
        records.best_weight,
        date(records.best_weight_date)
    );
    println!(
        "  Best e1RM:   {:.1} ({})",
        records.best_estimated_1rm,
        date(records.best_estimated_1rm_date)
    );
    println!(
        "  Best volume: {} ({})",
        records.best_volume,
        date(records.best_volume_date)
    );
    Ok(())
}

fn cmd_exercises(controller: &Controller) -> Result<()> {
    let mut definitions: Vec<&ExerciseDefinition> =
        controller.store().definitions.values().collect();
    definitions.sort_by(|a, b| a.name.cmp(&b.name));

    for definition in definitions {
        let rest = definition
            .rest_seconds()
            .map(|s| format!("{}s rest", s))
            .unwrap_or_else(|| "no rest".into());
        println!(
            "  {:<24} {:<24} {:?}, {}",
            definition.id, definition.name, definition.muscle_group, rest
        );
    }
    Ok(())
}
