#![forbid(unsafe_code)]

//! Core domain model and business logic for the lift workout logger.
//!
//! This crate provides:
//! - Domain types (definitions, sessions, logged exercises, sets)
//! - The arena store and its persistence
//! - Superset grouping and personal-record detection
//! - The rest timer and PR toast
//! - The session controller tying them together

pub mod types;
pub mod error;
pub mod clock;
pub mod config;
pub mod logging;
pub mod store;
pub mod repository;
pub mod catalog;
pub mod template;
pub mod grouping;
pub mod records;
pub mod task;
pub mod rest_timer;
pub mod toast;
pub mod collaborators;
pub mod session;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use store::{Store, Table};
pub use repository::{JsonFileRepository, MemoryRepository, Repository};
pub use catalog::{build_default_catalog, import_catalog_csv};
pub use template::WorkoutTemplate;
pub use rest_timer::{RestPhase, RestTimer, RestTimerSnapshot};
pub use toast::{PrToast, PrToastSnapshot};
pub use collaborators::{FeedbackEmitter, HealthSync, JsonlHealthSync, NotificationScheduler};
pub use session::{Collaborators, SessionController};
