//! Error types for the lift_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
///
/// Session mutations never return these; they surface only at loading
/// boundaries and from collaborators, where the controller logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store could not be written or read back
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Catalog import error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Template could not be used
    #[error("Template error: {0}")]
    Template(String),

    /// Notification scheduling failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Health sync failed
    #[error("Sync error: {0}")]
    Sync(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
