//! Error types for lineage analysis

use thiserror::Error;

/// Result type for lineage operations
pub type Result<T> = std::result::Result<T, LineageError>;

/// Lineage analysis errors
///
/// Only infrastructure faults live here. A copybook hint that matches nothing,
/// an unresolvable graph element or an empty session are normal outcomes and
/// are returned as data.
#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Chunk store failure for session {session}: {message}")]
    Store { session: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Recognizer pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
