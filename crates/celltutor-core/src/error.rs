//! Error types for CellTutor Core
//!
//! Collaborator failures (text generation, rendering) are kept apart from
//! storage failures so callers can tell an unknown cell agent from a broken
//! provider. We use `thiserror` for the Display/Error plumbing.

use thiserror::Error;

/// Result type alias for CellTutor operations
pub type Result<T> = std::result::Result<T, TutorError>;

/// Main error type for CellTutor operations
#[derive(Error, Debug)]
pub enum TutorError {
    /// No manifest is registered under the given id
    #[error("Cell agent not found: {0}")]
    NotFound(String),

    /// The text generator failed to produce output
    #[error("Text generator failed: {0:#}")]
    Generator(#[source] anyhow::Error),

    /// The visual renderer failed to produce an artifact
    #[error("Visual renderer failed: {0:#}")]
    Renderer(#[source] anyhow::Error),

    /// SQLite errors from the registry
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or incomplete configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TutorError {
    /// True when the error signals an unknown cell agent id
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
