//! Engine error types

use thiserror::Error;

/// Conditions the host must be able to observe. Gameplay outcomes such as a wrong
/// move are not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Puzzle #{index} has no id")]
    MissingId { index: usize },

    #[error("Puzzle {puzzle_id} has no starting position")]
    MissingPosition { puzzle_id: String },

    #[error("Puzzle {puzzle_id} has an invalid starting position: {reason}")]
    InvalidPosition { puzzle_id: String, reason: String },

    #[error("Puzzle {puzzle_id} has neither a playable line nor a solution move")]
    UnparseableLine { puzzle_id: String },

    /// Raised at ingestion, and at play time if the line stops matching the board
    #[error("Puzzle {puzzle_id}: line token {index} ('{token}') is not playable")]
    IllegalLine {
        puzzle_id: String,
        index: usize,
        token: String,
    },

    #[error("Puzzle {puzzle_id}: start index {start} is outside a line of {len} moves")]
    InvalidStart {
        puzzle_id: String,
        start: usize,
        len: usize,
    },

    #[error("No puzzles available for category '{category}'")]
    PoolExhausted { category: String },
}

impl EngineError {
    /// The puzzle this error is about, when there is one.
    pub fn puzzle_id(&self) -> Option<&str> {
        match self {
            Self::MissingPosition { puzzle_id }
            | Self::InvalidPosition { puzzle_id, .. }
            | Self::UnparseableLine { puzzle_id }
            | Self::IllegalLine { puzzle_id, .. }
            | Self::InvalidStart { puzzle_id, .. } => Some(puzzle_id),
            Self::Config(_) | Self::MissingId { .. } | Self::PoolExhausted { .. } => None,
        }
    }

    /// Data-integrity problems, as opposed to configuration or pool exhaustion.
    pub fn is_integrity(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::PoolExhausted { .. })
    }
}
