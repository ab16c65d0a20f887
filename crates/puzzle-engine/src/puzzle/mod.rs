//! Puzzle data model and ingestion from the record shapes the host supplies

pub mod ingest;

use serde::{Deserialize, Serialize};

/// Where a puzzle came from. Only ingestion cares; the line engine never looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Built from the player's own games; the position is already the player's turn
    Generated,
    /// Taken from a rated puzzle pool; the first ply is the opponent's move
    Pool,
}

/// A puzzle in canonical form. Immutable once ingested; traversal state lives in
/// [`crate::line::LineMachine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Puzzle {
    /// Puzzle identifier
    pub id: String,
    pub provenance: Provenance,
    /// Normalized FEN before any line move
    pub initial_position: String,
    /// Coordinate tokens: [setup?, solver_1, reply_1, solver_2, ...]
    pub line: Vec<String>,
    /// Index of the first move the player makes
    pub start_line_index: usize,
    /// Raw solution text as stored, shown when the line can't be replayed
    pub solution: Option<String>,
    pub rating: Option<u32>,
    pub themes: Vec<String>,
    pub hint: Option<String>,
    pub explanation: Option<String>,
}
