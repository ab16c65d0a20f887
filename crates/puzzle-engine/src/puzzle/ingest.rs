//! Turn generated and pool-sourced records into canonical [`Puzzle`]s.
//!
//! Every record is checked against the rules oracle here, so anything that reaches
//! the line engine has a readable position and a line that replays legally.

use std::collections::HashSet;

use chess_core::codec::CoordMove;
use chess_core::{MoveSpec, RulesOracle};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Provenance, Puzzle};
use crate::error::EngineError;

/// Tokens stored either as a JSON array or as one space-separated string
/// (the Lichess CSV export uses the latter for both moves and themes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenList {
    List(Vec<String>),
    Text(String),
}

impl Default for TokenList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TokenList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Self::Text(text) => text
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

impl From<Vec<&str>> for TokenList {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(String::from).collect())
    }
}

/// A puzzle as served by a rated pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    #[serde(default, alias = "PuzzleId", alias = "puzzle_id")]
    pub id: Option<String>,
    #[serde(default, alias = "fen", alias = "FEN")]
    pub start_position: Option<String>,
    #[serde(default, alias = "moves", alias = "Moves")]
    pub line_tokens: TokenList,
    #[serde(default)]
    pub solution_move: Option<String>,
    #[serde(default, alias = "Rating")]
    pub rating: Option<u32>,
    #[serde(default, alias = "Themes")]
    pub themes: TokenList,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    /// Overrides the default of auto-playing the first ply
    #[serde(default)]
    pub start_line_index: Option<usize>,
}

/// A puzzle built from one of the player's own games.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "fen")]
    pub position: Option<String>,
    /// Best move in coordinate or algebraic form
    #[serde(default)]
    pub solution: Option<String>,
    /// Moves after the solution, alternating opponent/player
    #[serde(default)]
    pub continuation: TokenList,
    #[serde(default)]
    pub rating: Option<u32>,
    #[serde(default)]
    pub themes: TokenList,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PuzzleSource {
    Generated(GeneratedRecord),
    Pool(PoolRecord),
}

impl From<PoolRecord> for PuzzleSource {
    fn from(record: PoolRecord) -> Self {
        Self::Pool(record)
    }
}

impl From<GeneratedRecord> for PuzzleSource {
    fn from(record: GeneratedRecord) -> Self {
        Self::Generated(record)
    }
}

/// Fields common to both record shapes once the id and position are known.
struct Draft {
    id: String,
    provenance: Provenance,
    initial_position: String,
    tokens: Vec<String>,
    solution: Option<String>,
    explicit_start: Option<usize>,
    rating: Option<u32>,
    themes: Vec<String>,
    hint: Option<String>,
    explanation: Option<String>,
}

/// Ingest one record. `index` identifies records that lack an id.
pub fn ingest(
    index: usize,
    source: &PuzzleSource,
    oracle: &dyn RulesOracle,
) -> Result<Puzzle, EngineError> {
    match source {
        PuzzleSource::Pool(record) => {
            let id = require_id(index, record.id.as_deref())?;
            let initial_position = require_position(&id, record.start_position.as_deref(), oracle)?;
            finish(
                Draft {
                    id,
                    provenance: Provenance::Pool,
                    initial_position,
                    tokens: record.line_tokens.to_vec(),
                    solution: clean(record.solution_move.as_deref()),
                    explicit_start: record.start_line_index,
                    rating: record.rating,
                    themes: record.themes.to_vec(),
                    hint: clean(record.hint.as_deref()),
                    explanation: clean(record.explanation.as_deref()),
                },
                oracle,
            )
        }
        PuzzleSource::Generated(record) => {
            let id = require_id(index, record.id.as_deref())?;
            let initial_position = require_position(&id, record.position.as_deref(), oracle)?;
            let solution = clean(record.solution.as_deref());

            // The best move may be algebraic; the line needs coordinates.
            let tokens = match solution.as_deref().and_then(MoveSpec::parse) {
                Some(spec) => match oracle.legal_move(&initial_position, &spec) {
                    Ok(first) => std::iter::once(first.coord.to_string())
                        .chain(record.continuation.to_vec())
                        .collect(),
                    Err(e) => {
                        debug!(puzzle_id = %id, error = %e, "Generated solution is not playable");
                        return Err(EngineError::UnparseableLine { puzzle_id: id });
                    }
                },
                None => record.continuation.to_vec(),
            };

            finish(
                Draft {
                    id,
                    provenance: Provenance::Generated,
                    initial_position,
                    tokens,
                    solution,
                    explicit_start: Some(0),
                    rating: record.rating,
                    themes: record.themes.to_vec(),
                    hint: clean(record.hint.as_deref()),
                    explanation: clean(record.explanation.as_deref()),
                },
                oracle,
            )
        }
    }
}

/// Ingest a whole pool. Bad records are returned alongside the good ones so the
/// host can report them; later duplicates of an id are dropped.
pub fn ingest_all(
    sources: &[PuzzleSource],
    oracle: &dyn RulesOracle,
) -> (Vec<Puzzle>, Vec<EngineError>) {
    let mut puzzles = Vec::with_capacity(sources.len());
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();

    for (index, source) in sources.iter().enumerate() {
        match ingest(index, source, oracle) {
            Ok(puzzle) => {
                if seen.insert(puzzle.id.clone()) {
                    puzzles.push(puzzle);
                } else {
                    warn!(puzzle_id = %puzzle.id, "Duplicate puzzle id, keeping the first");
                }
            }
            Err(e) => {
                warn!(error = %e, "Rejected puzzle record");
                rejected.push(e);
            }
        }
    }

    (puzzles, rejected)
}

fn finish(draft: Draft, oracle: &dyn RulesOracle) -> Result<Puzzle, EngineError> {
    // An empty or broken line degrades to a single-move puzzle against the bare
    // solution field; without a usable solution the record is rejected.
    let line = match playable_line(&draft.id, &draft.initial_position, &draft.tokens, oracle) {
        Ok(line) => line,
        Err(e) => match single_move(&draft, oracle) {
            Some(_) => {
                warn!(error = %e, "Line does not replay, using the solution move alone");
                Vec::new()
            }
            None => return Err(e),
        },
    };

    let (line, start_line_index) = if line.is_empty() {
        let single = single_move(&draft, oracle).ok_or_else(|| EngineError::UnparseableLine {
            puzzle_id: draft.id.clone(),
        })?;
        (vec![single], 0)
    } else {
        let start = draft.explicit_start.unwrap_or(match draft.provenance {
            Provenance::Pool if line.len() >= 2 => 1,
            _ => 0,
        });
        if start >= line.len() {
            return Err(EngineError::InvalidStart {
                puzzle_id: draft.id,
                start,
                len: line.len(),
            });
        }
        (line, start)
    };

    Ok(Puzzle {
        id: draft.id,
        provenance: draft.provenance,
        initial_position: draft.initial_position,
        line,
        start_line_index,
        solution: draft.solution,
        rating: draft.rating,
        themes: draft.themes,
        hint: draft.hint,
        explanation: draft.explanation,
    })
}

fn single_move(draft: &Draft, oracle: &dyn RulesOracle) -> Option<String> {
    let spec = draft.solution.as_deref().and_then(MoveSpec::parse)?;
    let played = oracle.legal_move(&draft.initial_position, &spec).ok()?;
    Some(played.coord.to_string())
}

/// Leading coordinate tokens, each checked for legality. The line ends at the first
/// token that isn't a movement; an illegal movement rejects the puzzle.
fn playable_line(
    puzzle_id: &str,
    initial_position: &str,
    tokens: &[String],
    oracle: &dyn RulesOracle,
) -> Result<Vec<String>, EngineError> {
    let mut line = Vec::with_capacity(tokens.len());
    let mut position = initial_position.to_string();

    for (index, token) in tokens.iter().enumerate() {
        let Some(coord) = CoordMove::parse(token) else {
            debug!(
                puzzle_id,
                index,
                token = %token,
                dropped = tokens.len() - index,
                "Line stops at a non-move token"
            );
            break;
        };
        match oracle.legal_move(&position, &MoveSpec::Coord(coord)) {
            Ok(played) => {
                position = played.position;
                line.push(coord.to_string());
            }
            Err(_) => {
                return Err(EngineError::IllegalLine {
                    puzzle_id: puzzle_id.to_string(),
                    index,
                    token: token.clone(),
                })
            }
        }
    }

    Ok(line)
}

fn require_id(index: usize, id: Option<&str>) -> Result<String, EngineError> {
    clean(id).ok_or(EngineError::MissingId { index })
}

fn require_position(
    puzzle_id: &str,
    position: Option<&str>,
    oracle: &dyn RulesOracle,
) -> Result<String, EngineError> {
    let raw = clean(position).ok_or_else(|| EngineError::MissingPosition {
        puzzle_id: puzzle_id.to_string(),
    })?;
    oracle
        .normalize(&raw)
        .map_err(|e| EngineError::InvalidPosition {
            puzzle_id: puzzle_id.to_string(),
            reason: e.to_string(),
        })
}

fn clean(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}
