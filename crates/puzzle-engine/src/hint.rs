//! Hints and solutions derived from the remaining line. Nothing here mutates state.

use std::sync::LazyLock;

use chess_core::codec::CoordMove;
use chess_core::{MoveSpec, RulesOracle};
use regex::Regex;
use serde::Serialize;

use crate::puzzle::Puzzle;

/// Sentences that only credit the dataset the puzzle came from.
static ATTRIBUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[^.!?\n]*\b(?:lichess(?:\.org)?|cc0|creative commons|puzzle database)\b[^.!?\n]*[.!?]?",
    )
    .unwrap()
});

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub coord: CoordMove,
    /// Algebraic form in the current position
    pub san: String,
    /// Stored hint text, if the puzzle has one
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Solution {
    /// The rest of the line, in algebraic notation
    Moves {
        sans: Vec<String>,
        explanation: Option<String>,
    },
    /// Nothing could be replayed; show what was stored instead
    Text {
        solution: Option<String>,
        explanation: Option<String>,
    },
}

/// The expected move at `line_index`, or None when the line no longer fits the board.
pub fn next_hint(
    puzzle: &Puzzle,
    position: &str,
    line_index: usize,
    oracle: &dyn RulesOracle,
) -> Option<Hint> {
    let position = if position.is_empty() {
        puzzle.initial_position.as_str()
    } else {
        position
    };
    let coord = CoordMove::parse(puzzle.line.get(line_index)?)?;
    let played = oracle.legal_move(position, &MoveSpec::Coord(coord)).ok()?;
    Some(Hint {
        coord: played.coord,
        san: played.san,
        text: puzzle.hint.clone(),
    })
}

/// Every remaining move from `line_index`, stopping at the first one that won't play.
pub fn full_solution(
    puzzle: &Puzzle,
    position: &str,
    line_index: usize,
    oracle: &dyn RulesOracle,
) -> Solution {
    let mut position = if position.is_empty() {
        puzzle.initial_position.clone()
    } else {
        position.to_string()
    };
    let explanation = puzzle.explanation.as_deref().and_then(strip_attribution);

    let mut sans = Vec::new();
    for token in puzzle.line.iter().skip(line_index) {
        let Some(coord) = CoordMove::parse(token) else { break };
        let Ok(played) = oracle.legal_move(&position, &MoveSpec::Coord(coord)) else { break };
        sans.push(played.san);
        position = played.position;
    }

    if sans.is_empty() {
        Solution::Text {
            solution: puzzle.solution.clone(),
            explanation,
        }
    } else {
        Solution::Moves { sans, explanation }
    }
}

/// Remove dataset credits from explanatory text. None when nothing else is left.
pub fn strip_attribution(text: &str) -> Option<String> {
    let stripped = ATTRIBUTION_RE.replace_all(text, " ");
    let collapsed = SPACE_RE.replace_all(stripped.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::Provenance;
    use chess_core::{ShakmatyOracle, STANDARD_START_FEN};

    fn puzzle(line: &[&str]) -> Puzzle {
        Puzzle {
            id: "h".into(),
            provenance: Provenance::Pool,
            initial_position: STANDARD_START_FEN.into(),
            line: line.iter().map(|s| s.to_string()).collect(),
            start_line_index: 0,
            solution: Some("Nf3".into()),
            rating: None,
            themes: Vec::new(),
            hint: Some("Develop".into()),
            explanation: Some("Knights before bishops. Puzzle from the Lichess puzzle database.".into()),
        }
    }

    #[test]
    fn test_hint_uses_current_position() {
        let p = puzzle(&["e2e4", "e7e5", "g1f3"]);
        let oracle = ShakmatyOracle::new();
        let hint = next_hint(&p, STANDARD_START_FEN, 0, &oracle).unwrap();
        assert_eq!(hint.san, "e4");
        assert_eq!(hint.coord.to_string(), "e2e4");
        assert_eq!(hint.text.as_deref(), Some("Develop"));

        // Empty position falls back to the initial one
        assert!(next_hint(&p, "", 0, &oracle).is_some());
        // Stale line: e7e5 is not legal for white
        assert!(next_hint(&p, STANDARD_START_FEN, 1, &oracle).is_none());
        assert!(next_hint(&p, STANDARD_START_FEN, 3, &oracle).is_none());
    }

    #[test]
    fn test_full_solution_from_index() {
        let p = puzzle(&["e2e4", "e7e5", "g1f3"]);
        let oracle = ShakmatyOracle::new();
        let Solution::Moves { sans, explanation } = full_solution(&p, "", 0, &oracle) else {
            panic!("expected moves");
        };
        assert_eq!(sans, vec!["e4", "e5", "Nf3"]);
        assert_eq!(explanation.as_deref(), Some("Knights before bishops."));
    }

    #[test]
    fn test_full_solution_falls_back_to_text() {
        let p = puzzle(&["e7e5"]);
        let oracle = ShakmatyOracle::new();
        assert_eq!(
            full_solution(&p, STANDARD_START_FEN, 0, &oracle),
            Solution::Text {
                solution: Some("Nf3".into()),
                explanation: Some("Knights before bishops.".into()),
            }
        );
    }

    #[test]
    fn test_strip_attribution() {
        assert_eq!(strip_attribution("Licensed CC0 from lichess.org."), None);
        assert_eq!(
            strip_attribution("Mate in two.  Source: Lichess puzzle database"),
            Some("Mate in two.".into())
        );
        assert_eq!(strip_attribution("A quiet move wins."), Some("A quiet move wins.".into()));
    }
}
