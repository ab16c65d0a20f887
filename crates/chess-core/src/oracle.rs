//! Rules oracle: move legality, resulting positions and notation.
//!
//! Positions cross this boundary as FEN strings. The engine only ever compares
//! positions produced here, so every FEN handed back is re-encoded by shakmaty
//! with `EnPassantMode::Legal`.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position, Role};
use thiserror::Error;

use crate::codec::{canonical_san, strip_annotations, CoordMove, MoveSpec};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("invalid position '{fen}': {reason}")]
    InvalidPosition { fen: String, reason: String },

    #[error("illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },
}

/// A legal move together with everything a board needs to show it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleMove {
    pub coord: CoordMove,
    /// Disambiguated SAN including the check/mate suffix.
    pub san: String,
    /// FEN after the move.
    pub position: String,
}

impl OracleMove {
    /// Same move, regardless of which notation produced it.
    pub fn same_move(&self, other: &OracleMove) -> bool {
        self.coord == other.coord
            || canonical_san(&self.san) == canonical_san(&other.san)
    }
}

/// External rules capability consumed by the engine.
pub trait RulesOracle: Send + Sync {
    /// Resolve `spec` in `position`; Err when the position is unreadable or the move
    /// is not legal there.
    fn legal_move(&self, position: &str, spec: &MoveSpec) -> Result<OracleMove, OracleError>;

    /// Canonical encoding of a position, so that equal positions compare equal.
    fn normalize(&self, position: &str) -> Result<String, OracleError>;

    /// Play `tokens` in order from `start`. On failure, returns the index of the
    /// offending token.
    fn replay(&self, start: &str, tokens: &[String]) -> Result<String, (usize, OracleError)> {
        let mut position = self.normalize(start).map_err(|e| (0, e))?;
        for (i, token) in tokens.iter().enumerate() {
            let spec = MoveSpec::parse(token).ok_or_else(|| {
                (
                    i,
                    OracleError::IllegalMove {
                        mv: token.clone(),
                        fen: position.clone(),
                    },
                )
            })?;
            position = self.legal_move(&position, &spec).map_err(|e| (i, e))?.position;
        }
        Ok(position)
    }
}

/// Oracle backed by shakmaty's standard chess rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShakmatyOracle;

impl ShakmatyOracle {
    pub fn new() -> Self {
        Self
    }

    fn parse_position(fen: &str) -> Result<Chess, OracleError> {
        let invalid = |reason: String| OracleError::InvalidPosition {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))
    }

    fn encode(pos: &Chess) -> String {
        Fen::from_position(pos, EnPassantMode::Legal).to_string()
    }

    /// Find the legal move matching a coordinate attempt.
    /// Castling matches either the king's destination or the rook's square; a pawn
    /// reaching the last rank without a promotion letter becomes a queen.
    fn resolve_coord(pos: &Chess, coord: &CoordMove) -> Option<Move> {
        let legals = pos.legal_moves();
        legals
            .iter()
            .find(|m| {
                let Some(mc) = CoordMove::from_move(m) else {
                    return false;
                };
                let squares = match m {
                    Move::Castle { king, rook, .. } => {
                        *king == coord.from && (mc.to == coord.to || *rook == coord.to)
                    }
                    _ => mc.from == coord.from && mc.to == coord.to,
                };
                squares
                    && match (mc.promotion, coord.promotion) {
                        (Some(role), Some(wanted)) => role == wanted,
                        (Some(role), None) => role == Role::Queen,
                        (None, wanted) => wanted.is_none(),
                    }
            })
            .cloned()
    }

    /// Parse as SAN first; failing that, compare canonical keys against every legal
    /// move so that sloppy input like `Qf7` for `Qxf7` still resolves.
    fn resolve_san(pos: &Chess, text: &str) -> Option<Move> {
        if let Ok(san) = strip_annotations(text).parse::<San>() {
            if let Ok(mv) = san.to_move(pos) {
                return Some(mv);
            }
        }

        let wanted = canonical_san(text);
        let legals = pos.legal_moves();
        let mut matching = legals
            .iter()
            .filter(|m| canonical_san(&San::from_move(pos, (*m).clone()).to_string()) == wanted);
        match (matching.next(), matching.next()) {
            (Some(mv), None) => Some(mv.clone()),
            _ => None,
        }
    }
}

impl RulesOracle for ShakmatyOracle {
    fn legal_move(&self, position: &str, spec: &MoveSpec) -> Result<OracleMove, OracleError> {
        let pos = Self::parse_position(position)?;
        let illegal = || OracleError::IllegalMove {
            mv: spec.to_string(),
            fen: position.to_string(),
        };

        let mv = match spec {
            MoveSpec::Coord(coord) => Self::resolve_coord(&pos, coord),
            MoveSpec::Algebraic(text) => Self::resolve_san(&pos, text),
        }
        .ok_or_else(illegal)?;

        let coord = CoordMove::from_move(&mv).ok_or_else(illegal)?;
        let mut san = San::from_move(&pos, mv.clone()).to_string();
        let after = pos.play(mv).map_err(|_| illegal())?;
        if after.is_checkmate() {
            san.push('#');
        } else if after.is_check() {
            san.push('+');
        }

        Ok(OracleMove {
            coord,
            san,
            position: Self::encode(&after),
        })
    }

    fn normalize(&self, position: &str) -> Result<String, OracleError> {
        Self::parse_position(position).map(|pos| Self::encode(&pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(token: &str) -> MoveSpec {
        MoveSpec::parse(token).unwrap()
    }

    #[test]
    fn test_normalize_start_position() {
        let oracle = ShakmatyOracle::new();
        assert_eq!(oracle.normalize(STANDARD_START_FEN).unwrap(), STANDARD_START_FEN);
        assert!(oracle.normalize("not a fen").is_err());
    }

    #[test]
    fn test_coord_and_san_resolve_to_same_move() {
        let oracle = ShakmatyOracle::new();
        let by_coord = oracle.legal_move(STANDARD_START_FEN, &coord("g1f3")).unwrap();
        let by_san = oracle.legal_move(STANDARD_START_FEN, &coord("Nf3")).unwrap();
        assert_eq!(by_coord, by_san);
        assert_eq!(by_coord.san, "Nf3");
        assert!(by_coord.same_move(&by_san));
    }

    #[test]
    fn test_illegal_move_is_an_error() {
        let oracle = ShakmatyOracle::new();
        assert!(matches!(
            oracle.legal_move(STANDARD_START_FEN, &coord("e2e5")),
            Err(OracleError::IllegalMove { .. })
        ));
        assert!(oracle.legal_move(STANDARD_START_FEN, &coord("Qh5")).is_err());
    }

    #[test]
    fn test_sloppy_san_still_resolves() {
        let oracle = ShakmatyOracle::new();
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
        let sloppy = oracle.legal_move(fen, &coord("Qf7")).unwrap();
        assert_eq!(sloppy.coord.to_string(), "h5f7");
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let oracle = ShakmatyOracle::new();
        let fen = "8/P7/8/8/8/8/8/k6K w - - 0 1";
        let plain = oracle.legal_move(fen, &coord("a7a8")).unwrap();
        assert_eq!(plain.coord.promotion, Some(Role::Queen));
        assert_eq!(plain.san, "a8=Q+");

        let knight = oracle.legal_move(fen, &coord("a7a8n")).unwrap();
        assert_eq!(knight.coord.promotion, Some(Role::Knight));
        assert!(!plain.same_move(&knight));
    }

    #[test]
    fn test_castling_forms() {
        let oracle = ShakmatyOracle::new();
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let king_dest = oracle.legal_move(fen, &coord("e1g1")).unwrap();
        let king_takes_rook = oracle.legal_move(fen, &coord("e1h1")).unwrap();
        let san = oracle.legal_move(fen, &coord("0-0")).unwrap();
        assert_eq!(king_dest.coord.to_string(), "e1g1");
        assert_eq!(king_dest, king_takes_rook);
        assert_eq!(king_dest, san);
        assert_eq!(san.san, "O-O");
    }

    #[test]
    fn test_castling_with_check_suffix() {
        let oracle = ShakmatyOracle::new();
        let fen = "5k2/8/8/8/8/8/8/4K2R w K - 0 1";
        for text in ["O-O+", "0-0+", "o-o+", "0-0"] {
            let castle = oracle.legal_move(fen, &coord(text)).unwrap();
            assert_eq!(castle.san, "O-O+", "{text}");
            assert_eq!(castle.coord.to_string(), "e1g1");
        }
    }

    #[test]
    fn test_mate_suffix() {
        let oracle = ShakmatyOracle::new();
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
        let mate = oracle.legal_move(fen, &coord("h5f7")).unwrap();
        assert_eq!(mate.san, "Qxf7#");
    }

    #[test]
    fn test_replay_reports_failing_index() {
        let oracle = ShakmatyOracle::new();
        let tokens: Vec<String> = ["e2e4", "e7e5", "e4e5"].iter().map(|s| s.to_string()).collect();
        let (index, _) = oracle.replay(STANDARD_START_FEN, &tokens).unwrap_err();
        assert_eq!(index, 2);

        let ok = oracle.replay(STANDARD_START_FEN, &tokens[..2]).unwrap();
        assert_eq!(ok, "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
    }
}
