//! Move token codec.
//! Lines store half-moves as compact coordinate tokens (`e2e4`, `e7e8q`); players may
//! also submit algebraic text (`Nf3`, `exd5+`, `O-O`). Both resolve to comparable keys.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use shakmaty::{File, Move, Rank, Role, Square};
use thiserror::Error;

static COORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-h])([1-8])([a-h])([1-8])([qrbnQRBN])?$").unwrap());

/// Decoration that never changes which move is meant.
static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[+#!?]+$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("not a coordinate move token: '{0}'")]
    NotCoordinate(String),
}

/// A move expressed by origin and destination squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl CoordMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self { from, to, promotion: None }
    }

    /// Parse a coordinate token. Returns None for anything that is not shaped like
    /// `file rank file rank [piece]`, which is how non-move directives are skipped.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = COORD_RE.captures(token.trim())?;
        let square = |file: &str, rank: &str| {
            let f = file.as_bytes()[0] - b'a';
            let r = rank.as_bytes()[0] - b'1';
            Square::from_coords(File::new(u32::from(f)), Rank::new(u32::from(r)))
        };

        let from = square(&caps[1], &caps[2]);
        let to = square(&caps[3], &caps[4]);
        let promotion = caps
            .get(5)
            .and_then(|m| m.as_str().chars().next())
            .and_then(role_from_char);

        Some(Self { from, to, promotion })
    }

    /// Coordinates of a legal move. Castling is reported with the king's destination
    /// square (g- or c-file), matching how boards emit drag events.
    pub fn from_move(mv: &Move) -> Option<Self> {
        match mv {
            Move::Normal { from, to, promotion, .. } => Some(Self {
                from: *from,
                to: *to,
                promotion: *promotion,
            }),
            Move::EnPassant { from, to, .. } => Some(Self::new(*from, *to)),
            Move::Castle { king, rook, .. } => {
                let file = if rook.file() > king.file() { File::G } else { File::C };
                Some(Self::new(*king, Square::from_coords(file, king.rank())))
            }
            Move::Put { .. } => None,
        }
    }
}

impl fmt::Display for CoordMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role_char(role))?;
        }
        Ok(())
    }
}

impl FromStr for CoordMove {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CodecError::NotCoordinate(s.to_string()))
    }
}

/// A move attempt or line entry before it has been checked against a position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoveSpec {
    Coord(CoordMove),
    Algebraic(String),
}

impl MoveSpec {
    /// Coordinate form wins when the text has that shape; anything else non-empty is
    /// kept as algebraic text for the oracle to interpret.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        match CoordMove::parse(trimmed) {
            Some(coord) => Some(Self::Coord(coord)),
            None => Some(Self::Algebraic(trimmed.to_string())),
        }
    }

    pub fn coord(&self) -> Option<CoordMove> {
        match self {
            Self::Coord(c) => Some(*c),
            Self::Algebraic(_) => None,
        }
    }
}

impl From<CoordMove> for MoveSpec {
    fn from(coord: CoordMove) -> Self {
        Self::Coord(coord)
    }
}

impl fmt::Display for MoveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coord(c) => c.fmt(f),
            Self::Algebraic(s) => f.write_str(s),
        }
    }
}

/// True when `token` is a coordinate movement rather than a directive.
pub fn is_movement(token: &str) -> bool {
    CoordMove::parse(token).is_some()
}

/// Strip trailing check/mate/annotation marks so the text parses as plain SAN.
pub fn strip_annotations(san: &str) -> String {
    let trimmed = san.trim().replace("e.p.", "");
    let bare = ANNOTATION_RE.replace(trimmed.trim(), "");
    normalize_castling(&bare)
}

/// Comparison key for algebraic text: no check, mate, capture, promotion `=` or
/// annotation marks. `exd5+` and `ed5` compare equal; `e8=Q` and `e8=N` do not.
pub fn canonical_san(san: &str) -> String {
    strip_annotations(san)
        .chars()
        .filter(|c| !matches!(c, 'x' | ':' | '=' | '+' | '#' | '!' | '?' | ' '))
        .collect()
}

fn normalize_castling(san: &str) -> String {
    if !san.is_empty() && san.chars().all(|c| matches!(c, '0' | 'O' | 'o' | '-')) {
        san.replace(['0', 'o'], "O")
    } else {
        san.to_string()
    }
}

pub fn role_from_char(c: char) -> Option<Role> {
    match c.to_ascii_lowercase() {
        'q' => Some(Role::Queen),
        'r' => Some(Role::Rook),
        'b' => Some(Role::Bishop),
        'n' => Some(Role::Knight),
        _ => None,
    }
}

pub fn role_char(role: Role) -> char {
    match role {
        Role::Pawn => 'p',
        Role::Knight => 'n',
        Role::Bishop => 'b',
        Role::Rook => 'r',
        Role::Queen => 'q',
        Role::King => 'k',
    }
}
