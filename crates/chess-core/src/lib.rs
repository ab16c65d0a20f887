//! Chess primitives shared by the puzzle engine: move token codec and the
//! rules oracle that validates moves and produces positions and notation.

pub mod codec;
pub mod oracle;

pub use codec::{CoordMove, MoveSpec};
pub use oracle::{OracleError, OracleMove, RulesOracle, ShakmatyOracle, STANDARD_START_FEN};
