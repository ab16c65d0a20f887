//! Puzzle line state machine: one puzzle's traversal through its scripted line.
//!
//! The machine never sleeps. A correct move that leaves a scripted reply to play
//! reports `MoveOutcome::Advanced`; the owner schedules [`LineMachine::play_reply`]
//! after the reply delay. Wrong moves leave a [`PendingError`] that the owner clears
//! with [`LineMachine::revert_on_timeout`] when its timer expires.

use std::sync::Arc;

use chess_core::codec::CoordMove;
use chess_core::{MoveSpec, OracleMove, RulesOracle};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::hint::{self, Hint, Solution};
use crate::puzzle::Puzzle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    AwaitingPlayerMove,
    AutoPlayingReply,
    ErrorPendingRevert,
    Completed,
}

/// A wrong move on the board, and the position it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingError {
    pub snapshot: String,
    pub attempted: OracleMove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Completed,
    ReplyPending,
    /// The oracle could not make sense of the attempt in the current position
    Unresolvable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Correct, and a scripted reply is now due
    Advanced { played: OracleMove },
    /// Correct, and nothing is left to play
    Solved { played: OracleMove },
    /// Wrong; the attempted move is shown until reverted
    Incorrect { attempted: OracleMove, snapshot: String },
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub played: OracleMove,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBack {
    /// An uncommitted wrong move was taken off the board; the index is unchanged
    Corrected,
    /// Rewound to an earlier player turn
    Rewound { line_index: usize },
    AtStart,
}

pub struct LineMachine {
    puzzle: Arc<Puzzle>,
    oracle: Arc<dyn RulesOracle>,
    position: String,
    line_index: usize,
    completed: bool,
    pending_error: Option<PendingError>,
    reply_pending: bool,
}

impl std::fmt::Debug for LineMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineMachine")
            .field("puzzle_id", &self.puzzle.id)
            .field("position", &self.position)
            .field("line_index", &self.line_index)
            .field("completed", &self.completed)
            .field("pending_error", &self.pending_error)
            .field("reply_pending", &self.reply_pending)
            .finish()
    }
}

impl LineMachine {
    /// Load a puzzle at its starting point (setup plies already played).
    pub fn new(puzzle: Arc<Puzzle>, oracle: Arc<dyn RulesOracle>) -> Self {
        let mut machine = Self {
            position: puzzle.initial_position.clone(),
            puzzle,
            oracle,
            line_index: 0,
            completed: false,
            pending_error: None,
            reply_pending: false,
        };
        machine.reset();
        machine
    }

    pub fn puzzle(&self) -> &Arc<Puzzle> {
        &self.puzzle
    }

    /// FEN currently shown on the board.
    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn pending_error(&self) -> Option<&PendingError> {
        self.pending_error.as_ref()
    }

    pub fn is_reply_pending(&self) -> bool {
        self.reply_pending
    }

    pub fn state(&self) -> LineState {
        if self.completed {
            LineState::Completed
        } else if self.pending_error.is_some() {
            LineState::ErrorPendingRevert
        } else if self.reply_pending {
            LineState::AutoPlayingReply
        } else {
            LineState::AwaitingPlayerMove
        }
    }

    /// Position obtained by replaying `line[0..line_index)` from the start.
    pub fn implied_position(&self) -> Result<String, EngineError> {
        self.replay_to(self.line_index)
    }

    /// Whether the board shows exactly what the committed line implies.
    pub fn is_consistent(&self) -> bool {
        self.implied_position()
            .map(|implied| implied == self.position)
            .unwrap_or(false)
    }

    /// Evaluate a player's move against the next expected token.
    pub fn apply_move(&mut self, attempt: &MoveSpec) -> Result<MoveOutcome, EngineError> {
        if self.completed {
            return Ok(MoveOutcome::Ignored(IgnoreReason::Completed));
        }
        if self.reply_pending {
            return Ok(MoveOutcome::Ignored(IgnoreReason::ReplyPending));
        }

        // A wrong move still on the board is reconciled first: attempts are judged
        // from the last committed position.
        let base = match &self.pending_error {
            Some(pending) => pending.snapshot.clone(),
            None => self.position.clone(),
        };

        let Some(token) = self.puzzle.line.get(self.line_index) else {
            // Line exhausted without the completion flag; only reachable if the
            // flag was cleared externally.
            self.completed = true;
            return Ok(MoveOutcome::Ignored(IgnoreReason::Completed));
        };
        let expected = self.resolve_token(&base, self.line_index, token)?;

        let played = match self.oracle.legal_move(&base, attempt) {
            Ok(played) => played,
            Err(e) => {
                debug!(puzzle_id = %self.puzzle.id, attempt = %attempt, error = %e, "Attempt did not resolve");
                return Ok(MoveOutcome::Ignored(IgnoreReason::Unresolvable));
            }
        };

        self.pending_error = None;

        if played.same_move(&expected) {
            self.position = played.position.clone();
            self.line_index += 1;
            if self.line_index >= self.puzzle.line.len() {
                self.completed = true;
                debug!(puzzle_id = %self.puzzle.id, san = %played.san, "Puzzle solved by player move");
                Ok(MoveOutcome::Solved { played })
            } else {
                self.reply_pending = true;
                debug!(puzzle_id = %self.puzzle.id, san = %played.san, line_index = self.line_index, "Correct move");
                Ok(MoveOutcome::Advanced { played })
            }
        } else {
            debug!(
                puzzle_id = %self.puzzle.id,
                attempted = %played.san,
                expected = %expected.san,
                "Incorrect move"
            );
            self.position = played.position.clone();
            self.pending_error = Some(PendingError {
                snapshot: base.clone(),
                attempted: played.clone(),
            });
            Ok(MoveOutcome::Incorrect {
                attempted: played,
                snapshot: base,
            })
        }
    }

    /// Play the scripted reply that a correct move left pending. Returns None when
    /// nothing is pending (the reply was canceled).
    pub fn play_reply(&mut self) -> Result<Option<ReplyOutcome>, EngineError> {
        if !self.reply_pending {
            return Ok(None);
        }
        self.reply_pending = false;

        let token = self
            .puzzle
            .line
            .get(self.line_index)
            .cloned()
            .ok_or_else(|| EngineError::IllegalLine {
                puzzle_id: self.puzzle.id.clone(),
                index: self.line_index,
                token: String::new(),
            })?;
        let played = self.resolve_token(&self.position, self.line_index, &token)?;

        self.position = played.position.clone();
        self.line_index += 1;
        self.completed = self.line_index >= self.puzzle.line.len();
        debug!(
            puzzle_id = %self.puzzle.id,
            san = %played.san,
            completed = self.completed,
            "Scripted reply played"
        );

        Ok(Some(ReplyOutcome {
            played,
            completed: self.completed,
        }))
    }

    /// Drop a scheduled reply without playing it. Position and index are untouched.
    pub fn cancel_reply(&mut self) {
        self.reply_pending = false;
    }

    /// Take back a wrong move, or rewind to the previous player turn.
    pub fn step_back(&mut self) -> Result<StepBack, EngineError> {
        self.reply_pending = false;

        let implied = self.implied_position()?;
        if self.position != implied {
            self.position = implied;
            self.pending_error = None;
            return Ok(StepBack::Corrected);
        }
        self.pending_error = None;

        let start = self.puzzle.start_line_index;
        if self.line_index <= start {
            return Ok(StepBack::AtStart);
        }

        // Skip back over the scripted reply so the player is to move again.
        let distance = self.line_index - start;
        let target = if distance % 2 == 0 {
            self.line_index - 2
        } else {
            self.line_index - 1
        }
        .max(start);

        self.position = self.replay_to(target)?;
        self.line_index = target;
        self.completed = false;
        Ok(StepBack::Rewound { line_index: target })
    }

    /// Back to the player's first turn.
    pub fn reset(&mut self) {
        self.reply_pending = false;
        self.pending_error = None;
        self.completed = false;

        let start = self.puzzle.start_line_index;
        match self.replay_to(start) {
            Ok(position) => {
                self.position = position;
                self.line_index = start;
            }
            Err(e) => {
                warn!(puzzle_id = %self.puzzle.id, error = %e, "Setup moves failed to replay, showing initial position");
                self.position = self.puzzle.initial_position.clone();
                self.line_index = 0;
            }
        }
    }

    /// Restore the position from before a wrong move. Returns false when there was
    /// nothing to revert.
    pub fn revert_on_timeout(&mut self) -> bool {
        match self.pending_error.take() {
            Some(pending) => {
                self.position = pending.snapshot;
                self.completed = false;
                true
            }
            None => false,
        }
    }

    pub fn hint(&self) -> Option<Hint> {
        hint::next_hint(&self.puzzle, &self.position, self.line_index, self.oracle.as_ref())
    }

    pub fn solution(&self) -> Solution {
        hint::full_solution(&self.puzzle, &self.position, self.line_index, self.oracle.as_ref())
    }

    fn resolve_token(&self, position: &str, index: usize, token: &str) -> Result<OracleMove, EngineError> {
        let illegal = || EngineError::IllegalLine {
            puzzle_id: self.puzzle.id.clone(),
            index,
            token: token.to_string(),
        };
        let coord = CoordMove::parse(token).ok_or_else(illegal)?;
        self.oracle
            .legal_move(position, &MoveSpec::Coord(coord))
            .map_err(|_| illegal())
    }

    fn replay_to(&self, index: usize) -> Result<String, EngineError> {
        let tokens = &self.puzzle.line[..index.min(self.puzzle.line.len())];
        self.oracle
            .replay(&self.puzzle.initial_position, tokens)
            .map_err(|(i, _)| EngineError::IllegalLine {
                puzzle_id: self.puzzle.id.clone(),
                index: i,
                token: tokens.get(i).cloned().unwrap_or_default(),
            })
    }
}
