//! A category's puzzles and the player's progress through them.
//!
//! The session owns an immutable pool snapshot, the difficulty partition, a cursor
//! into the puzzles the access tier can see, and the traversal state of the one
//! puzzle on the board. Time is passed in: the owner calls [`PuzzleSession::advance`]
//! whenever [`PuzzleSession::next_deadline`] is reached.

use std::sync::Arc;
use std::time::Instant;

use chess_core::{MoveSpec, OracleMove, RulesOracle, ShakmatyOracle};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::access::{gate_band, visible, AccessCheck, AccessTier, BandSelection};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::hint::{Hint, Solution};
use crate::line::{LineMachine, LineState, MoveOutcome, StepBack};
use crate::notify::{LogNotifier, NoticeDuration, NoticeHandle, NoticeKind, Notifier};
use crate::partition::{partition, Band, Partition};
use crate::pool::PoolSource;
use crate::puzzle::ingest::{ingest_all, PuzzleSource};
use crate::puzzle::Puzzle;
use crate::store::{KeyValueStore, MemoryStore};
use crate::streak::StreakTracker;
use crate::timer::{DelayTimer, Ticket};

/// Things that happen when scheduled work runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ReplyPlayed {
        puzzle_id: String,
        played: OracleMove,
        completed: bool,
    },
    Solved {
        puzzle_id: String,
    },
    Reverted {
        puzzle_id: String,
        position: String,
    },
    IntegrityError(EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved { cursor: usize },
    AtBoundary,
    /// More puzzles exist but the access tier hides them
    UpgradePrompt,
}

/// What the host needs to render the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub category: String,
    pub puzzle_id: String,
    pub position: String,
    pub line_index: usize,
    pub start_line_index: usize,
    pub line_len: usize,
    pub state: LineState,
    pub rating: Option<u32>,
    pub themes: Vec<String>,
    pub band: Option<Band>,
    pub bands: Vec<Band>,
    pub tier: AccessTier,
    pub cursor: usize,
    pub displayed: usize,
    pub streak: u32,
    pub best_streak: u32,
}

pub struct SessionBuilder {
    category: String,
    config: EngineConfig,
    oracle: Arc<dyn RulesOracle>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    tier: AccessTier,
}

impl SessionBuilder {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            config: EngineConfig::default(),
            oracle: Arc::new(ShakmatyOracle::new()),
            store: Arc::new(MemoryStore::new()),
            notifier: Arc::new(LogNotifier::new()),
            tier: AccessTier::Teaser,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn RulesOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn tier(mut self, tier: AccessTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn access(self, check: &dyn AccessCheck, user_id: Option<&str>) -> Self {
        let tier = AccessTier::resolve(check, user_id);
        self.tier(tier)
    }

    /// Fetch the category from `source` and open it. A failed fetch is treated
    /// like an empty one.
    pub fn open(self, source: &dyn PoolSource) -> Result<PuzzleSession, EngineError> {
        let records = match source.fetch_pool(&self.category) {
            Ok(records) => records,
            Err(e) => {
                warn!(category = %self.category, error = %e, "Puzzle pool fetch failed");
                Vec::new()
            }
        };
        self.open_with(records)
    }

    pub fn open_with(self, records: Vec<PuzzleSource>) -> Result<PuzzleSession, EngineError> {
        self.config.validate()?;

        let (puzzles, rejected) = ingest_all(&records, self.oracle.as_ref());
        if puzzles.is_empty() {
            warn!(
                category = %self.category,
                records = records.len(),
                rejected = rejected.len(),
                "No playable puzzles"
            );
            return Err(EngineError::PoolExhausted {
                category: self.category,
            });
        }

        let pool: Arc<[Arc<Puzzle>]> = puzzles.into_iter().map(Arc::new).collect();
        let partition = partition(
            &pool[..],
            |p: &Arc<Puzzle>| p.rating,
            &self.config.thresholds,
            self.config.band_cap,
        );
        let selected = partition.non_empty_bands().first().copied();
        let streak = StreakTracker::new(self.category.clone(), self.store);

        info!(
            category = %self.category,
            puzzles = pool.len(),
            rejected = rejected.len(),
            tier = ?self.tier,
            band = ?selected,
            "Puzzle session opened"
        );

        let mut session = PuzzleSession {
            category: self.category,
            config: self.config,
            active: LineMachine::new(pool[0].clone(), self.oracle.clone()),
            oracle: self.oracle,
            notifier: self.notifier,
            pool,
            partition,
            selected,
            tier: self.tier,
            cursor: 0,
            generation: 0,
            reply_timer: DelayTimer::new(),
            revert_timer: DelayTimer::new(),
            streak,
            credited: false,
            error_notice: None,
            rejected,
        };
        session.load(0);
        Ok(session)
    }
}

pub struct PuzzleSession {
    category: String,
    config: EngineConfig,
    oracle: Arc<dyn RulesOracle>,
    notifier: Arc<dyn Notifier>,
    pool: Arc<[Arc<Puzzle>]>,
    partition: Partition,
    selected: Option<Band>,
    tier: AccessTier,
    cursor: usize,
    active: LineMachine,
    generation: u64,
    reply_timer: DelayTimer,
    revert_timer: DelayTimer,
    streak: StreakTracker,
    /// The loaded puzzle already counted toward the streak
    credited: bool,
    error_notice: Option<NoticeHandle>,
    rejected: Vec<EngineError>,
}

impl std::fmt::Debug for PuzzleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PuzzleSession")
            .field("category", &self.category)
            .field("puzzles", &self.pool.len())
            .field("selected", &self.selected)
            .field("tier", &self.tier)
            .field("cursor", &self.cursor)
            .field("active", &self.active)
            .field("generation", &self.generation)
            .field("streak", &self.streak.current())
            .finish()
    }
}

impl PuzzleSession {
    pub fn apply_move(&mut self, attempt: &MoveSpec, now: Instant) -> Result<MoveOutcome, EngineError> {
        let outcome = self.active.apply_move(attempt).inspect_err(|e| {
            error!(category = %self.category, error = %e, "Puzzle line no longer matches the board");
        })?;

        match &outcome {
            MoveOutcome::Advanced { .. } => {
                self.clear_error();
                let ticket = self.ticket();
                self.reply_timer.arm(now, self.config.reply_delay, ticket);
            }
            MoveOutcome::Solved { .. } => {
                self.clear_error();
                self.on_completed();
            }
            MoveOutcome::Incorrect { attempted, .. } => {
                self.streak.on_failure();
                let ticket = self.ticket();
                self.revert_timer.arm(now, self.config.revert_delay, ticket);
                let message = format!("{} is not the move. Try again.", attempted.san);
                self.error_notice = Some(self.notifier.notify(
                    &message,
                    NoticeKind::Error,
                    NoticeDuration::For(self.config.revert_delay),
                    self.error_notice,
                ));
            }
            MoveOutcome::Ignored(reason) => {
                debug!(puzzle_id = %self.active.puzzle().id, ?reason, "Move attempt ignored");
            }
        }
        Ok(outcome)
    }

    /// Run whatever scheduled work is due at `now`.
    pub fn advance(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(ticket) = self.reply_timer.poll(now) {
            if self.is_live(&ticket) {
                let puzzle_id = ticket.puzzle_id;
                match self.active.play_reply() {
                    Ok(Some(reply)) => {
                        events.push(SessionEvent::ReplyPlayed {
                            puzzle_id: puzzle_id.clone(),
                            played: reply.played,
                            completed: reply.completed,
                        });
                        if reply.completed {
                            self.on_completed();
                            events.push(SessionEvent::Solved { puzzle_id });
                        }
                    }
                    Ok(None) => debug!(puzzle_id = %puzzle_id, "Reply was already canceled"),
                    Err(e) => {
                        error!(category = %self.category, error = %e, "Scripted reply failed");
                        events.push(SessionEvent::IntegrityError(e));
                    }
                }
            } else {
                debug!(?ticket, generation = self.generation, "Stale reply ticket dropped");
            }
        }

        if let Some(ticket) = self.revert_timer.poll(now) {
            if self.is_live(&ticket) {
                if self.active.revert_on_timeout() {
                    self.dismiss_error_notice();
                    events.push(SessionEvent::Reverted {
                        puzzle_id: ticket.puzzle_id,
                        position: self.active.position().to_string(),
                    });
                }
            } else {
                debug!(?ticket, generation = self.generation, "Stale revert ticket dropped");
            }
        }

        events
    }

    /// Earliest moment [`Self::advance`] has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.reply_timer.deadline(), self.revert_timer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn step_back(&mut self) -> Result<StepBack, EngineError> {
        self.invalidate();
        self.active.step_back()
    }

    pub fn reset(&mut self) {
        self.invalidate();
        self.active.reset();
    }

    pub fn next_puzzle(&mut self) -> Navigation {
        let displayed = self.displayed();
        if self.cursor + 1 < displayed.len() {
            self.load(self.cursor + 1);
            Navigation::Moved { cursor: self.cursor }
        } else if self.tier == AccessTier::Teaser && self.full_len() > displayed.len() {
            Navigation::UpgradePrompt
        } else {
            Navigation::AtBoundary
        }
    }

    pub fn previous_puzzle(&mut self) -> Navigation {
        if self.cursor == 0 {
            return Navigation::AtBoundary;
        }
        self.load(self.cursor - 1);
        Navigation::Moved { cursor: self.cursor }
    }

    /// Switch difficulty. An empty band leaves the board alone and asks for an upgrade.
    pub fn select_band(&mut self, band: Band) -> BandSelection {
        let selection = gate_band(&self.partition, self.tier, band);
        match selection {
            BandSelection::Selected { .. } => {
                self.selected = Some(band);
                self.load(0);
            }
            BandSelection::UpgradePrompt { .. } => {
                info!(category = %self.category, %band, tier = ?self.tier, "Band unavailable");
            }
        }
        selection
    }

    /// Change the access tier. The puzzle on the board stays if it is still visible.
    pub fn set_tier(&mut self, tier: AccessTier) {
        if tier == self.tier {
            return;
        }
        let current = self.displayed().get(self.cursor).copied();
        self.tier = tier;
        info!(category = %self.category, ?tier, "Access tier changed");

        let displayed = self.displayed();
        match current.and_then(|index| displayed.iter().position(|&i| i == index)) {
            Some(cursor) => self.cursor = cursor,
            None => self.load(0),
        }
    }

    pub fn hint(&self) -> Option<Hint> {
        self.active.hint()
    }

    pub fn solution(&self) -> Solution {
        self.active.solution()
    }

    /// Cancel everything scheduled. Call when the view goes away.
    pub fn teardown(&mut self) {
        self.invalidate();
        debug!(category = %self.category, "Puzzle session torn down");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let puzzle = self.active.puzzle();
        SessionSnapshot {
            category: self.category.clone(),
            puzzle_id: puzzle.id.clone(),
            position: self.active.position().to_string(),
            line_index: self.active.line_index(),
            start_line_index: puzzle.start_line_index,
            line_len: puzzle.line.len(),
            state: self.active.state(),
            rating: puzzle.rating,
            themes: puzzle.themes.clone(),
            band: self.selected,
            bands: self.partition.non_empty_bands(),
            tier: self.tier,
            cursor: self.cursor,
            displayed: self.displayed().len(),
            streak: self.streak.current(),
            best_streak: self.streak.best(),
        }
    }

    /// Pool indices of the puzzles the current tier and band show, in order.
    pub fn displayed(&self) -> Vec<usize> {
        match self.selected {
            Some(band) => visible(self.tier, self.partition.band(band)).to_vec(),
            None => {
                let all: Vec<usize> = (0..self.pool.len()).collect();
                visible(self.tier, &all).to_vec()
            }
        }
    }

    /// The sample a teaser tier can reach across all bands: one puzzle per
    /// non-empty band, or the first puzzle when the pool is ungrouped.
    pub fn teaser_puzzles(&self) -> Vec<Arc<Puzzle>> {
        self.partition
            .teaser(self.pool.len())
            .into_iter()
            .map(|i| self.pool[i].clone())
            .collect()
    }

    pub fn active(&self) -> &LineMachine {
        &self.active
    }

    pub fn current_puzzle(&self) -> &Arc<Puzzle> {
        self.active.puzzle()
    }

    pub fn pool(&self) -> &Arc<[Arc<Puzzle>]> {
        &self.pool
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn selected_band(&self) -> Option<Band> {
        self.selected
    }

    pub fn tier(&self) -> AccessTier {
        self.tier
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn streak(&self) -> &StreakTracker {
        &self.streak
    }

    /// Records that failed ingestion and were left out of the pool.
    pub fn rejected(&self) -> &[EngineError] {
        &self.rejected
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn full_len(&self) -> usize {
        match self.selected {
            Some(band) => self.partition.band(band).len(),
            None => self.pool.len(),
        }
    }

    fn load(&mut self, cursor: usize) {
        self.invalidate();
        let displayed = self.displayed();
        let Some(&index) = displayed.get(cursor) else {
            warn!(category = %self.category, cursor, "Cursor outside the displayed puzzles");
            return;
        };
        self.cursor = cursor;
        self.credited = false;
        self.active = LineMachine::new(self.pool[index].clone(), self.oracle.clone());
        debug!(
            category = %self.category,
            puzzle_id = %self.active.puzzle().id,
            cursor,
            generation = self.generation,
            "Puzzle loaded"
        );
    }

    /// Any navigation: cancel scheduled work and retire outstanding tickets.
    fn invalidate(&mut self) {
        self.reply_timer.cancel();
        self.revert_timer.cancel();
        self.active.cancel_reply();
        self.generation += 1;
        self.dismiss_error_notice();
    }

    fn ticket(&self) -> Ticket {
        Ticket::new(self.active.puzzle().id.clone(), self.generation)
    }

    fn is_live(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && ticket.puzzle_id == self.active.puzzle().id
    }

    fn clear_error(&mut self) {
        self.revert_timer.cancel();
        self.dismiss_error_notice();
    }

    fn dismiss_error_notice(&mut self) {
        if let Some(handle) = self.error_notice.take() {
            self.notifier.dismiss(handle);
        }
    }

    fn on_completed(&mut self) {
        let duration = NoticeDuration::For(self.config.solved_notice);
        self.notifier.notify("Puzzle solved!", NoticeKind::Success, duration, None);
        if self.credited {
            debug!(puzzle_id = %self.active.puzzle().id, "Puzzle solved again, streak unchanged");
            return;
        }
        self.credited = true;
        if let Some(best) = self.streak.on_success() {
            self.notifier.notify(
                &format!("New best streak: {}", best),
                NoticeKind::Info,
                duration,
                None,
            );
        }
        info!(
            category = %self.category,
            puzzle_id = %self.active.puzzle().id,
            streak = self.streak.current(),
            "Puzzle solved"
        );
    }
}
