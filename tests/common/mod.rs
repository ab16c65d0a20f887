//! Shared fixtures for the puzzle engine integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chess_core::{MoveSpec, STANDARD_START_FEN};
use puzzle_engine::{
    AccessTier, EngineConfig, MemoryStore, NoticeDuration, NoticeHandle, NoticeKind, Notifier,
    PoolRecord, PuzzleSession, PuzzleSource, SessionBuilder,
};

/// Scholar's mate from the initial position; the last token is Qxf7#.
pub const SCHOLAR_LINE: &str = "e2e4 e7e5 f1c4 b8c6 d1h5 g8f6 h5f7";

/// A short line that stays legal from the initial position.
pub const SHORT_LINE: &str = "e2e4 e7e5";

pub fn mv(text: &str) -> MoveSpec {
    MoveSpec::parse(text).unwrap_or_else(|| panic!("not a move: {}", text))
}

/// Pool record from the initial position.
pub fn record(id: &str, moves: &str, rating: Option<u32>, start: Option<usize>) -> PuzzleSource {
    PuzzleSource::Pool(PoolRecord {
        id: Some(id.to_string()),
        start_position: Some(STANDARD_START_FEN.to_string()),
        line_tokens: moves.split_whitespace().collect::<Vec<_>>().into(),
        rating,
        start_line_index: start,
        ..Default::default()
    })
}

/// One puzzle per rating, ids `p0`, `p1`, ...
pub fn rated_pool(ratings: &[u32]) -> Vec<PuzzleSource> {
    ratings
        .iter()
        .enumerate()
        .map(|(i, r)| record(&format!("p{}", i), SHORT_LINE, Some(*r), Some(0)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub duration: NoticeDuration,
    pub handle: NoticeHandle,
}

/// Keeps every notice and dismissal for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    next: AtomicU64,
    pub notices: Mutex<Vec<Notice>>,
    pub dismissed: Mutex<Vec<NoticeHandle>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<NoticeKind> {
        self.notices.lock().unwrap().iter().map(|n| n.kind).collect()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }

    pub fn dismissed(&self) -> Vec<NoticeHandle> {
        self.dismissed.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(
        &self,
        message: &str,
        kind: NoticeKind,
        duration: NoticeDuration,
        replace: Option<NoticeHandle>,
    ) -> NoticeHandle {
        let handle = replace.unwrap_or_else(|| NoticeHandle(self.next.fetch_add(1, Ordering::SeqCst)));
        self.notices.lock().unwrap().push(Notice {
            message: message.to_string(),
            kind,
            duration,
            handle,
        });
        handle
    }

    fn dismiss(&self, handle: NoticeHandle) {
        self.dismissed.lock().unwrap().push(handle);
    }
}

pub struct Harness {
    pub session: PuzzleSession,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryStore>,
}

pub fn open(category: &str, records: Vec<PuzzleSource>, tier: AccessTier) -> Harness {
    open_with_store(category, records, tier, Arc::new(MemoryStore::new()))
}

pub fn open_with_store(
    category: &str,
    records: Vec<PuzzleSource>,
    tier: AccessTier,
    store: Arc<MemoryStore>,
) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let session = SessionBuilder::new(category)
        .config(EngineConfig::default())
        .tier(tier)
        .store(store.clone())
        .notifier(notifier.clone())
        .open_with(records)
        .expect("session should open");
    Harness {
        session,
        notifier,
        store,
    }
}

/// Small deterministic generator for pool shapes.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Uniform-ish value in `[low, high)`.
    pub fn range(&mut self, low: u32, high: u32) -> u32 {
        low + self.next_u32() % (high - low)
    }
}
