pub mod access;
pub mod config;
pub mod driver;
pub mod error;
pub mod hint;
pub mod line;
pub mod notify;
pub mod partition;
pub mod pool;
pub mod puzzle;
pub mod session;
pub mod store;
pub mod streak;
pub mod timer;

pub use access::{AccessCheck, AccessTier, BandSelection, FixedAccess};
pub use config::EngineConfig;
pub use driver::{spawn_session, DriverError, SessionHandle};
pub use error::EngineError;
pub use hint::{Hint, Solution};
pub use line::{IgnoreReason, LineMachine, LineState, MoveOutcome, StepBack};
pub use notify::{LogNotifier, NoticeDuration, NoticeHandle, NoticeKind, Notifier};
pub use partition::{Band, BandThresholds, Partition};
pub use pool::{InMemoryPool, JsonPoolSource, PoolError, PoolSource};
pub use puzzle::ingest::{GeneratedRecord, PoolRecord, PuzzleSource, TokenList};
pub use puzzle::{Provenance, Puzzle};
pub use session::{Navigation, PuzzleSession, SessionBuilder, SessionEvent, SessionSnapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use streak::StreakTracker;
