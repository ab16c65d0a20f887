//! Tokio driver: owns a [`PuzzleSession`] on one task, serialises commands from
//! any number of handles, and sleeps until the session's next deadline.

use std::time::Instant;

use chess_core::MoveSpec;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::access::{AccessTier, BandSelection};
use crate::error::EngineError;
use crate::hint::{Hint, Solution};
use crate::line::{MoveOutcome, StepBack};
use crate::partition::Band;
use crate::session::{Navigation, PuzzleSession, SessionEvent, SessionSnapshot};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Puzzle session has stopped")]
    Stopped,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

enum Command {
    ApplyMove {
        attempt: MoveSpec,
        reply: oneshot::Sender<Result<MoveOutcome, EngineError>>,
    },
    StepBack(oneshot::Sender<Result<StepBack, EngineError>>),
    Reset(oneshot::Sender<()>),
    Next(oneshot::Sender<Navigation>),
    Previous(oneshot::Sender<Navigation>),
    SelectBand {
        band: Band,
        reply: oneshot::Sender<BandSelection>,
    },
    SetTier {
        tier: AccessTier,
        reply: oneshot::Sender<()>,
    },
    Hint(oneshot::Sender<Option<Hint>>),
    Solution(oneshot::Sender<Solution>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
}

/// Start driving `session`. Scheduled work (scripted replies, reverts) and solves
/// are reported on the returned receiver. The join handle yields the session back
/// after [`SessionHandle::shutdown`] or once every handle is dropped.
pub fn spawn_session(
    session: PuzzleSession,
) -> (
    SessionHandle,
    mpsc::UnboundedReceiver<SessionEvent>,
    JoinHandle<PuzzleSession>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, rx, event_tx));
    (SessionHandle { tx }, event_rx, task)
}

impl SessionHandle {
    pub async fn apply_move(&self, attempt: MoveSpec) -> Result<MoveOutcome, DriverError> {
        let outcome = self
            .request(|reply| Command::ApplyMove { attempt, reply })
            .await??;
        Ok(outcome)
    }

    pub async fn step_back(&self) -> Result<StepBack, DriverError> {
        Ok(self.request(Command::StepBack).await??)
    }

    pub async fn reset(&self) -> Result<(), DriverError> {
        self.request(Command::Reset).await
    }

    pub async fn next_puzzle(&self) -> Result<Navigation, DriverError> {
        self.request(Command::Next).await
    }

    pub async fn previous_puzzle(&self) -> Result<Navigation, DriverError> {
        self.request(Command::Previous).await
    }

    pub async fn select_band(&self, band: Band) -> Result<BandSelection, DriverError> {
        self.request(|reply| Command::SelectBand { band, reply }).await
    }

    pub async fn set_tier(&self, tier: AccessTier) -> Result<(), DriverError> {
        self.request(|reply| Command::SetTier { tier, reply }).await
    }

    pub async fn hint(&self) -> Result<Option<Hint>, DriverError> {
        self.request(Command::Hint).await
    }

    pub async fn solution(&self) -> Result<Solution, DriverError> {
        self.request(Command::Solution).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, DriverError> {
        self.request(Command::Snapshot).await
    }

    /// Stop the driver. Pending timers are canceled.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).map_err(|_| DriverError::Stopped)?;
        rx.await.map_err(|_| DriverError::Stopped)
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

async fn run(
    mut session: PuzzleSession,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> PuzzleSession {
    info!(category = %session.category(), "Session driver started");

    loop {
        let deadline = session.next_deadline();
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => handle(&mut session, command, &events),
                }
            }
            _ = sleep_until(deadline) => {
                for event in session.advance(now()) {
                    let _ = events.send(event);
                }
            }
        }
    }

    session.teardown();
    info!(category = %session.category(), "Session driver stopped");
    session
}

fn handle(session: &mut PuzzleSession, command: Command, events: &mpsc::UnboundedSender<SessionEvent>) {
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        Command::ApplyMove { attempt, reply } => {
            let result = session.apply_move(&attempt, now());
            if let Ok(MoveOutcome::Solved { .. }) = &result {
                let _ = events.send(SessionEvent::Solved {
                    puzzle_id: session.current_puzzle().id.clone(),
                });
            }
            let _ = reply.send(result);
        }
        Command::StepBack(reply) => {
            let _ = reply.send(session.step_back());
        }
        Command::Reset(reply) => {
            session.reset();
            let _ = reply.send(());
        }
        Command::Next(reply) => {
            let _ = reply.send(session.next_puzzle());
        }
        Command::Previous(reply) => {
            let _ = reply.send(session.previous_puzzle());
        }
        Command::SelectBand { band, reply } => {
            let _ = reply.send(session.select_band(band));
        }
        Command::SetTier { tier, reply } => {
            session.set_tier(tier);
            let _ = reply.send(());
        }
        Command::Hint(reply) => {
            let _ = reply.send(session.hint());
        }
        Command::Solution(reply) => {
            let _ = reply.send(session.solution());
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(session.snapshot());
        }
        Command::Shutdown => debug!("Shutdown handled by the driver loop"),
    }
}
