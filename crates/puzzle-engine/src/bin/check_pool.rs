//! Check a puzzle pool by solving every puzzle through the line engine.
//!
//! Reads `<dir>/<category>.json`, reports records that fail ingestion, then plays
//! each puzzle in every band by following the engine's own hints.
//!
//! Usage:
//!   cargo run --bin check-pool -- data/puzzles forks

use std::env;
use std::time::Instant;

use anyhow::{bail, Context};
use chess_core::MoveSpec;
use puzzle_engine::{
    AccessTier, Band, EngineConfig, JsonPoolSource, MoveOutcome, Navigation, PuzzleSession,
    SessionBuilder, SessionEvent,
};
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let (dir, category) = match args.as_slice() {
        [_, dir, category] => (dir.as_str(), category.as_str()),
        _ => bail!("Usage: check-pool <dir> <category>"),
    };

    let config = EngineConfig::from_env().context("Invalid engine configuration")?;
    let source = JsonPoolSource::new(dir);
    let mut session = SessionBuilder::new(category)
        .config(config)
        .tier(AccessTier::Full)
        .open(&source)
        .with_context(|| format!("Failed to open category '{}' in {}", category, dir))?;

    for rejected in session.rejected() {
        println!("rejected: {}", rejected);
    }

    let bands = session.partition().non_empty_bands();
    let groups: Vec<Option<Band>> = if bands.is_empty() {
        vec![None]
    } else {
        bands.into_iter().map(Some).collect()
    };

    let mut clock = Instant::now();
    let mut solved = 0;
    let mut failed = 0;

    for group in groups {
        if let Some(band) = group {
            session.select_band(band);
        }
        loop {
            let puzzle_id = session.current_puzzle().id.clone();
            match solve_current(&mut session, &mut clock) {
                Ok(()) => solved += 1,
                Err(e) => {
                    error!(puzzle_id = %puzzle_id, band = ?group, "{:#}", e);
                    println!("failed: {} ({:#})", puzzle_id, e);
                    failed += 1;
                }
            }
            if !matches!(session.next_puzzle(), Navigation::Moved { .. }) {
                break;
            }
        }
    }

    let unbanded = session.pool().iter().filter(|p| p.rating.is_none()).count();
    if unbanded > 0 && !session.partition().is_empty() {
        warn!(unbanded, "Unrated puzzles are not shown in any band and were not checked");
    }

    info!(
        category,
        solved,
        failed,
        rejected = session.rejected().len(),
        "Pool check finished"
    );
    println!(
        "{}: {} solved, {} failed, {} rejected",
        category,
        solved,
        failed,
        session.rejected().len()
    );

    if failed > 0 || !session.rejected().is_empty() {
        bail!("Pool '{}' has problems", category);
    }
    Ok(())
}

/// Follow hints until the puzzle completes, jumping the clock to each deadline.
fn solve_current(session: &mut PuzzleSession, clock: &mut Instant) -> anyhow::Result<()> {
    let puzzle = session.current_puzzle().clone();

    for _ in 0..=puzzle.line.len() {
        if session.active().is_completed() {
            return Ok(());
        }
        let hint = session
            .hint()
            .with_context(|| format!("no hint at line index {}", session.active().line_index()))?;

        match session.apply_move(&MoveSpec::Coord(hint.coord), *clock)? {
            MoveOutcome::Advanced { .. } => {}
            MoveOutcome::Solved { .. } => return Ok(()),
            other => bail!("hint {} was not accepted: {:?}", hint.san, other),
        }

        while let Some(deadline) = session.next_deadline() {
            *clock = deadline;
            for event in session.advance(*clock) {
                if let SessionEvent::IntegrityError(e) = event {
                    return Err(e).context("scripted reply failed");
                }
            }
        }
    }

    if session.active().is_completed() {
        Ok(())
    } else {
        bail!("line ended without completing")
    }
}
