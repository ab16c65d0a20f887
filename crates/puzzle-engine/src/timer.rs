//! Single-shot delays driven by an explicit clock.
//!
//! A timer only remembers a deadline and the ticket it was armed with; whoever owns
//! it calls [`DelayTimer::poll`] with the current time. Tickets carry the puzzle id
//! and the session generation so a late fire can be told apart from a live one.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub puzzle_id: String,
    pub generation: u64,
}

impl Ticket {
    pub fn new(puzzle_id: impl Into<String>, generation: u64) -> Self {
        Self {
            puzzle_id: puzzle_id.into(),
            generation,
        }
    }
}

#[derive(Debug, Default)]
pub struct DelayTimer {
    armed: Option<(Instant, Ticket)>,
}

impl DelayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the countdown, replacing any countdown already running.
    pub fn arm(&mut self, now: Instant, delay: Duration, ticket: Ticket) {
        self.armed = Some((now + delay, ticket));
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(at, _)| *at)
    }

    /// Hand back the ticket once the deadline has passed, then disarm.
    pub fn poll(&mut self, now: Instant) -> Option<Ticket> {
        match &self.armed {
            Some((at, _)) if *at <= now => self.armed.take().map(|(_, ticket)| ticket),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_deadline() {
        let start = Instant::now();
        let mut timer = DelayTimer::new();
        timer.arm(start, Duration::from_secs(3), Ticket::new("p", 1));

        assert_eq!(timer.poll(start + Duration::from_secs(2)), None);
        assert_eq!(timer.poll(start + Duration::from_secs(3)), Some(Ticket::new("p", 1)));
        assert_eq!(timer.poll(start + Duration::from_secs(4)), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_rearm_replaces() {
        let start = Instant::now();
        let mut timer = DelayTimer::new();
        timer.arm(start, Duration::from_secs(1), Ticket::new("p", 1));
        timer.arm(start, Duration::from_secs(5), Ticket::new("p", 2));

        assert_eq!(timer.deadline(), Some(start + Duration::from_secs(5)));
        assert_eq!(timer.poll(start + Duration::from_secs(2)), None);
        assert_eq!(timer.poll(start + Duration::from_secs(5)).map(|t| t.generation), Some(2));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let start = Instant::now();
        let mut timer = DelayTimer::new();
        timer.cancel();
        timer.arm(start, Duration::from_secs(1), Ticket::new("p", 1));
        timer.cancel();
        timer.cancel();
        assert_eq!(timer.poll(start + Duration::from_secs(10)), None);

        timer.arm(start, Duration::from_secs(1), Ticket::new("p", 3));
        assert!(timer.is_armed());
    }
}
