use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::KeyValueStore;

pub fn best_streak_key(category: &str) -> String {
    format!("puzzle-best-streak:{}", category)
}

/// Consecutive solves within one category, with the best run persisted.
pub struct StreakTracker {
    category: String,
    current: u32,
    best: u32,
    store: Arc<dyn KeyValueStore>,
}

impl StreakTracker {
    pub fn new(category: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        let mut tracker = Self {
            category: category.into(),
            current: 0,
            best: 0,
            store,
        };
        tracker.on_category_load();
        tracker
    }

    /// Start a fresh run and read the stored best once.
    pub fn on_category_load(&mut self) {
        self.current = 0;
        self.best = self
            .store
            .get(&best_streak_key(&self.category))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
    }

    /// Count a solve. Returns the new best when this solve set one.
    pub fn on_success(&mut self) -> Option<u32> {
        self.current += 1;
        if self.current <= self.best {
            return None;
        }
        self.best = self.current;
        if let Err(e) = self
            .store
            .set(&best_streak_key(&self.category), &self.best.to_string())
        {
            warn!(category = %self.category, error = %e, "Failed to persist best streak");
        }
        debug!(category = %self.category, best = self.best, "New best streak");
        Some(self.best)
    }

    pub fn on_failure(&mut self) {
        self.current = 0;
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}
