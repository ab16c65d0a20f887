//! Engine configuration from environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::EngineError;
use crate::partition::BandThresholds;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause before a scripted reply is played, so the player's move can animate
    pub reply_delay: Duration,

    /// How long a wrong move stays on the board before it is taken back
    pub revert_delay: Duration,

    /// Maximum puzzles per difficulty band
    pub band_cap: usize,

    /// Rating boundaries between easy, medium and hard
    pub thresholds: BandThresholds,

    /// How long the "solved" notice stays up
    pub solved_notice: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(350),
            revert_delay: Duration::from_secs(3),
            band_cap: 10,
            thresholds: BandThresholds::default(),
            solved_notice: Duration::from_secs(2),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str| parse_var::<u64>(&lookup, key).map(Duration::from_millis);

        let config = Self {
            reply_delay: millis("PUZZLE_REPLY_DELAY_MS").unwrap_or(defaults.reply_delay),
            revert_delay: millis("PUZZLE_REVERT_DELAY_MS").unwrap_or(defaults.revert_delay),
            band_cap: parse_var(&lookup, "PUZZLE_BAND_CAP").unwrap_or(defaults.band_cap),
            thresholds: BandThresholds {
                easy_below: parse_var(&lookup, "PUZZLE_EASY_BELOW")
                    .unwrap_or(defaults.thresholds.easy_below),
                hard_from: parse_var(&lookup, "PUZZLE_HARD_FROM")
                    .unwrap_or(defaults.thresholds.hard_from),
            },
            solved_notice: millis("PUZZLE_SOLVED_NOTICE_MS").unwrap_or(defaults.solved_notice),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.band_cap == 0 {
            return Err(EngineError::Config("PUZZLE_BAND_CAP must be at least 1".into()));
        }
        self.thresholds.validate()
    }
}

/// Out-of-range values count as unparseable.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
