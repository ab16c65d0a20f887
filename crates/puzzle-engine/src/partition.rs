//! Difficulty bands: split a pool by rating into capped, order-preserving buckets.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Easy,
    Medium,
    Hard,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Easy, Band::Medium, Band::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Band::Easy => "easy",
            Band::Medium => "medium",
            Band::Hard => "hard",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// easy `< easy_below`, medium `[easy_below, hard_from)`, hard `>= hard_from`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub easy_below: u32,
    pub hard_from: u32,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            easy_below: 1400,
            hard_from: 1800,
        }
    }
}

impl BandThresholds {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.easy_below > self.hard_from {
            return Err(EngineError::Config(format!(
                "easy band ends at {} but hard band starts at {}",
                self.easy_below, self.hard_from
            )));
        }
        Ok(())
    }

    pub fn band_for(&self, rating: u32) -> Band {
        if rating < self.easy_below {
            Band::Easy
        } else if rating < self.hard_from {
            Band::Medium
        } else {
            Band::Hard
        }
    }
}

/// Pool indices per band.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    bands: [Vec<usize>; 3],
}

/// Bucket `pool` by rating. Items without a rating are left out; each band keeps at
/// most `cap` items in pool order.
pub fn partition<T, F>(pool: &[T], rating: F, thresholds: &BandThresholds, cap: usize) -> Partition
where
    F: Fn(&T) -> Option<u32>,
{
    let mut bands: [Vec<usize>; 3] = Default::default();
    for (index, item) in pool.iter().enumerate() {
        let Some(r) = rating(item) else { continue };
        let bucket = &mut bands[thresholds.band_for(r).slot()];
        if bucket.len() < cap {
            bucket.push(index);
        }
    }
    Partition { bands }
}

impl Partition {
    pub fn band(&self, band: Band) -> &[usize] {
        &self.bands[band.slot()]
    }

    /// No puzzle landed in any band.
    pub fn is_empty(&self) -> bool {
        self.bands.iter().all(Vec::is_empty)
    }

    pub fn non_empty_bands(&self) -> Vec<Band> {
        Band::ALL
            .into_iter()
            .filter(|b| !self.band(*b).is_empty())
            .collect()
    }

    /// First entry of every non-empty band, or just the first pool entry when the
    /// pool is ungrouped.
    pub fn teaser(&self, pool_len: usize) -> Vec<usize> {
        if self.is_empty() {
            return if pool_len > 0 { vec![0] } else { Vec::new() };
        }
        self.bands.iter().filter_map(|b| b.first().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(values: &[Option<u32>]) -> Partition {
        partition(values, |r| *r, &BandThresholds::default(), 2)
    }

    #[test]
    fn test_band_boundaries() {
        let t = BandThresholds::default();
        assert_eq!(t.band_for(1399), Band::Easy);
        assert_eq!(t.band_for(1400), Band::Medium);
        assert_eq!(t.band_for(1799), Band::Medium);
        assert_eq!(t.band_for(1800), Band::Hard);
    }

    #[test]
    fn test_cap_and_order() {
        let p = ratings(&[Some(1000), Some(1500), Some(1100), Some(900), Some(2000)]);
        assert_eq!(p.band(Band::Easy), &[0, 2]);
        assert_eq!(p.band(Band::Medium), &[1]);
        assert_eq!(p.band(Band::Hard), &[4]);
        assert_eq!(p.teaser(5), vec![0, 1, 4]);
    }

    #[test]
    fn test_unrated_pool_is_ungrouped() {
        let p = ratings(&[None, None]);
        assert!(p.is_empty());
        assert_eq!(p.teaser(2), vec![0]);
        assert!(ratings(&[]).teaser(0).is_empty());
    }

    #[test]
    fn test_missing_band_is_skipped() {
        let p = ratings(&[Some(2100), Some(1000)]);
        assert_eq!(p.non_empty_bands(), vec![Band::Easy, Band::Hard]);
        assert_eq!(p.teaser(2), vec![1, 0]);
    }

    #[test]
    fn test_inverted_thresholds() {
        let t = BandThresholds {
            easy_below: 1900,
            hard_from: 1800,
        };
        assert!(t.validate().is_err());
    }
}
