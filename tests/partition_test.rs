//! Integration tests: difficulty bands and teaser gating over generated pools.

mod common;

use common::{open, rated_pool, Harness, Lcg};
use puzzle_engine::access::{gate_band, visible};
use puzzle_engine::partition::partition;
use puzzle_engine::{AccessTier, Band, BandSelection, BandThresholds};

fn random_ratings(rng: &mut Lcg, len: usize) -> Vec<Option<u32>> {
    (0..len)
        .map(|_| {
            if rng.range(0, 10) == 0 {
                None
            } else {
                Some(rng.range(600, 2600))
            }
        })
        .collect()
}

#[test]
fn test_bands_are_disjoint_capped_and_ordered() {
    let thresholds = BandThresholds::default();
    let mut rng = Lcg::new(42);

    for round in 0..50 {
        let len = rng.range(0, 60) as usize;
        let cap = rng.range(1, 12) as usize;
        let pool = random_ratings(&mut rng, len);
        let p = partition(&pool[..], |r| *r, &thresholds, cap);

        let mut seen = vec![false; pool.len()];
        for band in Band::ALL {
            let indices = p.band(band);
            assert!(indices.len() <= cap, "round {}: {} over cap", round, band);
            assert!(indices.windows(2).all(|w| w[0] < w[1]), "round {}: order lost", round);
            for &i in indices {
                assert!(!seen[i], "round {}: index {} in two bands", round, i);
                seen[i] = true;
                let rating = pool[i].expect("unrated puzzles are never banded");
                assert_eq!(thresholds.band_for(rating), band);
            }

            // Nothing that belongs in the band was skipped before the cap filled up
            let eligible: Vec<usize> = pool
                .iter()
                .enumerate()
                .filter(|(_, r)| r.map(|r| thresholds.band_for(r)) == Some(band))
                .map(|(i, _)| i)
                .take(cap)
                .collect();
            assert_eq!(indices, eligible.as_slice());
        }

        let teaser = p.teaser(pool.len());
        assert!(teaser.len() <= 3);
        assert!(teaser.len() <= p.non_empty_bands().len().max(1));
        for band in p.non_empty_bands() {
            assert_eq!(visible(AccessTier::Teaser, p.band(band)).len(), 1);
            assert!(teaser.contains(&p.band(band)[0]));
        }
    }
}

#[test]
fn test_twenty_five_rated_puzzles() {
    // 13 easy, 6 medium, 6 hard, interleaved
    let ratings: Vec<u32> = (0..25u32)
        .map(|i| match i % 4 {
            0 | 1 => 1000 + i,
            2 => 1600 + i,
            _ => 2000 + i,
        })
        .collect();
    let p = partition(&ratings[..], |r| Some(*r), &BandThresholds::default(), 10);
    assert_eq!(p.band(Band::Easy).len(), 10);
    assert_eq!(p.band(Band::Medium).len(), 6);
    assert_eq!(p.band(Band::Hard).len(), 6);
    assert_eq!(p.teaser(ratings.len()).len(), 3);

    for band in Band::ALL {
        assert!(matches!(
            gate_band(&p, AccessTier::Teaser, band),
            BandSelection::Selected { available: 1, .. }
        ));
    }

    let Harness { session, .. } = open("twenty-five", rated_pool(&ratings), AccessTier::Full);
    assert_eq!(session.displayed().len(), 10);
    assert_eq!(session.pool().len(), 25);
    let teaser: Vec<Option<u32>> = session.teaser_puzzles().iter().map(|p| p.rating).collect();
    assert_eq!(teaser, vec![Some(1000), Some(1602), Some(2003)]);
}

#[test]
fn test_custom_thresholds_and_cap() {
    let thresholds = BandThresholds {
        easy_below: 1200,
        hard_from: 1200,
    };
    let ratings = [1100u32, 1200, 1300, 1199];
    let p = partition(&ratings[..], |r| Some(*r), &thresholds, 1);
    assert_eq!(p.band(Band::Easy), &[0]);
    assert!(p.band(Band::Medium).is_empty());
    assert_eq!(p.band(Band::Hard), &[1]);
    assert_eq!(p.non_empty_bands(), vec![Band::Easy, Band::Hard]);
}
