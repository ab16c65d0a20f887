//! Access tiers and band gating.

use serde::Serialize;

use crate::partition::{Band, Partition};

/// Answers whether a user may see a whole category.
pub trait AccessCheck: Send + Sync {
    fn can_access_full(&self, user_id: &str) -> bool;
}

/// Same answer for everyone. Useful for hosts without accounts, and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAccess(pub bool);

impl AccessCheck for FixedAccess {
    fn can_access_full(&self, _user_id: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Full,
    #[default]
    Teaser,
}

impl AccessTier {
    /// Without an identity the answer is always teaser.
    pub fn resolve(check: &dyn AccessCheck, user_id: Option<&str>) -> Self {
        match user_id {
            Some(id) if !id.is_empty() && check.can_access_full(id) => AccessTier::Full,
            _ => AccessTier::Teaser,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandSelection {
    Selected { band: Band, available: usize },
    /// Nothing to show in this band; the host should offer an upgrade
    UpgradePrompt { band: Band },
}

/// Decide whether switching to `band` shows puzzles or an upgrade prompt.
pub fn gate_band(partition: &Partition, tier: AccessTier, band: Band) -> BandSelection {
    let available = visible(tier, partition.band(band)).len();
    if available == 0 {
        BandSelection::UpgradePrompt { band }
    } else {
        BandSelection::Selected { band, available }
    }
}

/// The slice of a band (or pool) a tier may see.
pub fn visible(tier: AccessTier, indices: &[usize]) -> &[usize] {
    match tier {
        AccessTier::Full => indices,
        AccessTier::Teaser => &indices[..indices.len().min(1)],
    }
}
