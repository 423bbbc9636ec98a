//! Aggregate counts and membership tiers over the page collection.
//!
//! # Invariants
//! - Hub-page tallies are weighted by `Page::count`; challenge pages are
//!   tallied separately and never weighted.
//! - Tier thresholds are inclusive lower bounds on feature count.

use crate::model::page::Page;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Hub membership level earned by accumulated features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    None,
    Artist,
    Member,
    VipMember,
    VipGoldMember,
    PlatinumMember,
    EliteMember,
    HallOfFameMember,
    DiamondMember,
}

/// `(minimum features, tier)` from highest to lowest.
const TIER_THRESHOLDS: &[(u64, MembershipTier)] = &[
    (250, MembershipTier::DiamondMember),
    (200, MembershipTier::HallOfFameMember),
    (100, MembershipTier::EliteMember),
    (75, MembershipTier::PlatinumMember),
    (50, MembershipTier::VipGoldMember),
    (25, MembershipTier::VipMember),
    (15, MembershipTier::Member),
    (5, MembershipTier::Artist),
];

impl MembershipTier {
    /// Tier reached with `features` accumulated features.
    pub fn for_feature_count(features: u64) -> Self {
        TIER_THRESHOLDS
            .iter()
            .find(|(minimum, _)| features >= *minimum)
            .map_or(Self::None, |(_, tier)| *tier)
    }

    /// Features still needed for the next tier, `None` at the top.
    pub fn features_to_next(features: u64) -> Option<u64> {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(minimum, _)| features < *minimum)
            .map(|(minimum, _)| minimum - features)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Artist => "Artist",
            Self::Member => "Member",
            Self::VipMember => "VIP Member",
            Self::VipGoldMember => "VIP Gold Member",
            Self::PlatinumMember => "Platinum Member",
            Self::EliteMember => "Elite Member",
            Self::HallOfFameMember => "Hall of Fame Member",
            Self::DiamondMember => "Diamond Member",
        }
    }
}

impl Display for MembershipTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of collection-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackerStatistics {
    pub page_count: u64,
    pub featured_page_count: u64,
    pub snap_feature_count: u64,
    pub raw_feature_count: u64,
    pub challenge_page_count: u64,
    pub challenge_feature_count: u64,
    pub membership: MembershipTier,
    pub raw_membership: MembershipTier,
}

/// Computes statistics for `pages`.
pub fn compute_statistics(pages: &[Page]) -> TrackerStatistics {
    let mut page_count = 0_u64;
    let mut featured_page_count = 0_u64;
    let mut snap_feature_count = 0_u64;
    let mut raw_feature_count = 0_u64;
    let mut challenge_page_count = 0_u64;
    let mut challenge_feature_count = 0_u64;

    for page in pages {
        if page.is_challenge {
            challenge_page_count += 1;
            challenge_feature_count += page.features.len() as u64;
            continue;
        }

        let weight = u64::from(page.count);
        page_count += weight;
        if !page.features.is_empty() {
            featured_page_count += weight;
        }
        let raw = page.features.iter().filter(|feature| feature.raw).count() as u64;
        let snap = page.features.len() as u64 - raw;
        raw_feature_count += raw * weight;
        snap_feature_count += snap * weight;
    }

    TrackerStatistics {
        page_count,
        featured_page_count,
        snap_feature_count,
        raw_feature_count,
        challenge_page_count,
        challenge_feature_count,
        membership: MembershipTier::for_feature_count(snap_feature_count),
        raw_membership: MembershipTier::for_feature_count(raw_feature_count),
    }
}
