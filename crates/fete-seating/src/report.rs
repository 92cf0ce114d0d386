//! Tier reporting view for the admin dashboard.

use crate::availability::{Availability, Occupancy};
use crate::tier::{TierLevel, TierTable};
use serde::{Deserialize, Serialize};

/// One row of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierReport {
    pub level: TierLevel,
    pub name: String,
    /// Registrants seated in this tier
    pub effective_count: u32,
    /// Registrants whose code asked for this tier
    pub requested_count: u32,
    pub capacity: u32,
    pub remaining: u32,
    /// Rounded half up; 0 for a zero-capacity tier
    pub percentage_full: u32,
    /// Capacity of this tier and all lower tiers
    pub cumulative_capacity: u32,
    /// Seated in this tier and all lower tiers
    pub cumulative_effective_count: u32,
    pub cumulative_remaining: u32,
}

/// Full dashboard snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingReport {
    /// Most privileged tier first
    pub tiers: Vec<TierReport>,
    pub total_admitted: u32,
    pub total_capacity: u32,
    pub total_available: u32,
}

impl SeatingReport {
    /// Aggregate counts into the dashboard shape. Read-only.
    pub fn build(table: &TierTable, effective: &Occupancy, requested: &Occupancy) -> Self {
        let availability = Availability::new(table, effective);

        let tiers = table
            .tiers()
            .iter()
            .map(|tier| {
                let effective_count = effective.get(tier.level);
                TierReport {
                    level: tier.level,
                    name: tier.name.clone(),
                    effective_count,
                    requested_count: requested.get(tier.level),
                    capacity: tier.capacity,
                    remaining: availability.remaining(tier.level),
                    percentage_full: percentage(effective_count, tier.capacity),
                    cumulative_capacity: table.cumulative_capacity(tier.level),
                    cumulative_effective_count: availability.cumulative_occupancy(tier.level),
                    cumulative_remaining: availability.cumulative_remaining(tier.level),
                }
            })
            .collect();

        let total_admitted = table.levels().map(|l| effective.get(l)).sum();
        let total_capacity = table.total_capacity();

        Self {
            tiers,
            total_admitted,
            total_capacity,
            total_available: total_capacity.saturating_sub(total_admitted),
        }
    }

    /// Row for a level.
    pub fn tier(&self, level: TierLevel) -> Option<&TierReport> {
        self.tiers.iter().find(|t| t.level == level)
    }
}

fn percentage(count: u32, capacity: u32) -> u32 {
    if capacity == 0 {
        return 0;
    }
    // round(count * 100 / capacity), halves up
    let scaled = u64::from(count) * 200 + u64::from(capacity);
    (scaled / (2 * u64::from(capacity))) as u32
}
