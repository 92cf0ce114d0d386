//! Remaining-seat projections over an occupancy snapshot.

use crate::tier::{TierLevel, TierTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Admitted registrants per tier at some point in time.
///
/// Levels with no entry count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    counts: BTreeMap<TierLevel, u32>,
}

impl Occupancy {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for one tier.
    pub fn get(&self, level: TierLevel) -> u32 {
        self.counts.get(&level).copied().unwrap_or(0)
    }

    /// Overwrite the count for one tier.
    pub fn set(&mut self, level: TierLevel, count: u32) {
        self.counts.insert(level, count);
    }

    /// Add one admission to a tier.
    pub fn increment(&mut self, level: TierLevel) {
        *self.counts.entry(level).or_insert(0) += 1;
    }

    /// Sum over every tier.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Non-zero entries, lowest level first.
    pub fn iter(&self) -> impl Iterator<Item = (TierLevel, u32)> + '_ {
        self.counts
            .iter()
            .filter(|(_, c)| **c > 0)
            .map(|(l, c)| (*l, *c))
    }
}

impl FromIterator<(TierLevel, u32)> for Occupancy {
    fn from_iter<I: IntoIterator<Item = (TierLevel, u32)>>(iter: I) -> Self {
        let mut occupancy = Occupancy::new();
        for (level, count) in iter {
            *occupancy.counts.entry(level).or_insert(0) += count;
        }
        occupancy
    }
}

/// Remaining-seat calculator bound to a table and a snapshot.
///
/// Holds no state of its own; every answer is recomputed from `occupancy`.
#[derive(Debug, Clone, Copy)]
pub struct Availability<'a> {
    table: &'a TierTable,
    occupancy: &'a Occupancy,
}

impl<'a> Availability<'a> {
    /// Bind a calculator to a snapshot.
    pub fn new(table: &'a TierTable, occupancy: &'a Occupancy) -> Self {
        Self { table, occupancy }
    }

    /// Free seats in one tier.
    pub fn remaining(&self, level: TierLevel) -> u32 {
        self.table
            .tier_capacity(level)
            .saturating_sub(self.occupancy.get(level))
    }

    /// Admissions at `level` and every less privileged tier.
    pub fn cumulative_occupancy(&self, level: TierLevel) -> u32 {
        self.table
            .levels()
            .filter(|l| *l <= level)
            .map(|l| self.occupancy.get(l))
            .sum()
    }

    /// Free seats reachable from `level` by cascading down.
    pub fn cumulative_remaining(&self, level: TierLevel) -> u32 {
        self.table
            .cumulative_capacity(level)
            .saturating_sub(self.cumulative_occupancy(level))
    }

    /// Admissions at `level` and every more privileged tier.
    pub fn privileged_occupancy(&self, level: TierLevel) -> u32 {
        self.table
            .levels()
            .filter(|l| *l >= level)
            .map(|l| self.occupancy.get(l))
            .sum()
    }

    /// True when no tier has a free seat.
    pub fn is_sold_out(&self) -> bool {
        self.table.levels().all(|l| self.remaining(l) == 0)
    }
}
