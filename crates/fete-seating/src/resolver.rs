//! Downgrade resolution.
//!
//! Start at the requested tier and walk toward less privileged tiers until
//! one has a free seat. The walk never goes up.

use crate::availability::{Availability, Occupancy};
use crate::tier::{TierLevel, TierTable};
use serde::{Deserialize, Serialize};

/// Terminal state of a downgrade walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "level", rename_all = "snake_case")]
pub enum Resolution {
    /// A seat is free at this level.
    Admitted(TierLevel),
    /// Every tier from the requested level down is full.
    FullyBooked,
}

impl Resolution {
    /// The admitting level, if any.
    pub fn level(&self) -> Option<TierLevel> {
        match self {
            Resolution::Admitted(level) => Some(*level),
            Resolution::FullyBooked => None,
        }
    }

    /// True when the seat is below the requested tier.
    pub fn is_downgrade(&self, requested: TierLevel) -> bool {
        matches!(self, Resolution::Admitted(level) if *level < requested)
    }
}

/// Pick the effective tier for a request.
///
/// A requested level with no tier of its own starts at the nearest defined
/// tier below it. Tiers with no remaining seats are skipped, the lowest one
/// included.
pub fn resolve(table: &TierTable, occupancy: &Occupancy, requested: TierLevel) -> Resolution {
    let availability = Availability::new(table, occupancy);

    table
        .levels()
        .filter(|level| *level <= requested)
        .find(|level| availability.remaining(*level) > 0)
        .map(Resolution::Admitted)
        .unwrap_or(Resolution::FullyBooked)
}
