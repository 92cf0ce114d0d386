//! Tiered Seat Allocation
//!
//! A fixed event capacity is split into ordered priority tiers. Every
//! registrant asks for the tier their invitation code maps to and is seated
//! there, or in the next lower tier that still has room, or not at all.
//!
//! # Core Insight
//!
//! Overflow only ever flows **down**. A VIP latecomer may end up in General,
//! a General registrant never ends up in VIP. Once seated, nobody moves.
//!
//! # Pipeline
//!
//! 1. [`TierTable`] maps an invitation code to a requested [`TierLevel`]
//! 2. [`Availability`] projects remaining seats from an [`Occupancy`] snapshot
//! 3. [`resolve`] walks tiers downward and picks the effective tier
//! 4. [`Admissions`] re-resolves against a fresh snapshot and commits through
//!    a [`SeatLedger`] with compare-and-commit, retrying on stale counts
//! 5. [`SeatingReport`] aggregates persisted counts for operators
//!
//! # Invariants
//!
//! - No tier ever holds more registrants than its capacity
//! - A registrant's effective tier is never above the requested tier
//! - Cumulative counts at or above any level stay within cumulative capacity

mod admission;
mod availability;
mod error;
mod ledger;
mod registrant;
mod report;
mod resolver;
mod tier;

pub use admission::{Admissions, Quote, MAX_COMMIT_ATTEMPTS};
pub use availability::{Availability, Occupancy};
pub use error::{AdmissionError, ConfigError, LedgerError};
pub use ledger::{CommitOutcome, MemoryLedger, NewAdmission, SeatClaim, SeatLedger};
pub use registrant::{Identity, IdentityField, Registrant, RegistrantId};
pub use report::{SeatingReport, TierReport};
pub use resolver::{resolve, Resolution};
pub use tier::{Tier, TierLevel, TierTable};
