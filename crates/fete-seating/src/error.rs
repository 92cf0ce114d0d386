//! Error types for fete-seating.

use crate::registrant::IdentityField;
use crate::tier::TierLevel;
use thiserror::Error;

/// Reasons an admission can fail.
///
/// Each variant maps to exactly one user-facing message in the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// Name and/or email already belongs to an admitted registrant.
    #[error("already registered: {}", describe_fields(.fields))]
    DuplicateIdentity { fields: Vec<IdentityField> },

    /// No tier from the requested level downward has a free seat.
    #[error("fully booked")]
    FullyBooked,

    /// The submission itself is malformed (empty name, unknown relation, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The persistence collaborator failed. Not retried internally.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

fn describe_fields(fields: &[IdentityField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Errors reported by a [`SeatLedger`](crate::SeatLedger) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Infrastructure failure (I/O, poisoned lock, corrupt value).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Dependent records referenced something that does not exist.
    #[error("invalid admission: {0}")]
    Invalid(String),
}

impl From<LedgerError> for AdmissionError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Unavailable(msg) => AdmissionError::StorageUnavailable(msg),
            LedgerError::Invalid(msg) => AdmissionError::InvalidRequest(msg),
        }
    }
}

/// Tier table configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A table needs at least one tier.
    #[error("tier table has no tiers")]
    NoTiers,

    /// Two tiers share a level.
    #[error("duplicate tier level {0}")]
    DuplicateLevel(TierLevel),

    /// An invitation code points at a level with no tier.
    #[error("invitation code {code:?} maps to undefined level {level}")]
    UnknownCodeLevel { code: String, level: TierLevel },

    /// The default level has no tier.
    #[error("default level {0} is not a defined tier")]
    UnknownDefault(TierLevel),

    /// Capacities add up to more seats than a counter can hold.
    #[error("total capacity exceeds {} seats", u32::MAX)]
    CapacityOverflow,
}
