//! Storage collaborator contract.
//!
//! The engine never talks to a database directly. It asks a [`SeatLedger`]
//! for snapshots and hands it a [`NewAdmission`] to commit. The ledger owns
//! atomicity: a commit either writes the registrant, its counters and all of
//! its dependent records, or writes nothing.

use crate::availability::Occupancy;
use crate::error::LedgerError;
use crate::registrant::{Identity, IdentityField, Registrant, RegistrantId};
use crate::tier::TierLevel;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// The seat a commit wants, plus the count it was decided against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatClaim {
    /// Tier to seat the registrant in
    pub tier: TierLevel,
    /// Tier count seen when the decision was made
    pub observed: u32,
    /// Tier capacity
    pub capacity: u32,
}

impl SeatClaim {
    /// Compare-and-commit check against the count at write time.
    pub fn holds(&self, current: u32) -> bool {
        current == self.observed && current < self.capacity
    }
}

/// Everything a ledger needs to persist one admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdmission {
    pub identity: Identity,
    pub requested: TierLevel,
    pub claim: SeatClaim,
}

/// Result of a single commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Written. Carries the stored record.
    Committed(Registrant),
    /// The tier count moved since the claim was made. Nothing written.
    Stale { current: u32 },
    /// Another registrant got the name and/or email first. Nothing written.
    Duplicate(Vec<IdentityField>),
}

/// Persistence collaborator for the admission engine.
///
/// `commit` must run as one serialized unit with respect to other commits:
/// identity re-check, claim check, dependent validation and all writes.
pub trait SeatLedger: Send + Sync {
    /// Per-registrant records written together with the registrant.
    type Dependents: Send + Sync;

    /// Effective-tier counts.
    fn occupancy(&self) -> Result<Occupancy, LedgerError>;

    /// Requested-tier counts.
    fn requested_occupancy(&self) -> Result<Occupancy, LedgerError>;

    /// Which identity fields already belong to someone.
    fn identity_collisions(&self, identity: &Identity) -> Result<Vec<IdentityField>, LedgerError>;

    /// Atomically persist an admission if its claim still holds.
    fn commit(
        &self,
        admission: &NewAdmission,
        dependents: &Self::Dependents,
    ) -> Result<CommitOutcome, LedgerError>;

    /// All admitted registrants.
    fn registrants(&self) -> Result<Vec<Registrant>, LedgerError>;

    /// Remove every admission and dependent record.
    fn reset(&self) -> Result<(), LedgerError>;
}

impl<L: SeatLedger + ?Sized> SeatLedger for Arc<L> {
    type Dependents = L::Dependents;

    fn occupancy(&self) -> Result<Occupancy, LedgerError> {
        (**self).occupancy()
    }

    fn requested_occupancy(&self) -> Result<Occupancy, LedgerError> {
        (**self).requested_occupancy()
    }

    fn identity_collisions(&self, identity: &Identity) -> Result<Vec<IdentityField>, LedgerError> {
        (**self).identity_collisions(identity)
    }

    fn commit(
        &self,
        admission: &NewAdmission,
        dependents: &Self::Dependents,
    ) -> Result<CommitOutcome, LedgerError> {
        (**self).commit(admission, dependents)
    }

    fn registrants(&self) -> Result<Vec<Registrant>, LedgerError> {
        (**self).registrants()
    }

    fn reset(&self) -> Result<(), LedgerError> {
        (**self).reset()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    registrants: Vec<Registrant>,
    names: HashSet<String>,
    emails: HashSet<String>,
    effective: Occupancy,
    requested: Occupancy,
    relationships: Vec<(RegistrantId, RegistrantId)>,
    next_id: u64,
}

impl MemoryState {
    fn collisions(&self, identity: &Identity) -> Vec<IdentityField> {
        let mut fields = Vec::new();
        if self.names.contains(&identity.name_key()) {
            fields.push(IdentityField::Name);
        }
        if self.emails.contains(&identity.email_key()) {
            fields.push(IdentityField::Email);
        }
        fields
    }
}

/// In-process ledger behind a single mutex.
///
/// Dependents are the ids of registrants the newcomer knows; each must
/// already exist or the whole commit is refused.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".into()))
    }

    /// Familiarity edges as (newcomer, known) pairs.
    pub fn relationships(&self) -> Result<Vec<(RegistrantId, RegistrantId)>, LedgerError> {
        Ok(self.lock()?.relationships.clone())
    }
}

impl SeatLedger for MemoryLedger {
    type Dependents = Vec<RegistrantId>;

    fn occupancy(&self) -> Result<Occupancy, LedgerError> {
        Ok(self.lock()?.effective.clone())
    }

    fn requested_occupancy(&self) -> Result<Occupancy, LedgerError> {
        Ok(self.lock()?.requested.clone())
    }

    fn identity_collisions(&self, identity: &Identity) -> Result<Vec<IdentityField>, LedgerError> {
        Ok(self.lock()?.collisions(identity))
    }

    fn commit(
        &self,
        admission: &NewAdmission,
        known: &Self::Dependents,
    ) -> Result<CommitOutcome, LedgerError> {
        let mut state = self.lock()?;

        let fields = state.collisions(&admission.identity);
        if !fields.is_empty() {
            return Ok(CommitOutcome::Duplicate(fields));
        }

        let current = state.effective.get(admission.claim.tier);
        if !admission.claim.holds(current) {
            return Ok(CommitOutcome::Stale { current });
        }

        for id in known {
            if !state.registrants.iter().any(|r| r.id == *id) {
                return Err(LedgerError::Invalid(format!("unknown registrant {}", id)));
            }
        }

        state.next_id += 1;
        let registrant = Registrant {
            id: RegistrantId(state.next_id),
            name: admission.identity.name().to_string(),
            email: admission.identity.email().to_string(),
            requested_tier: admission.requested,
            effective_tier: admission.claim.tier,
            admitted_at: now_ms(),
        };

        state.names.insert(admission.identity.name_key());
        state.emails.insert(admission.identity.email_key());
        state.effective.increment(registrant.effective_tier);
        state.requested.increment(registrant.requested_tier);
        for id in known {
            state.relationships.push((registrant.id, *id));
        }
        state.registrants.push(registrant.clone());

        Ok(CommitOutcome::Committed(registrant))
    }

    fn registrants(&self) -> Result<Vec<Registrant>, LedgerError> {
        Ok(self.lock()?.registrants.clone())
    }

    fn reset(&self) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        let next_id = state.next_id;
        *state = MemoryState {
            next_id,
            ..MemoryState::default()
        };
        Ok(())
    }
}

/// Current time in unix milliseconds.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
