//! Admission commit protocol.
//!
//! 1. Reject known identities before touching any tier
//! 2. Snapshot occupancy and resolve the effective tier
//! 3. Commit with a [`SeatClaim`]; a stale claim sends us back to step 2
//!
//! Step 2 alone is advisory. Only a commit whose claim still holds at write
//! time takes a seat, so two requests racing for the last seat cannot both
//! get it: the loser re-resolves and cascades or is told the event is full.

use crate::availability::Occupancy;
use crate::error::AdmissionError;
use crate::ledger::{CommitOutcome, NewAdmission, SeatClaim, SeatLedger};
use crate::registrant::{Identity, Registrant};
use crate::report::SeatingReport;
use crate::resolver::{resolve, Resolution};
use crate::tier::{TierLevel, TierTable};
use serde::{Deserialize, Serialize};

/// Upper bound on compare-and-commit rounds for one admission.
///
/// Every stale round means some other admission took a seat in the same
/// tier, so the loop is bounded by capacity in practice.
pub const MAX_COMMIT_ATTEMPTS: usize = 64;

/// Advisory answer for "where would this code get me right now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub requested: TierLevel,
    pub resolution: Resolution,
}

/// The allocation engine bound to a tier table and a ledger.
#[derive(Debug)]
pub struct Admissions<L> {
    table: TierTable,
    ledger: L,
}

impl<L: SeatLedger> Admissions<L> {
    /// Create an engine.
    pub fn new(table: TierTable, ledger: L) -> Self {
        Self { table, ledger }
    }

    /// The tier table.
    pub fn table(&self) -> &TierTable {
        &self.table
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Predict the effective tier for a code. No guarantee it still holds
    /// by the time the registrant submits.
    pub fn quote(&self, code: Option<&str>) -> Result<Quote, AdmissionError> {
        let requested = self.table.priority_for_code(code);
        let occupancy = self.ledger.occupancy()?;
        Ok(Quote {
            requested,
            resolution: resolve(&self.table, &occupancy, requested),
        })
    }

    /// Admit using an invitation code to pick the requested tier.
    pub fn admit_with_code(
        &self,
        identity: Identity,
        code: Option<&str>,
        dependents: &L::Dependents,
    ) -> Result<Registrant, AdmissionError> {
        let requested = self.table.priority_for_code(code);
        self.admit(identity, requested, dependents)
    }

    /// Admit a registrant at `requested` or the nearest lower tier with room.
    pub fn admit(
        &self,
        identity: Identity,
        requested: TierLevel,
        dependents: &L::Dependents,
    ) -> Result<Registrant, AdmissionError> {
        let fields = self.ledger.identity_collisions(&identity)?;
        if !fields.is_empty() {
            tracing::info!("Rejected duplicate registration for {}", identity.email());
            return Err(AdmissionError::DuplicateIdentity { fields });
        }

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let occupancy = self.ledger.occupancy()?;
            let claim = match self.claim(&occupancy, requested) {
                Some(claim) => claim,
                None => {
                    tracing::info!("Fully booked from tier {} down", requested);
                    return Err(AdmissionError::FullyBooked);
                }
            };

            if claim.tier < requested {
                tracing::debug!("Cascading request for tier {} to tier {}", requested, claim.tier);
            }

            let admission = NewAdmission {
                identity: identity.clone(),
                requested,
                claim,
            };

            match self.ledger.commit(&admission, dependents)? {
                CommitOutcome::Committed(registrant) => {
                    tracing::info!(
                        "Admitted registrant {} at tier {} (requested {})",
                        registrant.id,
                        registrant.effective_tier,
                        registrant.requested_tier
                    );
                    return Ok(registrant);
                }
                CommitOutcome::Stale { current } => {
                    tracing::debug!(
                        "Stale claim on tier {} (saw {}, now {}), attempt {}",
                        claim.tier,
                        claim.observed,
                        current,
                        attempt
                    );
                }
                CommitOutcome::Duplicate(fields) => {
                    tracing::info!("Lost identity race for {}", identity.email());
                    return Err(AdmissionError::DuplicateIdentity { fields });
                }
            }
        }

        tracing::warn!("Admission contended for {} attempts", MAX_COMMIT_ATTEMPTS);
        Err(AdmissionError::StorageUnavailable(format!(
            "admission still contended after {} attempts",
            MAX_COMMIT_ATTEMPTS
        )))
    }

    fn claim(&self, occupancy: &Occupancy, requested: TierLevel) -> Option<SeatClaim> {
        match resolve(&self.table, occupancy, requested) {
            Resolution::Admitted(tier) => Some(SeatClaim {
                tier,
                observed: occupancy.get(tier),
                capacity: self.table.tier_capacity(tier),
            }),
            Resolution::FullyBooked => None,
        }
    }

    /// Dashboard view computed from fresh ledger counts.
    pub fn report(&self) -> Result<SeatingReport, AdmissionError> {
        let effective = self.ledger.occupancy()?;
        let requested = self.ledger.requested_occupancy()?;
        Ok(SeatingReport::build(&self.table, &effective, &requested))
    }

    /// All admitted registrants.
    pub fn registrants(&self) -> Result<Vec<Registrant>, AdmissionError> {
        Ok(self.ledger.registrants()?)
    }

    /// Clear every admission. Occupancy returns to zero for all tiers.
    pub fn reset(&self) -> Result<(), AdmissionError> {
        self.ledger.reset()?;
        tracing::info!("All admissions cleared");
        Ok(())
    }
}
