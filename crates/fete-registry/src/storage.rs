//! Persistent storage using RocksDB.
//!
//! Key layout:
//!
//! - `registrant:{id}` - JSON [`Registrant`]
//! - `identity:name:{hash}` / `identity:email:{hash}` - uniqueness index
//! - `occupancy:effective:{level}` / `occupancy:requested:{level}` - counters
//! - `relationship:{new}:{known}` - JSON [`Relationship`]
//! - `meta:next_registrant_id` - id sequence, survives resets
//!
//! Every admission is one `WriteBatch`, applied while holding the commit
//! lock, so counters, index entries and relationship rows land together or
//! not at all.

use crate::error::{Error, Result};
use crate::models::Relationship;
use fete_seating::{
    CommitOutcome, Identity, IdentityField, LedgerError, NewAdmission, Occupancy, Registrant,
    RegistrantId, SeatLedger, TierLevel,
};
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const REGISTRANT_PREFIX: &str = "registrant:";
const RELATIONSHIP_PREFIX: &str = "relationship:";
const EFFECTIVE_PREFIX: &str = "occupancy:effective:";
const REQUESTED_PREFIX: &str = "occupancy:requested:";
const NEXT_ID_KEY: &[u8] = b"meta:next_registrant_id";

/// Storage backend for registry data.
pub struct Storage {
    db: DB,
    commit_lock: Mutex<()>,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            commit_lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.commit_lock
            .lock()
            .map_err(|_| Error::Storage("commit lock poisoned".into()))
    }

    // --- Registrants ---

    /// Get a registrant by ID.
    pub fn get_registrant(&self, id: RegistrantId) -> Result<Option<Registrant>> {
        match self.db.get(registrant_key(id).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// List all registrants in admission order.
    pub fn list_registrants(&self) -> Result<Vec<Registrant>> {
        let mut registrants = Vec::new();
        for (_, value) in self.scan(REGISTRANT_PREFIX)? {
            registrants.push(serde_json::from_slice(&value)?);
        }
        Ok(registrants)
    }

    fn registrant_ids(&self) -> Result<Vec<RegistrantId>> {
        let mut ids = Vec::new();
        for (key, _) in self.scan(REGISTRANT_PREFIX)? {
            let suffix = String::from_utf8_lossy(&key[REGISTRANT_PREFIX.len()..]).to_string();
            let id = suffix
                .parse::<u64>()
                .map_err(|_| Error::Storage(format!("bad registrant key: {}", suffix)))?;
            ids.push(RegistrantId(id));
        }
        Ok(ids)
    }

    // --- Relationships ---

    /// Familiarity edges recorded for one newcomer.
    pub fn relationships_of(&self, id: RegistrantId) -> Result<Vec<Relationship>> {
        let mut edges = Vec::new();
        for (_, value) in self.scan(&Relationship::key_prefix(id))? {
            edges.push(serde_json::from_slice(&value)?);
        }
        Ok(edges)
    }

    /// All familiarity edges.
    pub fn list_relationships(&self) -> Result<Vec<Relationship>> {
        let mut edges = Vec::new();
        for (_, value) in self.scan(RELATIONSHIP_PREFIX)? {
            edges.push(serde_json::from_slice(&value)?);
        }
        Ok(edges)
    }

    // --- Counters ---

    fn read_counters(&self, prefix: &str) -> Result<Occupancy> {
        let mut occupancy = Occupancy::new();
        for (key, value) in self.scan(prefix)? {
            let suffix = String::from_utf8_lossy(&key[prefix.len()..]).to_string();
            let level = suffix
                .parse::<u8>()
                .map_err(|_| Error::Storage(format!("bad counter key: {}", suffix)))?;
            occupancy.set(TierLevel(level), decode_u32(&value)?);
        }
        Ok(occupancy)
    }

    fn read_counter(&self, key: &str) -> Result<u32> {
        match self.db.get(key.as_bytes())? {
            Some(data) => decode_u32(&data),
            None => Ok(0),
        }
    }

    fn next_id(&self) -> Result<u64> {
        match self.db.get(NEXT_ID_KEY)? {
            Some(data) => {
                let bytes: [u8; 8] = data
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Invalid stored id sequence".into()))?;
                Ok(u64::from_be_bytes(bytes) + 1)
            }
            None => Ok(1),
        }
    }

    // --- Identity index ---

    fn collisions(&self, identity: &Identity) -> Result<Vec<IdentityField>> {
        let mut fields = Vec::new();
        if self.db.get(identity_key(IdentityField::Name, &identity.name_key()))?.is_some() {
            fields.push(IdentityField::Name);
        }
        if self.db.get(identity_key(IdentityField::Email, &identity.email_key()))?.is_some() {
            fields.push(IdentityField::Email);
        }
        Ok(fields)
    }

    // --- Admission ---

    /// Check-and-write one admission. Caller holds the commit lock.
    fn commit_locked(&self, admission: &NewAdmission, known: &[RegistrantId]) -> Result<CommitOutcome> {
        let fields = self.collisions(&admission.identity)?;
        if !fields.is_empty() {
            return Ok(CommitOutcome::Duplicate(fields));
        }

        let effective_key = counter_key(EFFECTIVE_PREFIX, admission.claim.tier);
        let current = self.read_counter(&effective_key)?;
        if !admission.claim.holds(current) {
            return Ok(CommitOutcome::Stale { current });
        }

        let existing = self.registrant_ids()?;
        if let Some(missing) = known.iter().find(|id| !existing.contains(id)) {
            return Err(Error::InvalidInput(format!("unknown registrant {}", missing)));
        }

        let id = self.next_id()?;
        let registrant = Registrant {
            id: RegistrantId(id),
            name: admission.identity.name().to_string(),
            email: admission.identity.email().to_string(),
            requested_tier: admission.requested,
            effective_tier: admission.claim.tier,
            admitted_at: now_ms(),
        };

        let requested_key = counter_key(REQUESTED_PREFIX, admission.requested);
        let requested = self.read_counter(&requested_key)?;

        let mut batch = WriteBatch::default();
        batch.put(registrant_key(registrant.id), serde_json::to_vec(&registrant)?);
        batch.put(
            identity_key(IdentityField::Name, &admission.identity.name_key()),
            id.to_be_bytes(),
        );
        batch.put(
            identity_key(IdentityField::Email, &admission.identity.email_key()),
            id.to_be_bytes(),
        );
        batch.put(effective_key, (current + 1).to_be_bytes());
        batch.put(requested_key, (requested + 1).to_be_bytes());
        batch.put(NEXT_ID_KEY, id.to_be_bytes());

        for other in existing {
            let edge = Relationship::new(registrant.id, other, known.contains(&other));
            batch.put(edge.storage_key(), serde_json::to_vec(&edge)?);
        }

        self.db.write(batch)?;
        Ok(CommitOutcome::Committed(registrant))
    }

    /// Delete every admission, index entry, counter and relationship.
    pub fn clear_admissions(&self) -> Result<usize> {
        let _guard = self.lock()?;

        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, _) = item?;
            if !key.starts_with(b"meta:") {
                batch.delete(&key);
                if key.starts_with(REGISTRANT_PREFIX.as_bytes()) {
                    removed += 1;
                }
            }
        }
        self.db.write(batch)?;
        Ok(removed)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let prefix = prefix.as_bytes();
        let mut items = Vec::new();

        let iter = self.db.prefix_iterator(prefix);
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(prefix) {
                items.push((key, value));
            } else {
                break;
            }
        }

        Ok(items)
    }
}

impl SeatLedger for Storage {
    type Dependents = Vec<RegistrantId>;

    fn occupancy(&self) -> std::result::Result<Occupancy, LedgerError> {
        Ok(self.read_counters(EFFECTIVE_PREFIX)?)
    }

    fn requested_occupancy(&self) -> std::result::Result<Occupancy, LedgerError> {
        Ok(self.read_counters(REQUESTED_PREFIX)?)
    }

    fn identity_collisions(
        &self,
        identity: &Identity,
    ) -> std::result::Result<Vec<IdentityField>, LedgerError> {
        Ok(self.collisions(identity)?)
    }

    fn commit(
        &self,
        admission: &NewAdmission,
        known: &Self::Dependents,
    ) -> std::result::Result<CommitOutcome, LedgerError> {
        let _guard = self.lock()?;
        Ok(self.commit_locked(admission, known)?)
    }

    fn registrants(&self) -> std::result::Result<Vec<Registrant>, LedgerError> {
        Ok(self.list_registrants()?)
    }

    fn reset(&self) -> std::result::Result<(), LedgerError> {
        let removed = self.clear_admissions()?;
        tracing::info!("Cleared {} registrants from storage", removed);
        Ok(())
    }
}

fn registrant_key(id: RegistrantId) -> String {
    format!("{}{:020}", REGISTRANT_PREFIX, id.0)
}

fn counter_key(prefix: &str, level: TierLevel) -> String {
    format!("{}{:03}", prefix, level.0)
}

/// Index key for a normalized identity value. Hashed so raw emails never
/// appear in keys.
fn identity_key(field: IdentityField, normalized: &str) -> String {
    let hash = blake3::hash(normalized.as_bytes());
    format!("identity:{}:{}", field.as_str(), hex::encode(hash.as_bytes()))
}

fn decode_u32(data: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = data
        .try_into()
        .map_err(|_| Error::Storage("Invalid stored counter".into()))?;
    Ok(u32::from_be_bytes(bytes))
}

/// Current time in unix milliseconds.
fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use fete_seating::SeatClaim;
    use tempfile::tempdir;

    fn admission(name: &str, tier: u8, observed: u32) -> NewAdmission {
        NewAdmission {
            identity: Identity::new(name, &format!("{}@example.org", name.to_lowercase())).unwrap(),
            requested: TierLevel(3),
            claim: SeatClaim {
                tier: TierLevel(tier),
                observed,
                capacity: 2,
            },
        }
    }

    fn committed(outcome: CommitOutcome) -> Registrant {
        match outcome {
            CommitOutcome::Committed(r) => r,
            other => panic!("expected commit, got {:?}", other),
        }
    }

    #[test]
    fn commit_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let ada = committed(storage.commit(&admission("Ada", 3, 0), &vec![]).unwrap());
        let loaded = storage.get_registrant(ada.id).unwrap().unwrap();
        assert_eq!(ada, loaded);

        assert_eq!(storage.occupancy().unwrap().get(TierLevel(3)), 1);
        assert_eq!(storage.requested_occupancy().unwrap().get(TierLevel(3)), 1);
    }

    #[test]
    fn stale_claim_is_refused() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        committed(storage.commit(&admission("Ada", 3, 0), &vec![]).unwrap());
        let outcome = storage.commit(&admission("Bob", 3, 0), &vec![]).unwrap();
        assert_eq!(outcome, CommitOutcome::Stale { current: 1 });

        committed(storage.commit(&admission("Bob", 3, 1), &vec![]).unwrap());
        let full = storage.commit(&admission("Cy", 3, 2), &vec![]).unwrap();
        assert_eq!(full, CommitOutcome::Stale { current: 2 });
        assert_eq!(storage.list_registrants().unwrap().len(), 2);
    }

    #[test]
    fn duplicate_identity_ignores_case() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        committed(storage.commit(&admission("Ada", 3, 0), &vec![]).unwrap());
        let outcome = storage.commit(&admission("ADA", 3, 1), &vec![]).unwrap();
        assert_eq!(
            outcome,
            CommitOutcome::Duplicate(vec![IdentityField::Name, IdentityField::Email])
        );
    }

    #[test]
    fn relationships_cover_every_earlier_registrant() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let ada = committed(storage.commit(&admission("Ada", 3, 0), &vec![]).unwrap());
        let bob = committed(storage.commit(&admission("Bob", 3, 1), &vec![]).unwrap());
        let cy = committed(storage.commit(&admission("Cy", 2, 0), &vec![bob.id]).unwrap());

        let edges = storage.relationships_of(cy.id).unwrap();
        assert_eq!(
            edges,
            vec![
                Relationship::new(cy.id, ada.id, false),
                Relationship::new(cy.id, bob.id, true),
            ]
        );
        assert_eq!(storage.list_relationships().unwrap().len(), 3);
    }

    #[test]
    fn unknown_relationship_rolls_back_everything() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        let err = storage
            .commit(&admission("Ada", 3, 0), &vec![RegistrantId(77)])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Invalid(_)));

        assert_eq!(storage.occupancy().unwrap().total(), 0);
        assert!(storage.list_registrants().unwrap().is_empty());
        assert!(storage
            .identity_collisions(&Identity::new("Ada", "ada@example.org").unwrap())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn reset_zeroes_occupancy_and_keeps_sequence() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        committed(storage.commit(&admission("Ada", 3, 0), &vec![]).unwrap());
        committed(storage.commit(&admission("Bob", 3, 1), &vec![]).unwrap());
        assert_eq!(storage.clear_admissions().unwrap(), 2);

        assert_eq!(storage.occupancy().unwrap().total(), 0);
        assert!(storage.list_relationships().unwrap().is_empty());

        let again = committed(storage.commit(&admission("Ada", 3, 0), &vec![]).unwrap());
        assert_eq!(again.id, RegistrantId(3));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = Storage::open(dir.path()).unwrap();
            committed(storage.commit(&admission("Ada", 1, 0), &vec![]).unwrap());
        }

        let storage = Storage::open(dir.path()).unwrap();
        assert_eq!(storage.occupancy().unwrap().get(TierLevel(1)), 1);
        assert_eq!(storage.list_registrants().unwrap()[0].name, "Ada");
    }
}
