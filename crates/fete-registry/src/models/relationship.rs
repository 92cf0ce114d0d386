//! Familiarity edges between registrants.

use fete_seating::RegistrantId;
use serde::{Deserialize, Serialize};

/// Whether a newly admitted registrant knows an earlier one.
///
/// One edge is stored for every registrant that existed at admission time,
/// so "does not know" is recorded explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// The registrant who filled in the form
    pub new_registrant_id: RegistrantId,

    /// The earlier registrant being asked about
    pub known_registrant_id: RegistrantId,

    /// True when the box was ticked
    pub knows: bool,
}

impl Relationship {
    /// Create an edge.
    pub fn new(new_registrant_id: RegistrantId, known_registrant_id: RegistrantId, knows: bool) -> Self {
        Self {
            new_registrant_id,
            known_registrant_id,
            knows,
        }
    }

    /// Storage key prefix for all edges of one newcomer.
    pub fn key_prefix(new_registrant_id: RegistrantId) -> String {
        format!("relationship:{:020}:", new_registrant_id.0)
    }

    /// Storage key for this edge.
    pub fn storage_key(&self) -> String {
        format!(
            "{}{:020}",
            Self::key_prefix(self.new_registrant_id),
            self.known_registrant_id.0
        )
    }
}
