//! Registration form payload and public listing entries.

use fete_seating::{AdmissionError, Identity, Registrant, RegistrantId};
use serde::{Deserialize, Serialize};

/// A submitted registration.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,

    /// Invitation code; absent means the default tier
    #[serde(default)]
    pub code: Option<String>,

    /// Earlier registrants the submitter knows
    #[serde(default)]
    pub knows: Vec<RegistrantId>,
}

impl Registration {
    /// Validate the identity fields.
    pub fn identity(&self) -> Result<Identity, AdmissionError> {
        Identity::new(&self.name, &self.email)
    }
}

/// What the public registrant list shows. Emails stay private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantSummary {
    pub id: RegistrantId,
    pub name: String,
    pub admitted_at: u64,
}

impl From<&Registrant> for RegistrantSummary {
    fn from(r: &Registrant) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            admitted_at: r.admitted_at,
        }
    }
}
