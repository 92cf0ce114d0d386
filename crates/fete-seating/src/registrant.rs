//! Registrant identity and record.

use crate::error::AdmissionError;
use crate::tier::TierLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique registrant identifier, assigned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrantId(pub u64);

impl fmt::Display for RegistrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which identity field collided with an existing registrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityField {
    Name,
    Email,
}

impl IdentityField {
    /// Field name as shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityField::Name => "name",
            IdentityField::Email => "email",
        }
    }
}

/// A validated (name, email) pair.
///
/// Both fields are globally unique among admitted registrants. Comparison
/// goes through [`Identity::name_key`] and [`Identity::email_key`], which
/// ignore case and surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityFields")]
pub struct Identity {
    name: String,
    email: String,
}

/// Unvalidated wire form of [`Identity`].
#[derive(Deserialize)]
struct IdentityFields {
    name: String,
    email: String,
}

impl TryFrom<IdentityFields> for Identity {
    type Error = AdmissionError;

    fn try_from(raw: IdentityFields) -> Result<Self, Self::Error> {
        Identity::new(&raw.name, &raw.email)
    }
}

impl Identity {
    /// Validate and trim a submitted identity.
    pub fn new(name: &str, email: &str) -> Result<Self, AdmissionError> {
        let name = name.trim();
        let email = email.trim();

        if name.is_empty() || email.is_empty() {
            return Err(AdmissionError::InvalidRequest(
                "please provide both name and email".into(),
            ));
        }
        if !email.contains('@') {
            return Err(AdmissionError::InvalidRequest(
                "email address is not valid".into(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
        })
    }

    /// Name as submitted (trimmed).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Email as submitted (trimmed).
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Uniqueness key for the name.
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Uniqueness key for the email.
    pub fn email_key(&self) -> String {
        self.email.to_lowercase()
    }
}

/// An admitted registrant. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrant {
    /// Ledger-assigned id
    pub id: RegistrantId,

    /// Display name
    pub name: String,

    /// Contact email
    pub email: String,

    /// Tier implied by the invitation code
    pub requested_tier: TierLevel,

    /// Tier actually occupied
    pub effective_tier: TierLevel,

    /// Admission time (unix millis)
    pub admitted_at: u64,
}

impl Registrant {
    /// True when the registrant was seated below the requested tier.
    pub fn was_downgraded(&self) -> bool {
        self.effective_tier < self.requested_tier
    }

    /// Identity view of this record.
    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}
