//! Registry models.
//!
//! The seating engine owns [`Registrant`](fete_seating::Registrant); this
//! module holds what the registration feature adds around it.
//!
//! - [`Relationship`] - familiarity edge written alongside a new registrant
//! - [`Registration`] - submitted form payload
//! - [`RegistrantSummary`] - public listing entry

mod registration;
mod relationship;

pub use registration::{RegistrantSummary, Registration};
pub use relationship::Relationship;
