//! Fete Registry - event registration node
//!
//! Wires the [`fete_seating`] allocation engine to persistent storage and
//! exposes it to registrants and organizers.
//!
//! # Architecture
//!
//! - **Models**: Registration payloads and familiarity relationships
//! - **Storage**: RocksDB-backed seat ledger with atomic batch commits
//! - **API**: HTTP endpoints for registration, quotes and the dashboard
//! - **Admin Socket**: Unix socket for local admin commands (fete-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use fete_registry::{RegistryConfig, RegistryNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RegistryConfig::from_env()?;
//!     let node = RegistryNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod error;
pub mod models;
pub mod node;
pub mod storage;

pub use error::{Error, Result};
pub use models::{RegistrantSummary, Registration, Relationship};
pub use node::{Engine, RegistryConfig, RegistryNode, RegistryState};
pub use storage::Storage;
