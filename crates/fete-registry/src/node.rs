//! Registry node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for registrations, quotes and the seating dashboard
//! - Unix admin socket for local admin ops (fete-admin CLI)
//! - Optional periodic reset of all admissions

use crate::admin_socket::AdminSocket;
use crate::api;
use crate::error::{Error, Result};
use crate::storage::Storage;
use fete_seating::{Admissions, TierTable};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// The allocation engine as wired into the node.
pub type Engine = Admissions<Arc<Storage>>;

/// Configuration for a registry node.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Admin socket path (for fete-admin CLI)
    pub admin_socket: PathBuf,

    /// JSON tier table; built-in table when unset
    pub seating_config: Option<PathBuf>,

    /// Wipe all admissions on this period
    pub reset_interval: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./fete-data");
        Self {
            admin_socket: data_dir.join("admin.sock"),
            data_dir,
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            seating_config: None,
            reset_interval: None,
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from a variable lookup. Unset variables take defaults;
    /// unparsable ones are `Error::Config`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("FETE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let api_addr = parse_var(&lookup, "FETE_API_ADDR")?.unwrap_or(defaults.api_addr);

        let admin_socket = lookup("FETE_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.sock"));

        let seating_config = lookup("FETE_SEATING_CONFIG").map(PathBuf::from);

        let reset_interval = parse_var::<u64, _>(&lookup, "FETE_RESET_INTERVAL_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            data_dir,
            api_addr,
            admin_socket,
            seating_config,
            reset_interval,
        })
    }

    /// Load the tier table from `seating_config`, or the built-in default.
    pub fn load_tier_table(&self) -> Result<TierTable> {
        match &self.seating_config {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                Ok(TierTable::from_json(&json)?)
            }
            None => Ok(TierTable::default()),
        }
    }
}

/// Parse an optional variable.
fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid {}={:?}: {}", name, raw, e))),
        None => Ok(None),
    }
}

/// Shared state for the registry node.
pub struct RegistryState {
    pub engine: Engine,
    pub storage: Arc<Storage>,
}

impl RegistryState {
    /// Wire an engine over already-open storage.
    pub fn new(table: TierTable, storage: Arc<Storage>) -> Self {
        Self {
            engine: Admissions::new(table, Arc::clone(&storage)),
            storage,
        }
    }
}

/// A registry node instance.
pub struct RegistryNode {
    state: Arc<RegistryState>,
    config: RegistryConfig,
}

impl RegistryNode {
    /// Create a new registry node.
    pub async fn new(config: RegistryConfig) -> Result<Self> {
        // Ensure data directory exists
        std::fs::create_dir_all(&config.data_dir)?;

        let table = config.load_tier_table()?;
        for tier in table.tiers() {
            tracing::info!("  Tier {} {:?}: {} seats", tier.level, tier.name, tier.capacity);
        }

        let storage = Arc::new(Storage::open(config.data_dir.join("db"))?);
        let state = Arc::new(RegistryState::new(table, storage));

        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<RegistryState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts HTTP server, admin socket and reset timer).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Registry node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Data: {:?}", self.config.data_dir);

        let admin_socket = AdminSocket::new(self.state(), &self.config.admin_socket);
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        if let Some(period) = self.config.reset_interval {
            tracing::info!("  Reset: every {:?}", period);
            tokio::spawn(reset_loop(self.state(), period));
        }

        let app = api::build_router(self.state());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Periodically clear every admission.
async fn reset_loop(state: Arc<RegistryState>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        match state.engine.reset() {
            Ok(()) => tracing::info!("Scheduled reset completed"),
            Err(e) => tracing::error!("Scheduled reset failed: {}", e),
        }
    }
}
