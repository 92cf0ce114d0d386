//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for the seating dashboard and the
//! destructive reset, neither of which should be reachable over HTTP.

use crate::error::Result;
use crate::node::RegistryState;
use fete_seating::SeatingReport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Admin command sent over the socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Per-tier seating report
    Report,
    /// List registrants with their tiers
    Registrants,
    /// Where would this code be seated right now
    Quote {
        #[serde(default)]
        code: Option<String>,
    },
    /// Delete every admission
    Reset,
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Ok { message: String },
    Error { error: String },
    Report { report: SeatingReport },
    List { items: Vec<String> },
    Quote { requested: String, placement: Option<String> },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    state: Arc<RegistryState>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(state: Arc<RegistryState>, socket_path: &Path) -> Self {
        Self {
            state,
            socket_path: socket_path.to_path_buf(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, state: Arc<RegistryState>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, &state),
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

fn execute_command(cmd: AdminCommand, state: &RegistryState) -> AdminResponse {
    let engine = &state.engine;
    let table = engine.table();

    match cmd {
        AdminCommand::Report => match engine.report() {
            Ok(report) => AdminResponse::Report { report },
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::Registrants => match engine.registrants() {
            Ok(registrants) => AdminResponse::List {
                items: registrants
                    .iter()
                    .map(|r| {
                        let mut line = format!(
                            "#{} {} <{}> {}",
                            r.id,
                            r.name,
                            r.email,
                            table.tier_name(r.effective_tier)
                        );
                        if r.was_downgraded() {
                            line.push_str(&format!(
                                " (requested {})",
                                table.tier_name(r.requested_tier)
                            ));
                        }
                        line
                    })
                    .collect(),
            },
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::Quote { code } => match engine.quote(code.as_deref()) {
            Ok(quote) => AdminResponse::Quote {
                requested: table.tier_name(quote.requested),
                placement: quote.resolution.level().map(|l| table.tier_name(l)),
            },
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::Reset => match engine.reset() {
            Ok(()) => {
                tracing::info!("Admissions reset via admin socket");
                AdminResponse::Ok {
                    message: "All admissions cleared".to_string(),
                }
            }
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    let data_dir = std::env::var("FETE_DATA_DIR").unwrap_or_else(|_| "./fete-data".to_string());
    PathBuf::from(data_dir).join("admin.sock")
}
