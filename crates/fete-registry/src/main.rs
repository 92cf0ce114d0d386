//! Registry node binary
//!
//! Serves event registration with tiered seating.

use fete_registry::{RegistryConfig, RegistryNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fete_node=info,fete_registry=info,fete_seating=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fete registry node");

    let config = RegistryConfig::from_env()?;

    // Create and run node
    let node = RegistryNode::new(config).await?;
    node.run().await?;

    Ok(())
}
