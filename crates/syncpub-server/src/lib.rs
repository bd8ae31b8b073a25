//! HTTP sync gateway for syncpub.
//!
//! This crate exposes a [`WorkspaceRegistry`] over HTTP so remote peers can
//! pull and push documents:
//! - Sync API under `/api` (and the legacy `/earthstar-api/v1` prefix)
//! - Small HTML views of the index and individual workspaces
//! - Administrative delete and demo-workspace endpoints
//!
//! # Quick Start
//!
//! ```ignore
//! use syncpub_registry::Policy;
//! use syncpub_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_owned(),
//!         port: 3333,
//!         policy: Policy::default(),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Peer ──HTTP──► axum router (syncpub-server)
//!                     │
//!                     ├─► API handlers ──► WorkspaceRegistry::obtain ──► Storage
//!                     │
//!                     ├─► HTML views ──► WorkspaceRegistry::list / count
//!                     │
//!                     └─► Admin handlers ──► WorkspaceRegistry::remove / demo seeding
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;
mod views;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use syncpub_registry::{Policy, StorageFactory, WorkspaceRegistry, demo};

pub use error::ServerError;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
    /// Access and storage policy.
    pub policy: Policy,
    /// Seed the demo workspace before serving.
    pub seed_demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3333,
            max_body_bytes: 1024 * 1024,
            policy: Policy::default(),
            seed_demo: true,
        }
    }
}

/// Run the server.
///
/// In persistent mode the storage root is scanned before the listener is
/// bound, so every existing workspace is served from the first request.
///
/// # Errors
///
/// Returns an error if the storage root cannot be scanned, the address is
/// invalid, or the listener fails.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = WorkspaceRegistry::new(StorageFactory::from_policy(&config.policy));
    registry.bootstrap_from_disk().await?;

    if config.seed_demo && demo::create_demo_workspace(&registry).await.is_none() {
        tracing::warn!("Demo workspace could not be created");
    }

    let state = Arc::new(AppState {
        registry,
        policy: config.policy.clone(),
    });
    let app = app::create_router(Arc::clone(&state), config.max_body_bytes);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(
        address = %addr,
        readonly = config.policy.readonly,
        backend = ?config.policy.backend,
        "Starting server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.registry.close_all().await;
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from syncpub config.
#[must_use]
pub fn server_config_from_config(config: &syncpub_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        max_body_bytes: config.server.max_body_bytes,
        policy: config.to_policy(),
        seed_demo: config.policy.seed_demo,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use syncpub_registry::BackendKind;

    use super::*;

    #[test]
    fn test_server_config_from_config() {
        let mut config = syncpub_config::Config::default();
        config.server.port = 4000;
        config.server.max_body_bytes = 512;
        config.policy.readonly = true;
        config.policy.seed_demo = false;
        config.storage_resolved.backend = syncpub_config::StorageBackend::Sqlite;
        config.storage_resolved.data_dir = PathBuf::from("/srv");

        let server = server_config_from_config(&config);

        assert_eq!(server.port, 4000);
        assert_eq!(server.max_body_bytes, 512);
        assert!(!server.seed_demo);
        assert!(server.policy.readonly);
        assert!(!server.policy.allow_push_to_new_workspaces);
        assert_eq!(server.policy.backend, BackendKind::Persistent);
        assert_eq!(server.policy.storage_root, PathBuf::from("/srv"));
    }
}
