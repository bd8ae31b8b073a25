//! Application state.
//!
//! Shared state for all request handlers.

use syncpub_registry::{Policy, WorkspaceRegistry};

/// Application state shared across all handlers.
#[derive(Debug)]
pub(crate) struct AppState {
    /// Workspace id -> backend table.
    pub(crate) registry: WorkspaceRegistry,
    /// Process policy, fixed at startup.
    pub(crate) policy: Policy,
}
