//! Workspace registry for the syncpub replication gateway.
//!
//! Maps workspace ids to live storage backends and owns the policy for
//! creating them:
//!
//! - [`Policy`]: process-wide settings fixed at startup
//! - [`codec`]: workspace id <-> backing filename mapping
//! - [`StorageFactory`]: builds a [`Backend`] for a workspace
//! - [`WorkspaceRegistry`]: the id -> backend table
//! - [`demo`]: seeding of the well-known demo workspace
//!
//! # Lifecycle
//!
//! ```text
//! process start ──► WorkspaceRegistry::new (empty)
//!                        │
//!                        ├─► bootstrap_from_disk (persistent mode, before serving)
//!                        │
//!                        ├─► obtain / remove (per request)
//!                        │
//!                        └─► close_all (shutdown)
//! ```

pub mod codec;
pub mod demo;
mod factory;
mod policy;
mod registry;

pub use factory::{Backend, StorageFactory};
pub use policy::{BackendKind, Policy};
pub use registry::{RegistryError, WorkspaceRegistry};
