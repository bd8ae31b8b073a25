//! Document storage capability for the syncpub replication gateway.
//!
//! This crate provides the [`Storage`] trait that every workspace backend
//! implements, together with the document model it operates on. The gateway
//! and registry only ever talk to a workspace through this trait:
//!
//! - **List paths** that currently hold a live document
//! - **List documents**, optionally with history and filtered by path
//! - **Ingest** one candidate document, returning an [`IngestOutcome`]
//!
//! # Architecture
//!
//! The crate provides:
//! - [`WorkspaceId`] and the address grammar used to validate workspaces,
//!   authors and paths
//! - [`Document`] with the conflict rule that decides which revision wins
//! - [`validate::check_document`] for structural validation on ingest
//! - [`MemoryStorage`], the volatile backend
//!
//! The persistent backend lives in `syncpub-storage-sqlite`.
//!
//! # Example
//!
//! ```ignore
//! use syncpub_storage::{DocumentQuery, MemoryStorage, Storage, WorkspaceId};
//!
//! let workspace = WorkspaceId::parse("+gardening.pals")?;
//! let storage = MemoryStorage::new(workspace);
//! let outcome = storage.ingest(&doc).await?;
//! let paths = storage.paths().await?;
//! ```

mod address;
mod document;
mod memory;
mod storage;
pub mod validate;

pub use address::{AddressError, WorkspaceId, check_author, check_path};
pub use document::{
    DOCUMENT_FORMAT, Document, DocumentQuery, content_hash, latest_per_path, now_micros,
    sort_newest_first,
};
pub use memory::MemoryStorage;
pub use storage::{IngestOutcome, Storage, StorageError, StorageErrorKind};
pub use validate::ValidationError;
