//! Process-wide policy.

use std::path::PathBuf;

/// Which storage engine backs new workspaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// In-memory storage, lost on exit.
    #[default]
    Volatile,
    /// One SQLite file per workspace under the storage root.
    Persistent,
}

/// Immutable policy snapshot, read once at startup.
#[derive(Clone, Debug)]
pub struct Policy {
    /// Refuse every ingest request.
    pub readonly: bool,
    /// Create unknown workspaces when a peer pushes to them.
    pub allow_push_to_new_workspaces: bool,
    /// List workspace ids on the index page.
    pub discoverable: bool,
    /// Storage engine for workspaces.
    pub backend: BackendKind,
    /// Directory holding backing files (persistent mode only).
    pub storage_root: PathBuf,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            readonly: false,
            allow_push_to_new_workspaces: true,
            discoverable: false,
            backend: BackendKind::Volatile,
            storage_root: PathBuf::from("."),
        }
    }
}

impl Policy {
    /// Whether an ingest to an unknown workspace may create it.
    #[must_use]
    pub fn creates_on_push(&self) -> bool {
        self.allow_push_to_new_workspaces && !self.readonly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_open_and_volatile() {
        let policy = Policy::default();
        assert!(!policy.readonly);
        assert!(policy.creates_on_push());
        assert!(!policy.discoverable);
        assert_eq!(policy.backend, BackendKind::Volatile);
    }

    #[test]
    fn test_readonly_never_creates() {
        let policy = Policy {
            readonly: true,
            allow_push_to_new_workspaces: true,
            ..Policy::default()
        };
        assert!(!policy.creates_on_push());
    }

    #[test]
    fn test_closed_never_creates() {
        let policy = Policy {
            allow_push_to_new_workspaces: false,
            ..Policy::default()
        };
        assert!(!policy.creates_on_push());
    }
}
