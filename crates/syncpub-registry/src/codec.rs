//! Workspace id <-> backing filename codec.
//!
//! `+gardening.pals` is stored as `gardening.pals.sqlite`. The workspace
//! grammar only admits `[a-z0-9]` and one `.`, so the encoded name never
//! contains a separator or a `..` segment and always stays inside the
//! storage root.

use std::path::{Path, PathBuf};

use syncpub_storage::{AddressError, WorkspaceId};

/// Extension of backing files.
pub const FILE_EXTENSION: &str = "sqlite";

/// Error decoding a filename back into a workspace id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The filename does not carry the backing-file extension.
    #[error("not a workspace file")]
    NotWorkspaceFile,
    /// The filename stem is not a valid workspace body.
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Filename (without directory) for a workspace.
#[must_use]
pub fn encode(id: &WorkspaceId) -> String {
    format!("{}.{FILE_EXTENSION}", id.body())
}

/// Validate a raw id and encode it.
///
/// # Errors
///
/// Returns [`CodecError::Address`] if `raw` is not a valid workspace id.
pub fn encode_str(raw: &str) -> Result<String, CodecError> {
    Ok(encode(&WorkspaceId::parse(raw)?))
}

/// Recover the workspace id from a filename (without directory).
///
/// # Errors
///
/// Returns [`CodecError`] if the name lacks the extension or the stem is not
/// a valid workspace body.
pub fn decode(filename: &str) -> Result<WorkspaceId, CodecError> {
    let stem = filename
        .strip_suffix(FILE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .ok_or(CodecError::NotWorkspaceFile)?;
    Ok(WorkspaceId::parse(&format!("+{stem}"))?)
}

/// Full path of a workspace's backing file under `root`.
#[must_use]
pub fn path_in(root: &Path, id: &WorkspaceId) -> PathBuf {
    root.join(encode(id))
}

#[cfg(test)]
mod tests {
    use std::path::Component;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode() {
        let id = WorkspaceId::parse("+gardening.pals").unwrap();
        assert_eq!(encode(&id), "gardening.pals.sqlite");
    }

    #[test]
    fn test_decode() {
        let id = decode("garden.x.sqlite").unwrap();
        assert_eq!(id.as_str(), "+garden.x");
    }

    #[test]
    fn test_decode_rejects_other_files() {
        assert_eq!(decode("notes.txt"), Err(CodecError::NotWorkspaceFile));
        assert_eq!(decode("sqlite"), Err(CodecError::NotWorkspaceFile));
        assert_eq!(decode("garden.x.sqlite-wal"), Err(CodecError::NotWorkspaceFile));
        assert!(matches!(decode("nodot.sqlite"), Err(CodecError::Address(_))));
        assert!(matches!(decode("..sqlite"), Err(CodecError::Address(_))));
        assert!(matches!(decode("UPPER.case.sqlite"), Err(CodecError::Address(_))));
    }

    #[test]
    fn test_encode_str_rejects_traversal() {
        assert!(encode_str("+../etc.passwd").is_err());
        assert!(encode_str("+a/b.c").is_err());
        assert!(encode_str("+a\\b.c").is_err());
        assert_eq!(encode_str("+test.a").unwrap(), "test.a.sqlite");
    }

    #[test]
    fn test_path_in_root() {
        let id = WorkspaceId::parse("+test.a").unwrap();
        assert_eq!(
            path_in(Path::new("/data"), &id),
            PathBuf::from("/data/test.a.sqlite")
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(raw in r"\+[a-z][a-z0-9]{0,14}\.[a-z0-9]{1,53}") {
            let id = WorkspaceId::parse(&raw).unwrap();
            prop_assert_eq!(decode(&encode(&id)).unwrap(), id);
        }

        #[test]
        fn prop_encoded_name_stays_in_root(raw in r"\+[a-z][a-z0-9]{0,14}\.[a-z0-9]{1,53}") {
            let id = WorkspaceId::parse(&raw).unwrap();
            let name = encode(&id);
            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains('\\'));
            prop_assert!(!name.contains(".."));
            let root = Path::new("/data");
            let full = path_in(root, &id);
            prop_assert_eq!(full.parent(), Some(root));
            prop_assert!(full.components().all(|c| !matches!(c, Component::ParentDir)));
        }

        #[test]
        fn prop_decode_only_yields_valid_ids(name in r"[a-zA-Z0-9./\\+_-]{0,40}") {
            if let Ok(id) = decode(&name) {
                prop_assert!(WorkspaceId::parse(id.as_str()).is_ok());
                prop_assert_eq!(encode(&id), name);
            }
        }
    }
}
