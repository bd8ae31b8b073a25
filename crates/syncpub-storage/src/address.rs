//! Address grammar for workspaces, authors and document paths.
//!
//! Workspace ids are the registry key and end up in backing filenames, so the
//! grammar is intentionally narrow: lowercase ASCII letters, digits and a
//! single `.` separator after the leading `+`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `+name.suffix`, name 1-15 chars starting with a letter, suffix 1-53 chars.
static WORKSPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[a-z][a-z0-9]{0,14}\.[a-z0-9]{1,53}$").unwrap());

/// `@shortname.bkey`, shortname 4 chars, key 52 base32 chars.
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@[a-z][a-z0-9]{3}\.b[a-z2-7]{52}$").unwrap());

static PATH_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[A-Za-z0-9/'()\-._~!$&+,:=@%]+$").unwrap());

/// Maximum document path length in bytes.
const MAX_PATH_LEN: usize = 512;

/// Error returned when an address does not match its grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Workspace id does not match `+name.suffix`.
    #[error("invalid workspace address")]
    Workspace,
    /// Author address does not match `@shortname.bkey`.
    #[error("invalid author address")]
    Author,
    /// Document path is malformed.
    #[error("invalid path: {0}")]
    Path(&'static str),
}

/// A validated workspace identifier such as `+gardening.pals`.
///
/// Immutable once constructed; the only way to obtain one is through
/// [`WorkspaceId::parse`], so every value in circulation matches the grammar.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Parse and validate a workspace address.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Workspace`] if `raw` does not match the grammar.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        if WORKSPACE_RE.is_match(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(AddressError::Workspace)
        }
    }

    /// The address as a string slice, including the leading `+`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The address without its leading `+`.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WorkspaceId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for WorkspaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for WorkspaceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for WorkspaceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Check an author address.
///
/// # Errors
///
/// Returns [`AddressError::Author`] if `author` does not match the grammar.
pub fn check_author(author: &str) -> Result<(), AddressError> {
    if AUTHOR_RE.is_match(author) {
        Ok(())
    } else {
        Err(AddressError::Author)
    }
}

/// Check a document path.
///
/// # Errors
///
/// Returns [`AddressError::Path`] describing the first rule that failed.
pub fn check_path(path: &str) -> Result<(), AddressError> {
    if path.len() > MAX_PATH_LEN {
        return Err(AddressError::Path("too long"));
    }
    if !PATH_CHARS_RE.is_match(path) {
        return Err(AddressError::Path("must start with '/' and use allowed characters"));
    }
    if path.ends_with('/') {
        return Err(AddressError::Path("must not end with '/'"));
    }
    if path.contains("//") {
        return Err(AddressError::Path("must not contain '//'"));
    }
    if path.starts_with("/@") {
        return Err(AddressError::Path("must not start with '/@'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHOR: &str = "@bird.btr46n7ij6eq6hwnpvfcdakxqy3e6vz4e5vmw33ur7tjey5dkx6ea";

    #[test]
    fn test_workspace_valid() {
        for raw in ["+gardening.pals", "+test.a", "+a.b", "+garden.x", "+x1.0123456789"] {
            let id = WorkspaceId::parse(raw).unwrap();
            assert_eq!(id.as_str(), raw);
        }
    }

    #[test]
    fn test_workspace_invalid() {
        for raw in [
            "",
            "+",
            "gardening.pals",
            "+gardening",
            "+Gardening.pals",
            "+1garden.pals",
            "+garden.pa.ls",
            "+garden./pals",
            "+../etc.passwd",
            "+garden.pals/",
            "+garden.pals ",
            "+abcdefghijklmnop.x",
        ] {
            assert_eq!(WorkspaceId::parse(raw), Err(AddressError::Workspace), "{raw:?}");
        }
    }

    #[test]
    fn test_workspace_body_strips_plus() {
        let id = WorkspaceId::parse("+gardening.pals").unwrap();
        assert_eq!(id.body(), "gardening.pals");
    }

    #[test]
    fn test_workspace_ordering_is_lexical() {
        let mut ids = vec![
            WorkspaceId::parse("+b.b").unwrap(),
            WorkspaceId::parse("+a.z").unwrap(),
            WorkspaceId::parse("+a.a").unwrap(),
        ];
        ids.sort();
        let raw: Vec<&str> = ids.iter().map(WorkspaceId::as_str).collect();
        assert_eq!(raw, vec!["+a.a", "+a.z", "+b.b"]);
    }

    #[test]
    fn test_workspace_deserialize_rejects_invalid() {
        let ok: WorkspaceId = serde_json::from_str("\"+test.a\"").unwrap();
        assert_eq!(ok.as_str(), "+test.a");
        assert!(serde_json::from_str::<WorkspaceId>("\"test.a\"").is_err());
    }

    #[test]
    fn test_author_valid() {
        assert!(check_author(AUTHOR).is_ok());
    }

    #[test]
    fn test_author_invalid() {
        assert!(check_author("@bird").is_err());
        assert!(check_author("bird.btr46n7ij6eq6hwnpvfcdakxqy3e6vz4e5vmw33ur7tjey5dkx6ea").is_err());
        assert!(check_author("@bird.btr46n7ij6eq6hwnpvfcdakxqy3e6vz4e5vmw33ur7tjey5dkx6e").is_err());
        assert!(check_author("@bird.btr46n7ij6eq6hwnpvfcdakxqy3e6vz4e5vmw33ur7tjey5dkx6e1").is_err());
    }

    #[test]
    fn test_path_valid() {
        for path in ["/a", "/wiki/shared/A%20page.md", "/about/~@bird.b/x.json", "/chat/!tmp"] {
            assert!(check_path(path).is_ok(), "{path}");
        }
    }

    #[test]
    fn test_path_invalid() {
        for path in ["", "/", "a/b", "/a/", "/a//b", "/@bird", "/has space", "/tab\t"] {
            assert!(check_path(path).is_err(), "{path:?}");
        }
        assert!(check_path(&format!("/{}", "a".repeat(MAX_PATH_LEN))).is_err());
    }
}
