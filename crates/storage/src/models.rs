//! Storage models.
//!
//! These types describe folders as the remote store knows them: an opaque
//! identifier assigned by the store, plus the human-readable name.

use derive_more::Display;
use std::fmt;

/// Opaque identifier the remote store assigned to a folder.
///
/// Only ever compared for equality and handed back to the store that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct FolderId(String);
impl FolderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for FolderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
impl From<&str> for FolderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Folder handle returned by storage backends.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    /// Identifier assigned by the remote store
    pub id: FolderId,
    /// Folder name, unique amongst its siblings
    pub name: String,
}
impl RemoteFolder {
    pub fn new(id: impl Into<FolderId>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}
// Cache dumps get logged a lot; keep them to one short line per folder.
impl fmt::Debug for RemoteFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}
