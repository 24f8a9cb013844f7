//! Name and identifier validation.
//!
//! Remote stores key folders and files by name within their parent, so a
//! name must be exactly one path component. Backends that map identifiers
//! onto a filesystem additionally need those identifiers to stay below
//! their base directory.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a folder or file name.
///
/// Rejects blank names, names containing path separators or null bytes,
/// and the special `.`/`..` entries.
///
/// # Examples
///
/// ```
/// use hoard_storage::validate_name;
/// assert!(validate_name("2019-08-18").is_ok());
/// assert!(validate_name("20190818_101500.jpg").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("   ").is_err());
/// assert!(validate_name("a/b").is_err());
/// assert!(validate_name("..").is_err());
/// ```
pub fn name(name: &str) -> Result<&str> {
    if name.trim().is_empty() || name.contains('\0') || name.contains('\\') {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(single)), None) if single == name => Ok(name),
        _ => exn::bail!(ErrorKind::InvalidName(name.to_string())),
    }
}

/// Validates a slash-separated relative identifier, returning it as a path
/// that can never climb above whatever it is later joined onto.
pub(crate) fn relative_path(id: &str) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in Path::new(id).components() {
        match component {
            Component::Normal(part) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if part.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidName(id.to_string()));
                }
                components.push(part)
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => {
                exn::bail!(ErrorKind::InvalidName(id.to_string()))
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidName(id.to_string())),
        false => Ok(components.into_iter().collect()),
    }
}
