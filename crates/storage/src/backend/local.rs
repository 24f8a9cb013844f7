//! Local filesystem remote store.
//!
//! Treats a directory tree as the remote store: folders are directories
//! beneath a configured base directory, and a folder's identifier is its
//! path relative to that base. Useful for mounted network shares (NFS, SMB)
//! and external drives.

use crate::error::{ErrorKind, Result};
use crate::validate::{name as validate_name, relative_path};
use crate::{FolderId, RemoteFolder, RemoteStore};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Local filesystem remote store.
///
/// # Examples
///
/// ```no_run
/// use hoard_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("nas", "/mnt/backup")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    /// Directory holding the root folders
    base: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `base` - Absolute path to the directory holding the root folders
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        if !base.is_absolute() {
            exn::bail!(ErrorKind::InvalidName(base.display().to_string()));
        }
        if base.exists() {
            if !base.is_dir() {
                exn::bail!(ErrorKind::InvalidName(base.display().to_string()));
            }
        } else {
            fs::create_dir_all(&base).map_err(|e| Self::map_io_error(e, &base))?;
        }
        Ok(Self { name: name.into(), base })
    }

    fn absolute_path(&self, id: &FolderId) -> Result<PathBuf> {
        Ok(self.base.join(relative_path(id.as_str())?))
    }

    fn child_id(parent: &FolderId, name: &str) -> FolderId {
        FolderId::from(format!("{}/{}", parent.as_str(), name))
    }

    fn require_dir(&self, id: &FolderId) -> Result<PathBuf> {
        let path = self.absolute_path(id)?;
        if !path.is_dir() {
            exn::bail!(ErrorKind::NotFound(id.to_string()));
        }
        Ok(path)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        let display = path.display().to_string();
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(display),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(display),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(display),
            // A share that went away mid-operation is worth another go.
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted => ErrorKind::Network(e.to_string()),
            _ => ErrorKind::Io(e),
        }
    }
}

impl RemoteStore for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_root_folder(&self, name: &str) -> Result<RemoteFolder> {
        let name = validate_name(name)?;
        let id = FolderId::from(name);
        self.require_dir(&id)?;
        Ok(RemoteFolder::new(id, name))
    }

    fn child_folders_of(&self, folder: &RemoteFolder) -> Result<Vec<RemoteFolder>> {
        let path = self.require_dir(&folder.id)?;
        let mut folders = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| Self::map_io_error(e, &path))? {
            let entry = entry.map_err(|e| Self::map_io_error(e, &path))?;
            let file_type = entry.file_type().map_err(|e| Self::map_io_error(e, &entry.path()))?;
            if !file_type.is_dir() {
                continue;
            }
            // Note: silently drop directories whose names aren't UTF-8; they
            // can't be daily folders anyway.
            let Ok(name) = entry.file_name().into_string() else {
                tracing::trace!(path = %entry.path().display(), "Skipping non-UTF-8 folder name");
                continue;
            };
            folders.push(RemoteFolder::new(Self::child_id(&folder.id, &name), name));
        }
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    fn create_child_folder(&self, parent: &FolderId, name: &str) -> Result<RemoteFolder> {
        let name = validate_name(name)?;
        let parent_path = self.require_dir(parent)?;
        let path = parent_path.join(name);
        // Not create_dir_all: an existing folder must be reported, not reused.
        fs::create_dir(&path).map_err(|e| Self::map_io_error(e, &path))?;
        Ok(RemoteFolder::new(Self::child_id(parent, name), name))
    }

    fn delete_folder(&self, folder: &RemoteFolder) -> Result<()> {
        let path = self.absolute_path(&folder.id)?;
        Ok(fs::remove_dir_all(&path).map_err(|e| Self::map_io_error(e, &path))?)
    }

    fn upload_file(&self, parent: &FolderId, file_name: &str, content: &[u8]) -> Result<()> {
        let file_name = validate_name(file_name)?;
        let parent_path = self.require_dir(parent)?;
        let target = parent_path.join(file_name);
        // Write under a temporary name and rename into place, so that a
        // half-written file never shows up under its real name.
        let partial = parent_path.join(format!(".{file_name}.part"));
        let mut file = fs::File::create(&partial).map_err(|e| Self::map_io_error(e, &partial))?;
        file.write_all(content).map_err(|e| Self::map_io_error(e, &partial))?;
        file.sync_all().map_err(|e| Self::map_io_error(e, &partial))?;
        drop(file);
        Ok(fs::rename(&partial, &target).map_err(|e| Self::map_io_error(e, &target))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (TempDir, LocalBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path()).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_relative_base_rejected() {
        let err = LocalBackend::new("local", "relative/base").unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
    }

    #[test]
    fn test_base_created_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested/base");
        LocalBackend::new("local", &base).unwrap();
        assert!(base.is_dir());
    }

    #[test]
    fn test_root_folder_not_found() {
        let (_dir, backend) = backend();
        let err = backend.get_root_folder("camera").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_create_and_list_child_folders() {
        let (dir, backend) = backend();
        fs::create_dir(dir.path().join("camera")).unwrap();
        let root = backend.get_root_folder("camera").unwrap();
        assert_eq!(root.id.as_str(), "camera");

        let created = backend.create_child_folder(&root.id, "2019-01-02").unwrap();
        backend.create_child_folder(&root.id, "2019-01-01").unwrap();
        fs::write(dir.path().join("camera/stray.txt"), b"not a folder").unwrap();

        assert_eq!(created, RemoteFolder::new("camera/2019-01-02", "2019-01-02"));
        let names: Vec<_> = backend.child_folders_of(&root).unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["2019-01-01", "2019-01-02"]);
    }

    #[test]
    fn test_create_existing_folder() {
        let (dir, backend) = backend();
        fs::create_dir_all(dir.path().join("camera/2019-01-01")).unwrap();
        let root = backend.get_root_folder("camera").unwrap();
        let err = backend.create_child_folder(&root.id, "2019-01-01").unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));
    }

    #[test]
    fn test_create_under_missing_parent() {
        let (_dir, backend) = backend();
        let err = backend.create_child_folder(&FolderId::from("nope"), "2019-01-01").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_upload_and_delete() {
        let (dir, backend) = backend();
        fs::create_dir(dir.path().join("camera")).unwrap();
        let root = backend.get_root_folder("camera").unwrap();
        let daily = backend.create_child_folder(&root.id, "2019-01-01").unwrap();

        backend.upload_file(&daily.id, "20190101_1200.jpg", b"jpeg").unwrap();
        let uploaded = dir.path().join("camera/2019-01-01/20190101_1200.jpg");
        assert_eq!(fs::read(&uploaded).unwrap(), b"jpeg");
        assert!(!dir.path().join("camera/2019-01-01/.20190101_1200.jpg.part").exists());

        backend.delete_folder(&daily).unwrap();
        assert!(!uploaded.exists());
        let err = backend.delete_folder(&daily).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_upload_into_missing_folder() {
        let (_dir, backend) = backend();
        let err = backend.upload_file(&FolderId::from("camera/2019-01-01"), "a.jpg", b"x").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, backend) = backend();
        assert!(backend.get_root_folder("..").is_err());
        assert!(backend.upload_file(&FolderId::from("../escape"), "a.jpg", b"x").is_err());
        assert!(backend.delete_folder(&RemoteFolder::new("../escape", "escape")).is_err());
    }
}
