//! In-memory remote store for testing.

use crate::error::{ErrorKind, Result};
use crate::validate::name as validate_name;
use crate::{FolderId, RemoteFolder, RemoteStore};
use exn::OptionExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Remote store operations, for counting calls and injecting faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetRootFolder,
    ChildFoldersOf,
    CreateChildFolder,
    DeleteFolder,
    UploadFile,
}

/// Failure to inject into the next call of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Transient: the remote end is throttling.
    RateLimited,
    /// Transient: the connection dropped.
    Network,
    /// Permanent: the backend refused the request.
    Fatal,
}
impl Fault {
    fn into_kind(self, op: Operation) -> ErrorKind {
        let message = format!("injected fault in {op:?}");
        match self {
            Self::RateLimited => ErrorKind::RateLimited(message),
            Self::Network => ErrorKind::Network(message),
            Self::Fatal => ErrorKind::BackendError(message),
        }
    }
}

struct Entry {
    name: String,
    parent: Option<FolderId>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    folders: HashMap<FolderId, Entry>,
    files: HashMap<(FolderId, String), Vec<u8>>,
    faults: HashMap<Operation, VecDeque<Fault>>,
    calls: HashMap<Operation, usize>,
}
impl State {
    fn insert(&mut self, parent: Option<FolderId>, name: &str) -> RemoteFolder {
        self.next_id += 1;
        let id = FolderId::from(format!("mock-{}", self.next_id));
        self.folders.insert(id.clone(), Entry { name: name.to_string(), parent });
        RemoteFolder::new(id, name)
    }

    fn find(&self, parent: Option<&FolderId>, name: &str) -> Option<RemoteFolder> {
        self.folders
            .iter()
            .find(|(_, entry)| entry.parent.as_ref() == parent && entry.name == name)
            .map(|(id, entry)| RemoteFolder::new(id.clone(), entry.name.clone()))
    }

    fn children(&self, parent: &FolderId) -> Vec<RemoteFolder> {
        let mut children: Vec<_> = self
            .folders
            .iter()
            .filter(|(_, entry)| entry.parent.as_ref() == Some(parent))
            .map(|(id, entry)| RemoteFolder::new(id.clone(), entry.name.clone()))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Record the call, then fail it if a fault has been queued.
    fn enter(&mut self, op: Operation) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(fault) => exn::bail!(fault.into_kind(op)),
            None => Ok(()),
        }
    }
}

/// In-memory remote store for testing.
///
/// Folders live in a `HashMap` behind a [`Mutex`] and are given identifiers
/// of the form `mock-N`. Faults can be queued per operation to exercise
/// retry and error paths, and every call is counted so tests can assert on
/// how often the remote store was actually hit.
///
/// # Examples
///
/// ```
/// use hoard_storage::RemoteStore;
/// use hoard_storage::backend::{Fault, MockBackend, Operation};
///
/// let backend = MockBackend::with_folders("camera", ["2019-01-01", "2019-01-02"]);
/// let root = backend.get_root_folder("camera").unwrap();
/// assert_eq!(backend.child_folders_of(&root).unwrap().len(), 2);
///
/// backend.fail_next(Operation::ChildFoldersOf, Fault::Network);
/// assert!(backend.child_folders_of(&root).is_err());
/// assert_eq!(backend.calls(Operation::ChildFoldersOf), 2);
/// ```
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock backend containing a single, empty root folder.
    pub fn with_root(root: &str) -> Self {
        Self::with_folders(root, [] as [&str; 0])
    }

    /// Create a mock backend containing a root folder with the given children.
    pub fn with_folders<'a>(root: &str, children: impl IntoIterator<Item = &'a str>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock();
            let root = state.insert(None, root);
            for child in children {
                state.insert(Some(root.id.clone()), child);
            }
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a fault for the next call of `op`. Faults queued for the same
    /// operation fire in order, one per call.
    pub fn fail_next(&self, op: Operation, fault: Fault) {
        self.lock().faults.entry(op).or_default().push_back(fault);
    }

    /// Number of times `op` has been called, including failed calls.
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or_default()
    }

    /// Names of the folders directly beneath the named root, sorted.
    pub fn folder_names(&self, root: &str) -> Vec<String> {
        let state = self.lock();
        state
            .find(None, root)
            .map(|root| state.children(&root.id).into_iter().map(|f| f.name).collect())
            .unwrap_or_default()
    }

    /// Names of the files uploaded into `folder` beneath the named root,
    /// sorted.
    pub fn files_in(&self, root: &str, folder: &str) -> Vec<String> {
        let state = self.lock();
        let Some(folder) = state.find(None, root).and_then(|root| state.find(Some(&root.id), folder)) else {
            return Vec::new();
        };
        let mut names: Vec<_> = state
            .files
            .keys()
            .filter(|(parent, _)| *parent == folder.id)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl RemoteStore for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn get_root_folder(&self, name: &str) -> Result<RemoteFolder> {
        let mut state = self.lock();
        state.enter(Operation::GetRootFolder)?;
        Ok(state.find(None, name).ok_or_raise(|| ErrorKind::NotFound(name.to_string()))?)
    }

    fn child_folders_of(&self, folder: &RemoteFolder) -> Result<Vec<RemoteFolder>> {
        let mut state = self.lock();
        state.enter(Operation::ChildFoldersOf)?;
        if !state.folders.contains_key(&folder.id) {
            exn::bail!(ErrorKind::NotFound(folder.id.to_string()));
        }
        Ok(state.children(&folder.id))
    }

    fn create_child_folder(&self, parent: &FolderId, name: &str) -> Result<RemoteFolder> {
        let mut state = self.lock();
        state.enter(Operation::CreateChildFolder)?;
        let name = validate_name(name)?;
        if !state.folders.contains_key(parent) {
            exn::bail!(ErrorKind::NotFound(parent.to_string()));
        }
        if state.find(Some(parent), name).is_some() {
            exn::bail!(ErrorKind::AlreadyExists(name.to_string()));
        }
        Ok(state.insert(Some(parent.clone()), name))
    }

    fn delete_folder(&self, folder: &RemoteFolder) -> Result<()> {
        let mut state = self.lock();
        state.enter(Operation::DeleteFolder)?;
        if !state.folders.contains_key(&folder.id) {
            exn::bail!(ErrorKind::NotFound(folder.id.to_string()));
        }
        let mut pending = vec![folder.id.clone()];
        while let Some(id) = pending.pop() {
            pending.extend(state.children(&id).into_iter().map(|child| child.id));
            state.files.retain(|(parent, _), _| *parent != id);
            state.folders.remove(&id);
        }
        Ok(())
    }

    fn upload_file(&self, parent: &FolderId, file_name: &str, content: &[u8]) -> Result<()> {
        let mut state = self.lock();
        state.enter(Operation::UploadFile)?;
        let file_name = validate_name(file_name)?;
        if !state.folders.contains_key(parent) {
            exn::bail!(ErrorKind::NotFound(parent.to_string()));
        }
        state.files.insert((parent.clone(), file_name.to_string()), content.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_tree() {
        let backend = MockBackend::with_root("camera");
        let root = backend.get_root_folder("camera").unwrap();
        let daily = backend.create_child_folder(&root.id, "2019-01-01").unwrap();
        assert_eq!(daily.name, "2019-01-01");
        assert_ne!(daily.id, root.id);

        let err = backend.create_child_folder(&root.id, "2019-01-01").unwrap_err();
        assert!(matches!(&*err, ErrorKind::AlreadyExists(_)));

        backend.upload_file(&daily.id, "a.jpg", b"a").unwrap();
        assert_eq!(backend.files_in("camera", "2019-01-01"), vec!["a.jpg"]);

        backend.delete_folder(&daily).unwrap();
        assert!(backend.folder_names("camera").is_empty());
        assert!(backend.files_in("camera", "2019-01-01").is_empty());
    }

    #[test]
    fn test_missing_root() {
        let backend = MockBackend::new();
        let err = backend.get_root_folder("camera").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_faults_fire_in_order() {
        let backend = MockBackend::with_folders("camera", ["2019-01-01"]);
        backend.fail_next(Operation::GetRootFolder, Fault::RateLimited);
        backend.fail_next(Operation::GetRootFolder, Fault::Fatal);

        let first = backend.get_root_folder("camera").unwrap_err();
        assert!(first.is_retryable());
        let second = backend.get_root_folder("camera").unwrap_err();
        assert!(matches!(&*second, ErrorKind::BackendError(_)));
        assert!(backend.get_root_folder("camera").is_ok());
        assert_eq!(backend.calls(Operation::GetRootFolder), 3);
        assert_eq!(backend.calls(Operation::UploadFile), 0);
    }

    #[test]
    fn test_upload_into_missing_folder() {
        let backend = MockBackend::with_root("camera");
        let err = backend.upload_file(&FolderId::from("mock-99"), "a.jpg", b"a").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
