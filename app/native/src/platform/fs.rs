//! File-store service contract.
//!
//! The wallpaper engine only touches files through [`FileStore`]: slideshow
//! discovery and the manifest, and reading File-mode wallpapers. Paths are
//! virtual POSIX paths joined by concatenation (see [`crate::platform::path::join`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;

/// Errors reported by a file store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileStoreError {
    /// The path does not exist.
    #[error("No such file or directory: {0}")]
    NotFound(String),
    /// A file was expected but a directory was found, or the reverse.
    #[error("Wrong entry kind at {0}")]
    WrongKind(String),
    /// Backend I/O failure.
    #[error("I/O failure at {path}: {message}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Backend message.
        message: String,
    },
}

/// Result of [`FileStore::lstat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Whether the entry is a directory.
    pub is_directory: bool,
}

/// Boxed future returned by file-store operations.
pub type FileStoreFuture<'a, T> = BoxFuture<'a, Result<T, FileStoreError>>;

/// Host file store.
pub trait FileStore: Send + Sync {
    /// Whether `path` exists.
    fn exists<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, bool>;

    /// Stats `path` without following links.
    fn lstat<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, FileStat>;

    /// Lists entry names (not paths) inside a directory.
    fn readdir<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, Vec<String>>;

    /// Reads a whole file.
    fn read_file<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, Vec<u8>>;

    /// Writes a whole file, creating it if needed.
    fn write_file<'a>(&'a self, path: &'a str, data: Vec<u8>) -> FileStoreFuture<'a, ()>;

    /// Notifies listeners that `filename` inside `dir` changed.
    fn update_folder(&self, dir: &str, filename: &str);
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Arc<Vec<u8>>),
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: BTreeMap<String, Node>,
    writes: usize,
    folder_updates: Vec<(String, String)>,
}

/// In-memory file store.
///
/// Used by tests and by hosts that keep their virtual file system elsewhere
/// and only mirror the pictures folder.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    state: Arc<Mutex<MemoryState>>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
}

fn parent_of(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) if path.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(index) => Some(&path[..index]),
    }
}

impl MemoryFileStore {
    /// Creates an empty store containing only `/`.
    #[must_use]
    pub fn new() -> Self {
        let store = Self::default();
        store.state.lock().nodes.insert("/".to_string(), Node::Dir);
        store
    }

    /// Creates a directory and all missing parents.
    pub fn add_dir(&self, path: &str) {
        let mut state = self.state.lock();
        Self::insert_dirs(&mut state.nodes, &normalize(path));
    }

    /// Creates a file and all missing parent directories.
    pub fn add_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        let path = normalize(path);
        let mut state = self.state.lock();
        if let Some(parent) = parent_of(&path) {
            Self::insert_dirs(&mut state.nodes, parent);
        }
        state.nodes.insert(path, Node::File(Arc::new(data.into())));
    }

    /// Number of completed `write_file` calls.
    #[must_use]
    pub fn writes(&self) -> usize { self.state.lock().writes }

    /// Change notifications received through `update_folder`.
    #[must_use]
    pub fn folder_updates(&self) -> Vec<(String, String)> { self.state.lock().folder_updates.clone() }

    /// Reads a file synchronously.
    #[must_use]
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.state.lock().nodes.get(&normalize(path)) {
            Some(Node::File(data)) => Some(data.as_ref().clone()),
            _ => None,
        }
    }

    fn insert_dirs(nodes: &mut BTreeMap<String, Node>, path: &str) {
        let mut current = String::new();
        nodes.entry("/".to_string()).or_insert(Node::Dir);
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            nodes.entry(current.clone()).or_insert(Node::Dir);
        }
    }

    fn stat_sync(&self, path: &str) -> Result<FileStat, FileStoreError> {
        match self.state.lock().nodes.get(&normalize(path)) {
            Some(Node::Dir) => Ok(FileStat { is_directory: true }),
            Some(Node::File(_)) => Ok(FileStat { is_directory: false }),
            None => Err(FileStoreError::NotFound(path.to_string())),
        }
    }

    fn readdir_sync(&self, path: &str) -> Result<Vec<String>, FileStoreError> {
        let dir = normalize(path);
        let state = self.state.lock();

        match state.nodes.get(&dir) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => return Err(FileStoreError::WrongKind(path.to_string())),
            None => return Err(FileStoreError::NotFound(path.to_string())),
        }

        let prefix = if dir == "/" { dir.clone() } else { format!("{dir}/") };
        Ok(state
            .nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn read_sync(&self, path: &str) -> Result<Vec<u8>, FileStoreError> {
        match self.state.lock().nodes.get(&normalize(path)) {
            Some(Node::File(data)) => Ok(data.as_ref().clone()),
            Some(Node::Dir) => Err(FileStoreError::WrongKind(path.to_string())),
            None => Err(FileStoreError::NotFound(path.to_string())),
        }
    }
}

impl FileStore for MemoryFileStore {
    fn exists<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.state.lock().nodes.contains_key(&normalize(path))) })
    }

    fn lstat<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, FileStat> {
        Box::pin(async move { self.stat_sync(path) })
    }

    fn readdir<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, Vec<String>> {
        Box::pin(async move { self.readdir_sync(path) })
    }

    fn read_file<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, Vec<u8>> {
        Box::pin(async move { self.read_sync(path) })
    }

    fn write_file<'a>(&'a self, path: &'a str, data: Vec<u8>) -> FileStoreFuture<'a, ()> {
        Box::pin(async move {
            if matches!(self.stat_sync(path), Ok(FileStat { is_directory: true })) {
                return Err(FileStoreError::WrongKind(path.to_string()));
            }
            self.add_file(path, data);
            self.state.lock().writes += 1;
            Ok(())
        })
    }

    fn update_folder(&self, dir: &str, filename: &str) {
        self.state.lock().folder_updates.push((dir.to_string(), filename.to_string()));
    }
}

/// File store rooted at a directory on the real disk.
///
/// Virtual `/a/b` maps to `<root>/a/b`. Blocking I/O runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    fn resolve(&self, path: &str) -> PathBuf { self.root.join(path.trim_start_matches('/')) }

    async fn blocking<T, F>(&self, path: &str, op: F) -> Result<T, FileStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> std::io::Result<T> + Send + 'static,
    {
        let full = self.resolve(path);
        let virtual_path = path.to_string();

        let joined = tokio::task::spawn_blocking(move || op(&full)).await.map_err(|err| {
            FileStoreError::Io {
                path: virtual_path.clone(),
                message: err.to_string(),
            }
        })?;

        joined.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => FileStoreError::NotFound(virtual_path),
            _ => FileStoreError::Io {
                path: virtual_path,
                message: err.to_string(),
            },
        })
    }
}

impl FileStore for DiskFileStore {
    fn exists<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, bool> {
        Box::pin(self.blocking(path, |full| Ok(full.symlink_metadata().is_ok())))
    }

    fn lstat<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, FileStat> {
        Box::pin(self.blocking(path, |full| {
            let metadata = std::fs::symlink_metadata(full)?;
            Ok(FileStat {
                is_directory: metadata.is_dir(),
            })
        }))
    }

    fn readdir<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, Vec<String>> {
        Box::pin(self.blocking(path, |full| {
            let mut names = std::fs::read_dir(full)?
                .filter_map(Result::ok)
                .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
                .collect::<Vec<_>>();
            names.sort();
            Ok(names)
        }))
    }

    fn read_file<'a>(&'a self, path: &'a str) -> FileStoreFuture<'a, Vec<u8>> {
        Box::pin(self.blocking(path, |full| std::fs::read(full)))
    }

    fn write_file<'a>(&'a self, path: &'a str, data: Vec<u8>) -> FileStoreFuture<'a, ()> {
        Box::pin(self.blocking(path, move |full| {
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, data)
        }))
    }

    fn update_folder(&self, dir: &str, filename: &str) {
        tracing::trace!(dir, filename, "folder changed");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_memory_store_lists_immediate_children() {
        let store = MemoryFileStore::new();
        store.add_file("/Pictures/a.png", b"a".to_vec());
        store.add_file("/Pictures/nested/b.png", b"b".to_vec());

        let entries = store.readdir("/Pictures").await.unwrap();
        assert_eq!(entries, vec!["a.png".to_string(), "nested".to_string()]);
        assert!(store.lstat("/Pictures/nested").await.unwrap().is_directory);
        assert!(!store.lstat("/Pictures/a.png").await.unwrap().is_directory);
    }

    #[tokio::test]
    async fn test_memory_store_missing_paths() {
        let store = MemoryFileStore::new();
        assert!(!store.exists("/nope").await.unwrap());
        assert_eq!(
            store.read_file("/nope").await,
            Err(FileStoreError::NotFound("/nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_memory_store_counts_writes() {
        let store = MemoryFileStore::new();
        store.write_file("/a/b.json", b"[]".to_vec()).await.unwrap();
        assert_eq!(store.writes(), 1);
        assert!(store.exists("/a").await.unwrap());
        assert_eq!(store.contents("/a/b.json").unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_memory_store_refuses_writing_over_directory() {
        let store = MemoryFileStore::new();
        store.add_dir("/a");
        let result = store.write_file("/a", Vec::new()).await;
        assert!(matches!(result, Err(FileStoreError::WrongKind(_))));
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_disk_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = DiskFileStore::new(temp_dir.path());

        store.write_file("/Pictures/one.png", vec![1, 2, 3]).await.unwrap();
        assert!(store.exists("/Pictures").await.unwrap());
        assert!(store.lstat("/Pictures").await.unwrap().is_directory);
        assert_eq!(store.readdir("/Pictures").await.unwrap(), vec!["one.png".to_string()]);
        assert_eq!(store.read_file("/Pictures/one.png").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            store.read_file("/Pictures/two.png").await,
            Err(FileStoreError::NotFound(_))
        ));
    }
}
