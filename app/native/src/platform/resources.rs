//! Displayable resource handles for in-memory buffers.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

/// Scheme prefix of every handle issued by a [`ResourceStore`].
pub const HANDLE_SCHEME: &str = "blob:";

/// Whether `url` is a resource handle rather than a network or file URL.
#[must_use]
pub fn is_handle(url: &str) -> bool { url.starts_with(HANDLE_SCHEME) }

/// Registry of live `blob:` handles.
///
/// A handle keeps its buffer alive until it is revoked.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    buffers: Arc<DashMap<String, Arc<Vec<u8>>>>,
}

impl ResourceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Registers `data` and returns its handle.
    pub fn create(&self, data: Vec<u8>) -> String {
        let handle = format!("{HANDLE_SCHEME}backdrop/{}", Uuid::now_v7());
        self.buffers.insert(handle.clone(), Arc::new(data));
        handle
    }

    /// Buffer behind `handle`.
    #[must_use]
    pub fn get(&self, handle: &str) -> Option<Arc<Vec<u8>>> {
        self.buffers.get(handle).map(|entry| Arc::clone(entry.value()))
    }

    /// Releases `handle`. Returns whether it was live.
    pub fn revoke(&self, handle: &str) -> bool {
        let revoked = self.buffers.remove(handle).is_some();
        if revoked {
            tracing::trace!(handle, "revoked resource handle");
        }
        revoked
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize { self.buffers.len() }

    /// Whether no handles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buffers.is_empty() }
}
