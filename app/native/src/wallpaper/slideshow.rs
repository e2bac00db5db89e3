//! Slideshow manifest and rotation.
//!
//! The manifest is a JSON array of image paths stored inside the pictures
//! folder. It is written once, the first time the slideshow is used, and is
//! never rescanned while it exists. Rotation pops from a shuffled in-memory
//! queue kept in [`SharedState`].

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::future::BoxFuture;
use rand::seq::SliceRandom;
use thiserror::Error;

use super::shared::SharedState;
use crate::constants::is_slideshow_candidate;
use crate::platform::fs::{FileStore, FileStoreError};
use crate::platform::path::{absolutize, join};

/// Errors raised while building or reading the manifest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlideshowError {
    /// The file store failed.
    #[error(transparent)]
    FileStore(#[from] FileStoreError),
    /// The manifest is not a JSON array of strings.
    #[error("Invalid slideshow manifest at {path}: {message}")]
    Manifest {
        /// Manifest path.
        path: String,
        /// Parser message.
        message: String,
    },
}

/// One rotation step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextImage {
    /// Absolute URL to show. Empty when the manifest has no images.
    pub url: String,
    /// URL worth preloading for the following step.
    pub preload: Option<String>,
}

/// Discovers, persists and rotates slideshow images.
pub struct SlideshowCache {
    files: Arc<dyn FileStore>,
    shared: Arc<SharedState>,
    folder: String,
    manifest_file: String,
}

impl SlideshowCache {
    /// Creates a cache over `folder`, persisting to `folder/manifest_file`.
    #[must_use]
    pub fn new(
        files: Arc<dyn FileStore>,
        shared: Arc<SharedState>,
        folder: &str,
        manifest_file: &str,
    ) -> Self {
        Self {
            files,
            shared,
            folder: folder.to_string(),
            manifest_file: manifest_file.to_string(),
        }
    }

    /// Full manifest path.
    #[must_use]
    pub fn manifest_path(&self) -> String { join(&self.folder, &self.manifest_file) }

    /// Writes the manifest if it does not exist yet. Returns whether it wrote.
    ///
    /// # Errors
    ///
    /// Returns an error if the file store fails.
    pub async fn ensure_manifest(&self) -> Result<bool, SlideshowError> {
        let manifest_path = self.manifest_path();

        if self.files.exists(&manifest_path).await? {
            return Ok(false);
        }

        let images = if self.files.exists(&self.folder).await? {
            self.collect_images(self.folder.clone()).await?
        } else {
            Vec::new()
        };

        let body = serde_json::to_vec(&images).map_err(|err| SlideshowError::Manifest {
            path: manifest_path.clone(),
            message: err.to_string(),
        })?;

        self.files.write_file(&manifest_path, body).await?;
        self.files.update_folder(&self.folder, &self.manifest_file);
        tracing::info!(count = images.len(), path = %manifest_path, "wrote slideshow manifest");

        Ok(true)
    }

    /// Walks `dir` recursively, collecting slideshow candidates.
    fn collect_images(&self, dir: String) -> BoxFuture<'_, Result<Vec<String>, SlideshowError>> {
        Box::pin(async move {
            let mut images = Vec::new();

            for entry in self.files.readdir(&dir).await? {
                let entry_path = join(&dir, &entry);

                if self.files.lstat(&entry_path).await?.is_directory {
                    images.extend(self.collect_images(entry_path).await?);
                } else if is_slideshow_candidate(&entry_path) {
                    images.push(entry_path);
                }
            }

            Ok(images)
        })
    }

    async fn read_manifest(&self) -> Result<Vec<String>, SlideshowError> {
        let manifest_path = self.manifest_path();
        let data = self.files.read_file(&manifest_path).await?;

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&data).map_err(|err| SlideshowError::Manifest {
            path: manifest_path,
            message: err.to_string(),
        })
    }

    /// Deduplicated and shuffled manifest entries.
    async fn shuffled_manifest(&self) -> Result<VecDeque<String>, SlideshowError> {
        let mut seen = HashSet::new();
        let mut paths = self
            .read_manifest()
            .await?
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .collect::<Vec<_>>();

        paths.shuffle(&mut rand::rng());
        Ok(paths.into())
    }

    /// Pops the next image, avoiding `current` when another image exists.
    ///
    /// The queue is refilled from the manifest when empty. Site-root-relative
    /// paths are rewritten onto `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read.
    pub async fn next_image(&self, current: Option<&str>, origin: &str) -> Result<NextImage, SlideshowError> {
        if self.shared.with_slideshow_queue(|queue| queue.is_empty()) {
            let fresh = self.shuffled_manifest().await?;
            self.shared.with_slideshow_queue(|queue| {
                if queue.is_empty() {
                    *queue = fresh;
                }
            });
        }

        let mut next = self.pop(current, origin);

        if next.url.is_empty() || current != Some(next.url.as_str()) {
            return Ok(next);
        }

        // The queue ran dry on the current image. Start a new round without it.
        let mut fresh = self.shuffled_manifest().await?;
        let other = fresh.iter().position(|path| absolutize(path, origin) != next.url);

        if let Some(path) = other.and_then(|index| fresh.remove(index)) {
            next.url = absolutize(&path, origin);
            next.preload = fresh.front().map(|path| absolutize(path, origin));
            self.shared.with_slideshow_queue(|queue| *queue = fresh);
        }

        Ok(next)
    }

    fn pop(&self, current: Option<&str>, origin: &str) -> NextImage {
        self.shared.with_slideshow_queue(|queue| {
            let mut url = queue.pop_front().map(|path| absolutize(&path, origin)).unwrap_or_default();

            if current == Some(url.as_str())
                && let Some(path) = queue.pop_front()
            {
                url = absolutize(&path, origin);
            }

            NextImage {
                url,
                preload: queue.front().map(|path| absolutize(path, origin)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fs::MemoryFileStore;

    const FOLDER: &str = "/Users/Public/Pictures";
    const ORIGIN: &str = "http://localhost";

    fn cache(files: &MemoryFileStore) -> SlideshowCache {
        SlideshowCache::new(
            Arc::new(files.clone()),
            Arc::new(SharedState::new()),
            FOLDER,
            "slideshow.json",
        )
    }

    #[tokio::test]
    async fn test_missing_folder_writes_empty_manifest() {
        let files = MemoryFileStore::new();
        let cache = cache(&files);

        assert!(cache.ensure_manifest().await.unwrap());
        assert_eq!(files.contents("/Users/Public/Pictures/slideshow.json").unwrap(), b"[]");
        assert_eq!(
            files.folder_updates(),
            vec![(FOLDER.to_string(), "slideshow.json".to_string())]
        );

        let next = cache.next_image(None, ORIGIN).await.unwrap();
        assert_eq!(next, NextImage::default());
    }

    #[tokio::test]
    async fn test_manifest_is_written_once() {
        let files = MemoryFileStore::new();
        files.add_file("/Users/Public/Pictures/a.jpg", b"a".to_vec());
        let cache = cache(&files);

        assert!(cache.ensure_manifest().await.unwrap());
        files.add_file("/Users/Public/Pictures/b.jpg", b"b".to_vec());
        assert!(!cache.ensure_manifest().await.unwrap());
        assert_eq!(files.writes(), 1);
    }

    #[tokio::test]
    async fn test_walk_filters_and_recurses() {
        let files = MemoryFileStore::new();
        files.add_file("/Users/Public/Pictures/a.jpg", b"a".to_vec());
        files.add_file("/Users/Public/Pictures/icon.ico", b"i".to_vec());
        files.add_file("/Users/Public/Pictures/notes.txt", b"n".to_vec());
        files.add_file("/Users/Public/Pictures/Trips/b.PNG", b"b".to_vec());
        files.add_file("/Users/Public/Pictures/clip.mp4", b"v".to_vec());
        let cache = cache(&files);

        cache.ensure_manifest().await.unwrap();
        let manifest: Vec<String> =
            serde_json::from_slice(&files.contents(&cache.manifest_path()).unwrap()).unwrap();
        assert_eq!(
            manifest,
            vec![
                "/Users/Public/Pictures/Trips/b.PNG".to_string(),
                "/Users/Public/Pictures/a.jpg".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_rotation_never_repeats_with_two_images() {
        let files = MemoryFileStore::new();
        files.add_file(
            "/Users/Public/Pictures/slideshow.json",
            br#"["/Users/Public/Pictures/a.jpg", "/Users/Public/Pictures/b.jpg", "/Users/Public/Pictures/a.jpg"]"#.to_vec(),
        );
        let cache = cache(&files);

        let mut previous = cache.next_image(None, ORIGIN).await.unwrap().url;
        for _ in 0..20 {
            let next = cache.next_image(Some(&previous), ORIGIN).await.unwrap().url;
            assert_ne!(next, previous);
            assert!(next.starts_with("http://localhost/Users/Public/Pictures/"));
            previous = next;
        }
    }

    #[tokio::test]
    async fn test_single_image_repeats() {
        let files = MemoryFileStore::new();
        files.add_file("/Users/Public/Pictures/slideshow.json", br#"["/only.jpg"]"#.to_vec());
        let cache = cache(&files);

        let first = cache.next_image(None, ORIGIN).await.unwrap();
        let second = cache.next_image(Some(&first.url), ORIGIN).await.unwrap();
        assert_eq!(first.url, "http://localhost/only.jpg");
        assert_eq!(second.url, first.url);
        assert_eq!(second.preload, None);
    }

    #[tokio::test]
    async fn test_preload_points_at_following_image() {
        let files = MemoryFileStore::new();
        files.add_file(
            "/Users/Public/Pictures/slideshow.json",
            br#"["https://x.test/1.jpg", "https://x.test/2.jpg", "https://x.test/3.jpg"]"#.to_vec(),
        );
        let cache = cache(&files);

        let first = cache.next_image(None, ORIGIN).await.unwrap();
        let second = cache.next_image(Some(&first.url), ORIGIN).await.unwrap();
        assert_eq!(first.preload.as_deref(), Some(second.url.as_str()));
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_an_error() {
        let files = MemoryFileStore::new();
        files.add_file("/Users/Public/Pictures/slideshow.json", b"{".to_vec());
        let result = cache(&files).next_image(None, ORIGIN).await;
        assert!(matches!(result, Err(SlideshowError::Manifest { .. })));
    }
}
