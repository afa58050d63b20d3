//! Shared slideshow state: the image list and the index of the image on screen.
//!
//! A single mutex guards both fields so readers always observe an index that
//! is valid for the list they see. Every operation takes the lock once and
//! releases it before returning; nothing holds it across I/O or `.await`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Inner {
    images: Vec<PathBuf>,
    index: usize,
    revision: u64,
}

impl Inner {
    fn current(&self) -> Option<PathBuf> {
        self.images.get(self.index).cloned()
    }
}

/// Clonable handle to the shared slideshow.
#[derive(Debug, Clone, Default)]
pub struct Slideshow {
    inner: Arc<Mutex<Inner>>,
}

/// Consistent copy of the slideshow taken under a single lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub images: Vec<PathBuf>,
    pub index: usize,
    pub revision: u64,
}

impl Snapshot {
    pub fn current(&self) -> Option<&Path> {
        self.images.get(self.index).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl Slideshow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(images: Vec<PathBuf>) -> Self {
        let show = Self::new();
        show.replace_images(images);
        show
    }

    /// Install a freshly scanned list.
    ///
    /// Returns `false` when the list is unchanged. Otherwise the index follows
    /// the current image if it survived the rescan, or is clamped to the new
    /// list's bounds.
    pub fn replace_images(&self, images: Vec<PathBuf>) -> bool {
        let mut inner = self.inner.lock();
        if inner.images == images {
            return false;
        }
        let survivor = inner
            .images
            .get(inner.index)
            .and_then(|current| images.iter().position(|p| p == current));
        inner.index = match survivor {
            Some(pos) => pos,
            None if images.is_empty() => 0,
            None => inner.index.min(images.len() - 1),
        };
        inner.images = images;
        inner.revision += 1;
        true
    }

    /// Move to the next image, wrapping at the end.
    pub fn advance(&self) -> Option<PathBuf> {
        let mut inner = self.inner.lock();
        if inner.images.is_empty() {
            return None;
        }
        inner.index = (inner.index + 1) % inner.images.len();
        inner.current()
    }

    /// Move to the previous image, wrapping at the start.
    pub fn step_back(&self) -> Option<PathBuf> {
        let mut inner = self.inner.lock();
        let len = inner.images.len();
        if len == 0 {
            return None;
        }
        inner.index = (inner.index + len - 1) % len;
        inner.current()
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.inner.lock().current()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.lock().images.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().images.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock();
        Snapshot {
            images: inner.images.clone(),
            index: inner.index,
            revision: inner.revision,
        }
    }
}
