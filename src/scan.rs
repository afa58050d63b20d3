//! Directory scanning utilities for discovering image files.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Extensions accepted when the configuration does not override them.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Options controlling directory scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory the slideshow is built from.
    pub root: PathBuf,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional maximum recursion depth. `None` or `Some(0)` means unlimited.
    pub max_depth: Option<usize>,
    /// Allowed extensions (lowercase, without dot).
    pub extensions: Vec<String>,
}

impl ScanOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            max_depth: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Display order applied on top of the sorted scan result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackOrder {
    #[default]
    Sorted,
    Shuffled,
}

/// Return `true` if `path` has an allowed image extension.
#[must_use]
pub fn is_supported_image(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        })
}

/// Scan `opts.root` for images.
///
/// Returned paths are relative to the root and sorted, so two scans of an
/// unchanged directory produce identical lists.
///
/// # Errors
/// Returns [`Error::BadDir`] if the root is missing or not a directory.
pub fn scan_images(opts: &ScanOptions) -> Result<Vec<PathBuf>, Error> {
    let root = &opts.root;
    if !root.is_dir() {
        return Err(Error::BadDir(root.to_string_lossy().into_owned()));
    }

    let mut wd = WalkDir::new(root).follow_links(true);
    if !opts.recursive {
        wd = wd.max_depth(1);
    } else if let Some(d) = opts.max_depth
        && d > 0
    {
        wd = wd.max_depth(d);
    }

    let mut out = Vec::new();
    for entry in wd
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if !is_supported_image(path, &opts.extensions) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        if rel.to_str().is_none() {
            debug!(path = %path.display(), "skipping non-UTF-8 path");
            continue;
        }
        out.push(rel.to_path_buf());
    }

    out.sort();
    Ok(out)
}

/// Apply the playback order to a sorted scan result.
///
/// Shuffling is seeded so that rescans of an unchanged directory keep the
/// same order.
pub fn arrange(images: &mut [PathBuf], order: PlaybackOrder, seed: u64) {
    match order {
        PlaybackOrder::Sorted => {}
        PlaybackOrder::Shuffled => {
            let mut rng = StdRng::seed_from_u64(seed);
            images.shuffle(&mut rng);
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a/B.JPG"), &exts()));
        assert!(is_supported_image(Path::new("c.Png"), &exts()));
        assert!(!is_supported_image(Path::new("notes.txt"), &exts()));
        assert!(!is_supported_image(Path::new("jpg"), &exts()));
    }

    #[test]
    fn sorted_order_is_untouched() {
        let mut images = vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")];
        arrange(&mut images, PlaybackOrder::Sorted, 42);
        assert_eq!(images, vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
    }
}
