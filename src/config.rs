use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::error::Error;
use crate::scan::{DEFAULT_EXTENSIONS, PlaybackOrder, ScanOptions};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Directory the slideshow images are read from.
    pub photo_library_path: PathBuf,
    /// Descend into subdirectories when scanning.
    pub recursive: bool,
    /// Maximum recursion depth for recursive scans (`0` = unlimited).
    pub max_depth: Option<usize>,
    /// Image file extensions to include, case-insensitive.
    pub extensions: Vec<String>,
    /// Order in which images are shown.
    pub order: PlaybackOrder,
    /// Optional deterministic seed for `order: shuffled`.
    pub shuffle_seed: Option<u64>,
    /// Time each image stays on screen before the slideshow advances.
    #[serde(with = "humantime_serde")]
    pub advance_interval: Duration,
    /// How often the photo directory is re-scanned.
    #[serde(with = "humantime_serde")]
    pub rescan_interval: Duration,
    /// Also rescan promptly when the filesystem reports changes.
    pub watch: bool,
    /// HTTP server options.
    pub server: ServerOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerOptions {
    pub bind_address: SocketAddr,
    /// Title of the slideshow page.
    pub title: String,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            !self.advance_interval.is_zero(),
            "advance-interval must be greater than zero"
        );
        ensure!(
            !self.rescan_interval.is_zero(),
            "rescan-interval must be greater than zero"
        );
        self.extensions = normalize_extensions(&self.extensions);
        ensure!(
            !self.extensions.is_empty(),
            "extensions must list at least one file extension"
        );
        Ok(self)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            root: self.photo_library_path.clone(),
            recursive: self.recursive,
            max_depth: self.max_depth,
            extensions: self.extensions.clone(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::from("photos"),
            recursive: false,
            max_depth: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            order: PlaybackOrder::default(),
            shuffle_seed: None,
            advance_interval: Duration::from_secs(4),
            rescan_interval: Duration::from_secs(30),
            watch: true,
            server: ServerOptions::default(),
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 3000)),
            title: "Image Slideshow".to_string(),
        }
    }
}

fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for ext in raw {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::normalize_extensions;

    #[test]
    fn extensions_are_lowercased_and_deduplicated() {
        let raw = vec![".JPG".to_string(), "jpg".to_string(), " webp ".to_string()];
        assert_eq!(normalize_extensions(&raw), vec!["jpg", "webp"]);
    }

    #[test]
    fn blank_extensions_are_dropped() {
        let raw = vec![".".to_string(), String::new()];
        assert!(normalize_extensions(&raw).is_empty());
    }
}
