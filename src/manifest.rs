//! Playlist for ffmpeg's concat demuxer.
//!
//! ```text
//! file '/tmp/image-00-<id>.jpg'
//! duration 5.000
//! file '/tmp/image-01-<id>.jpg'
//! duration 5.000
//! file '/tmp/image-01-<id>.jpg'
//! ```
//!
//! The demuxer ignores the duration of the final entry, so the last image is
//! listed once more without one.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::RenderError;
use crate::logd;

/// Shortest display time handed to the encoder for a single image.
pub const MIN_IMAGE_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatManifest {
    entries: Vec<ManifestEntry>,
}

/// Slash-normalized and quoted for the demuxer's `file` directive.
pub fn concat_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    normalized.replace('\'', r"'\''")
}

impl ConcatManifest {
    pub fn new(images: &[PathBuf], seconds: f64) -> Result<Self, RenderError> {
        if images.is_empty() {
            return Err(RenderError::validation("at least one image is required"));
        }
        let seconds = if seconds.is_finite() && seconds >= MIN_IMAGE_SECONDS {
            seconds
        } else {
            MIN_IMAGE_SECONDS
        };
        let entries = images
            .iter()
            .map(|path| ManifestEntry {
                path: path.clone(),
                seconds,
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("file '{}'\n", concat_path(&entry.path)));
            out.push_str(&format!("duration {:.3}\n", entry.seconds));
        }
        if let Some(last) = self.entries.last() {
            out.push_str(&format!("file '{}'\n", concat_path(&last.path)));
        }
        out
    }

    /// Overwrites whatever is at `path`.
    pub async fn write(&self, path: &Path) -> Result<(), RenderError> {
        let text = self.to_text();
        fs::write(path, text.as_bytes()).await?;
        logd(format!("Concat manifest {}:\n{}", path.display(), text));
        Ok(())
    }
}
