//! Media bundles on disk: one folder of images per work-item.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::MediaError;
use crate::ledger::Archiver;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// Yields the ordered media files of a bundle.
pub trait MediaBundle: Send + Sync {
    fn files(&self, bundle: &str) -> Result<Vec<PathBuf>, MediaError>;
}

#[derive(Debug, Serialize)]
struct ArchiveMetadata<'a> {
    item_key: &'a str,
    bundle: &'a str,
    archived_at: String,
    original_path: String,
    archived_path: String,
}

/// `root/<bundle>/*.{jpg,png,...}`, archived to `archive_root/<key>`.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
    archive_root: PathBuf,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            archive_root: archive_root.into(),
        }
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    }

    /// Moves `root/<bundle>` under the archive root and returns where it went.
    /// A destination that already exists gets a timestamp suffix.
    pub fn relocate(&self, item_key: &str, bundle: &str) -> Result<Option<PathBuf>, MediaError> {
        let source = self.root.join(bundle);
        if !source.is_dir() {
            warn!(item = item_key, path = %source.display(), "no media folder to archive");
            return Ok(None);
        }

        fs::create_dir_all(&self.archive_root).map_err(|e| io(&self.archive_root, e))?;
        let mut destination = self.archive_root.join(bundle);
        if destination.exists() {
            let stamp = Local::now().format("%Y%m%d_%H%M%S");
            destination = self.archive_root.join(format!("{bundle}_{stamp}"));
        }
        fs::rename(&source, &destination).map_err(|e| io(&source, e))?;

        let metadata = ArchiveMetadata {
            item_key,
            bundle,
            archived_at: Utc::now().to_rfc3339(),
            original_path: source.display().to_string(),
            archived_path: destination.display().to_string(),
        };
        let metadata_path = destination.join(".metadata.json");
        fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata)?)
            .map_err(|e| io(&metadata_path, e))?;

        info!(item = item_key, to = %destination.display(), "media archived");
        Ok(Some(destination))
    }
}

impl MediaBundle for MediaLibrary {
    fn files(&self, bundle: &str) -> Result<Vec<PathBuf>, MediaError> {
        let folder = self.root.join(bundle);
        if !folder.is_dir() {
            return Err(MediaError::FolderMissing(folder));
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&folder)
            .map_err(|e| io(&folder, e))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && Self::is_image(path))
            .collect();
        if files.is_empty() {
            return Err(MediaError::Empty(folder));
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }
}

impl Archiver for MediaLibrary {
    fn archive(&self, item_key: &str, media: Option<&str>) -> Result<(), MediaError> {
        match media {
            Some(bundle) => self.relocate(item_key, bundle).map(|_| ()),
            None => Ok(()),
        }
    }
}

fn io(path: &Path, source: std::io::Error) -> MediaError {
    MediaError::Io {
        path: path.to_path_buf(),
        source,
    }
}
