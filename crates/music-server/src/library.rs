//! Library scanning.
//!
//! Walks the music root and lists playable files, newest first. Nothing is
//! cached: every call re-reads the filesystem.

use std::fs::{self, DirEntry, ReadDir};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use music_server_types::TrackEntry;

use crate::media_types;

/// Source of the track listing served by the index and JSON endpoints.
///
/// Handlers only see this trait, so an incrementally maintained index can
/// replace the filesystem walk without changing the HTTP surface.
pub trait TrackSource: Send + Sync {
    /// Canonical library root.
    fn root(&self) -> &Path;

    /// Current tracks ordered by modification time, most recent first.
    fn tracks(&self) -> Result<Vec<TrackEntry>>;
}

/// Track source that rescans the directory tree on every request.
#[derive(Clone, Debug)]
pub struct FsTrackSource {
    root: PathBuf,
}

impl FsTrackSource {
    /// Canonicalize `root` and make sure it is a directory.
    pub fn new(root: &Path) -> Result<Self> {
        Ok(Self {
            root: canonical_root(root)?,
        })
    }
}

impl TrackSource for FsTrackSource {
    fn root(&self) -> &Path {
        &self.root
    }

    fn tracks(&self) -> Result<Vec<TrackEntry>> {
        scan_library(&self.root)
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .with_context(|| format!("canonicalize root {:?}", root))?;
    if !root.is_dir() {
        return Err(anyhow::anyhow!("root is not a directory: {:?}", root));
    }
    Ok(root)
}

/// Scan `root` recursively and return supported files, newest first.
///
/// Only a failure to read the root itself is an error. Unreadable
/// subdirectories and files are logged and left out of the result.
pub fn scan_library(root: &Path) -> Result<Vec<TrackEntry>> {
    scan_library_with(root, |dir| fs::read_dir(dir))
}

/// Walk `root` listing each directory through `read_dir`.
fn scan_library_with<R>(root: &Path, mut read_dir: R) -> Result<Vec<TrackEntry>>
where
    R: FnMut(&Path) -> io::Result<ReadDir>,
{
    let root = canonical_root(root)?;
    let entries = read_dir(&root).with_context(|| format!("read_dir {:?}", root))?;

    let mut tracks = Vec::new();
    scan_entries(&root, &root, entries, &mut read_dir, &mut tracks);

    // Stable sort: equal timestamps keep traversal order.
    tracks.sort_by(|a, b| b.modified_ms.cmp(&a.modified_ms));
    tracing::debug!(root = %root.display(), tracks = tracks.len(), "library scan complete");
    Ok(tracks)
}

fn scan_dir<R>(root: &Path, dir: &Path, read_dir: &mut R, tracks: &mut Vec<TrackEntry>)
where
    R: FnMut(&Path) -> io::Result<ReadDir>,
{
    match read_dir(dir) {
        Ok(entries) => scan_entries(root, dir, entries, read_dir, tracks),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
        }
    }
}

fn scan_entries<R>(
    root: &Path,
    dir: &Path,
    entries: ReadDir,
    read_dir: &mut R,
    tracks: &mut Vec<TrackEntry>,
) where
    R: FnMut(&Path) -> io::Result<ReadDir>,
{
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "read_dir entry failed");
                continue;
            }
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "file type unavailable");
                continue;
            }
        };

        if file_type.is_dir() {
            scan_dir(root, &entry.path(), read_dir, tracks);
        } else if file_type.is_file() && media_types::is_supported(&entry.path()) {
            if let Some(track) = track_entry(root, &entry) {
                tracks.push(track);
            }
        }
    }
}

fn track_entry(root: &Path, entry: &DirEntry) -> Option<TrackEntry> {
    let path = entry.path();
    let Some(rel) = relative_web_path(root, &path) else {
        tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
        return None;
    };
    let modified = match entry.metadata().and_then(|meta| meta.modified()) {
        Ok(modified) => modified,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping file without mtime");
            return None;
        }
    };
    Some(TrackEntry {
        path: rel,
        modified_ms: system_time_ms(modified),
    })
}

/// Root-relative path joined with `/` regardless of platform separator.
fn relative_web_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

fn system_time_ms(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}
