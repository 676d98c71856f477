//
// cross_file/file_cache.rs
//
// Disk cache for included files that are not open in the editor
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

/// Modification time and size of a file on disk, used to decide whether a
/// cached copy is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSnapshot {
    pub mtime: SystemTime,
    pub size: u64,
}

impl FileSnapshot {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            mtime: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedFile {
    snapshot: FileSnapshot,
    content: String,
}

/// Text of closed include files keyed by normalized path.
#[derive(Debug, Default)]
pub struct IncludeFileCache {
    inner: RwLock<HashMap<PathBuf, CachedFile>>,
}

impl IncludeFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached content if the stored snapshot still matches `current`
    pub fn get_if_fresh(&self, path: &Path, current: &FileSnapshot) -> Option<String> {
        let guard = self.inner.read().ok()?;
        let cached = guard.get(path)?;
        (cached.snapshot == *current).then(|| cached.content.clone())
    }

    pub fn insert(&self, path: PathBuf, snapshot: FileSnapshot, content: String) {
        if let Ok(mut guard) = self.inner.write() {
            guard.insert(path, CachedFile { snapshot, content });
        }
    }

    pub fn invalidate(&self, path: &Path) {
        if let Ok(mut guard) = self.inner.write() {
            guard.remove(path);
        }
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the file's text, re-reading from disk only when its snapshot
    /// changed since the last read. Unreadable or non-UTF-8 files yield `None`.
    pub fn read(&self, path: &Path) -> Option<String> {
        let snapshot = get_file_snapshot(path)?;
        if let Some(content) = self.get_if_fresh(path, &snapshot) {
            return Some(content);
        }
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::trace!("Failed to read include file {}: {}", path.display(), e);
                return None;
            }
        };
        self.insert(path.to_path_buf(), snapshot, content.clone());
        Some(content)
    }
}

/// Snapshot of a file's metadata, or `None` if it cannot be stat'ed.
pub fn get_file_snapshot(path: &Path) -> Option<FileSnapshot> {
    let metadata = std::fs::metadata(path).ok()?;
    Some(FileSnapshot::from_metadata(&metadata))
}
