//
// cross_file/cache.rs
//
// Per-document cache of include-graph signatures with generation tagging
//

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use lru::LruCache;
use tower_lsp::lsp_types::Url;

use super::directive::IncludeFingerprint;
use crate::signature::SignatureMap;

/// Include-graph result for one document.
#[derive(Debug, Clone, Default)]
pub struct IncludeEntry {
    /// Directive multiset this entry was computed from
    pub fingerprint: IncludeFingerprint,
    /// Reachable files in discovery order
    pub files: Vec<PathBuf>,
    /// Merged signatures of those files
    pub signatures: SignatureMap,
}

impl IncludeEntry {
    pub fn contains_file(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path)
    }
}

/// Default capacity for the include cache
const DEFAULT_INCLUDE_CACHE_CAPACITY: usize = 256;

/// Include signature cache with LRU eviction and interior mutability.
///
/// Reads use `peek()` so they work under a read lock. Every invalidation
/// bumps a generation counter; a computation captures the generation with
/// [`begin`](Self::begin) before it starts and [`store`](Self::store) drops
/// its result if the generation moved in the meantime.
pub struct IncludeSignatureCache {
    inner: RwLock<LruCache<Url, Arc<IncludeEntry>>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for IncludeSignatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncludeSignatureCache")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl Default for IncludeSignatureCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INCLUDE_CACHE_CAPACITY)
    }
}

impl IncludeSignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        let cap = NonZeroUsize::new(cap).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: RwLock::new(LruCache::new(cap)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Capture the generation before computing an entry.
    pub fn begin(&self) -> u64 {
        self.generation()
    }

    /// Cached entry if its fingerprint matches the document's current one.
    pub fn get(&self, uri: &Url, fingerprint: &IncludeFingerprint) -> Option<Arc<IncludeEntry>> {
        let guard = self.inner.read().ok()?;
        guard
            .peek(uri)
            .filter(|entry| entry.fingerprint == *fingerprint)
            .cloned()
    }

    /// Store an entry computed since `generation`. Returns `false` (and
    /// stores nothing) if an invalidation happened in between.
    pub fn store(&self, uri: Url, generation: u64, entry: Arc<IncludeEntry>) -> bool {
        let Ok(mut guard) = self.inner.write() else {
            return false;
        };
        // Invalidations bump the generation while holding the write lock
        if self.generation.load(Ordering::Acquire) != generation {
            log::trace!("Discarding stale include entry for {}", uri);
            return false;
        }
        guard.push(uri, entry);
        true
    }

    pub fn remove(&self, uri: &Url) {
        if let Ok(mut guard) = self.inner.write() {
            guard.pop(uri);
        }
    }

    /// Drop every entry whose reachable set contains `path`. Returns the
    /// number of entries removed.
    pub fn invalidate_containing(&self, path: &Path) -> usize {
        let Ok(mut guard) = self.inner.write() else {
            return 0;
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
        let stale: Vec<Url> = guard
            .iter()
            .filter(|(_, entry)| entry.contains_file(path))
            .map(|(uri, _)| uri.clone())
            .collect();
        for uri in &stale {
            guard.pop(uri);
        }
        stale.len()
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut guard) = self.inner.write() {
            self.generation.fetch_add(1, Ordering::AcqRel);
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
