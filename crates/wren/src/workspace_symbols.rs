//
// workspace_symbols.rs
//
// Workspace-wide symbol index: per-file symbol lists built in parallel and
// cached until a file event invalidates them
//

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use rayon::prelude::*;
use tower_lsp::lsp_types::Range;
use walkdir::WalkDir;

use crate::config::Config;
use crate::cross_file::IncludeFileCache;
use crate::symbols::{extract_document_symbols, SymbolKind, SymbolOptions};
use crate::utf16::byte_range_to_range;

// ============================================================================
// Entries
// ============================================================================

/// A symbol with its range already converted to editor coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub container_name: Option<String>,
    pub range: Range,
}

/// Extract one file's symbols for the index. A file that cannot be read
/// contributes nothing.
pub fn index_file(path: &Path, options: &SymbolOptions, file_cache: &IncludeFileCache) -> Vec<IndexedSymbol> {
    let Some(text) = file_cache.read(path) else {
        log::trace!("Skipping unreadable file {}", path.display());
        return Vec::new();
    };
    extract_document_symbols(&text, options)
        .into_iter()
        .map(|s| IndexedSymbol {
            range: byte_range_to_range(&text, &s.range),
            name: s.name,
            kind: s.kind,
            container_name: s.container_name,
        })
        .collect()
}

/// Source files under `roots`, sorted, at most `config.workspace_symbols_max_files`.
/// Hidden directories below a root are not entered.
pub fn discover_source_files(roots: &[PathBuf], config: &Config) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !e.file_name().to_string_lossy().starts_with('.')
            });
        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && config.is_source_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();

    if files.len() > config.workspace_symbols_max_files {
        log::warn!(
            "Workspace has {} source files; indexing the first {}",
            files.len(),
            config.workspace_symbols_max_files
        );
        files.truncate(config.workspace_symbols_max_files);
    }
    files
}

// ============================================================================
// Index
// ============================================================================

/// Cached workspace symbols keyed by file.
///
/// A build lists the workspace, extracts symbols only for files not already
/// cached, and drops entries for files that disappeared. Every invalidation
/// bumps a generation counter; a build that started before an invalidation
/// still answers its own query but does not store its results.
#[derive(Default)]
pub struct WorkspaceSymbolIndex {
    files: DashMap<PathBuf, Arc<Vec<IndexedSymbol>>>,
    complete: AtomicBool,
    generation: AtomicU64,
    // Serializes commits against invalidations
    commit_lock: Mutex<()>,
}

impl std::fmt::Debug for WorkspaceSymbolIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSymbolIndex")
            .field("files", &self.files.len())
            .field("complete", &self.is_complete())
            .field("generation", &self.generation())
            .finish()
    }
}

impl WorkspaceSymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Drop the entry for one file (created, changed or deleted on disk).
    pub fn invalidate_file(&self, path: &Path) {
        let _lock = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.files.remove(path);
        self.complete.store(false, Ordering::Release);
    }

    /// Drop everything, e.g. after symbol settings or workspace folders change.
    pub fn invalidate_all(&self) {
        let _lock = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.files.clear();
        self.complete.store(false, Ordering::Release);
    }

    /// Bring the index up to date with the workspace. Blocking; call from
    /// `spawn_blocking`. Returns the symbols of every listed file.
    pub fn build(
        &self,
        roots: &[PathBuf],
        config: &Config,
        file_cache: &IncludeFileCache,
    ) -> Vec<(PathBuf, Arc<Vec<IndexedSymbol>>)> {
        if self.is_complete() {
            return self.snapshot();
        }

        let _guard = crate::perf::TimingGuard::with_threshold("workspace_symbol_build", 500);
        let start = Instant::now();
        let generation = self.generation();
        let options = SymbolOptions::from_config(config);
        let listed = discover_source_files(roots, config);

        let results: Vec<(PathBuf, Arc<Vec<IndexedSymbol>>)> = listed
            .par_iter()
            .map(|path| {
                let symbols = match self.files.get(path) {
                    Some(cached) => cached.value().clone(),
                    None => Arc::new(index_file(path, &options, file_cache)),
                };
                (path.clone(), symbols)
            })
            .collect();

        let symbol_count: usize = results.iter().map(|(_, s)| s.len()).sum();
        crate::perf::record_workspace_scan(start.elapsed(), results.len(), symbol_count);
        log::info!(
            "Workspace symbols: {} file(s), {} symbol(s) in {:?}",
            results.len(),
            symbol_count,
            start.elapsed()
        );

        self.commit(generation, &results);
        results
    }

    fn commit(&self, generation: u64, results: &[(PathBuf, Arc<Vec<IndexedSymbol>>)]) -> bool {
        let _lock = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.generation() != generation {
            log::trace!("Discarding stale workspace symbol build");
            return false;
        }
        let listed: HashSet<&PathBuf> = results.iter().map(|(p, _)| p).collect();
        self.files.retain(|path, _| listed.contains(path));
        for (path, symbols) in results {
            self.files.insert(path.clone(), symbols.clone());
        }
        self.complete.store(true, Ordering::Release);
        true
    }

    /// Current entries, sorted by path.
    pub fn snapshot(&self) -> Vec<(PathBuf, Arc<Vec<IndexedSymbol>>)> {
        let mut entries: Vec<_> = self
            .files
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// Symbols whose name contains `query`, case-insensitively. An empty query
/// matches everything.
pub fn filter_symbols<'a>(
    entries: &'a [(PathBuf, Arc<Vec<IndexedSymbol>>)],
    query: &str,
) -> Vec<(&'a Path, &'a IndexedSymbol)> {
    let needle = query.to_lowercase();
    entries
        .iter()
        .flat_map(|(path, symbols)| symbols.iter().map(move |s| (path.as_path(), s)))
        .filter(|(_, s)| needle.is_empty() || s.name.to_lowercase().contains(&needle))
        .collect()
}
