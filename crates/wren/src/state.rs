//
// state.rs
//
// Open documents and the global server state
//

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::{FileChangeType, TextDocumentContentChangeEvent, Url};

use crate::config::Config;
use crate::cross_file::{
    DocumentContent, EditorContentProvider, IncludeFileCache, IncludeSignatureCache,
};
use crate::error::ConfigError;
use crate::workspace_symbols::WorkspaceSymbolIndex;

/// An open document
pub struct Document {
    pub contents: Rope,
    pub version: Option<i32>,
    pub revision: u64,
}

impl Document {
    pub fn new(text: &str, version: Option<i32>) -> Self {
        Self {
            contents: Rope::from_str(text),
            version,
            revision: 0,
        }
    }

    pub fn apply_change(&mut self, change: TextDocumentContentChangeEvent) {
        if let Some(range) = change.range {
            let line_count = self.contents.len_lines();
            let start_line = (range.start.line as usize).min(line_count.saturating_sub(1));
            let end_line = (range.end.line as usize).min(line_count.saturating_sub(1));

            let start_line_text = self.contents.line(start_line).to_string();
            let end_line_text = self.contents.line(end_line).to_string();

            let start_char = utf16_offset_to_char_offset(&start_line_text, range.start.character as usize);
            let end_char = utf16_offset_to_char_offset(&end_line_text, range.end.character as usize);

            let start_idx = self.contents.line_to_char(start_line) + start_char;
            let end_idx = (self.contents.line_to_char(end_line) + end_char).max(start_idx);

            self.contents.remove(start_idx..end_idx);
            self.contents.insert(start_idx, &change.text);
        } else {
            // Full document sync
            self.contents = Rope::from_str(&change.text);
        }

        self.revision += 1;
    }

    pub fn text(&self) -> String {
        self.contents.to_string()
    }
}

impl DocumentContent for Document {
    fn content(&self) -> String {
        self.text()
    }
}

/// Char offset within a line for a UTF-16 column, stopping before the line
/// terminator.
fn utf16_offset_to_char_offset(line_text: &str, utf16_offset: usize) -> usize {
    let mut utf16_count = 0;
    let mut char_count = 0;

    for ch in line_text.chars() {
        if utf16_count >= utf16_offset || ch == '\n' || ch == '\r' {
            return char_count;
        }
        utf16_count += ch.len_utf16();
        char_count += 1;
    }
    char_count
}

/// Global LSP state
pub struct WorldState {
    pub documents: HashMap<Url, Document>,
    pub workspace_folders: Vec<Url>,
    pub config: Config,

    // Caches
    pub file_cache: Arc<IncludeFileCache>,
    pub include_cache: IncludeSignatureCache,
    pub workspace_symbols: Arc<WorkspaceSymbolIndex>,

    /// Configuration errors already shown to the user
    pub reported_config_errors: HashSet<ConfigError>,
    /// Documents that currently carry checker diagnostics
    pub checker_published: HashSet<Url>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl WorldState {
    pub fn new(config: Config) -> Self {
        log::info!("Initializing state:");
        log::info!("  include_paths: {:?}", config.include_paths);
        log::info!("  library_allowlist: {} entries", config.library_allowlist.len());
        log::info!("  max_include_depth: {}", config.max_include_depth);
        log::info!("  max_symbol_lines: {}", config.max_symbol_lines);
        log::info!("  file_extensions: {:?}", config.file_extensions);

        Self {
            documents: HashMap::new(),
            workspace_folders: Vec::new(),
            config,
            file_cache: Arc::new(IncludeFileCache::new()),
            include_cache: IncludeSignatureCache::new(),
            workspace_symbols: Arc::new(WorkspaceSymbolIndex::new()),
            reported_config_errors: HashSet::new(),
            checker_published: HashSet::new(),
        }
    }

    /// Content provider over this state: open documents are authoritative,
    /// everything else comes from the disk cache.
    pub fn content_provider(&self) -> EditorContentProvider<'_, Document> {
        EditorContentProvider::new(&self.documents, &self.file_cache)
    }

    pub fn open_document(&mut self, uri: Url, text: &str, version: Option<i32>) {
        self.documents.insert(uri.clone(), Document::new(text, version));
        self.on_file_edited(&uri);
    }

    pub fn close_document(&mut self, uri: &Url) {
        self.documents.remove(uri);
        self.include_cache.remove(uri);
        // Includers of this file go back to the disk text
        self.on_file_edited(uri);
    }

    pub fn apply_change(&mut self, uri: &Url, change: TextDocumentContentChangeEvent) {
        if let Some(doc) = self.documents.get_mut(uri) {
            doc.apply_change(change);
        }
        self.on_file_edited(uri);
    }

    pub fn get_document(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// An open document's text changed: drop include entries that reach it.
    fn on_file_edited(&self, uri: &Url) {
        if let Ok(path) = uri.to_file_path() {
            let dropped = self.include_cache.invalidate_containing(&path);
            if dropped > 0 {
                log::trace!("Edit to {} invalidated {} include entries", path.display(), dropped);
            }
        }
    }

    /// A file was created, changed or deleted on disk. A new file can satisfy
    /// an include that previously failed to resolve, and no entry records
    /// missing paths, so creation drops every include entry.
    pub fn on_file_changed_on_disk(&self, path: &std::path::Path, change: FileChangeType) {
        self.file_cache.invalidate(path);
        if change == FileChangeType::CREATED {
            log::trace!("{} created; clearing include cache", path.display());
            self.include_cache.invalidate_all();
        } else {
            self.include_cache.invalidate_containing(path);
        }
        if self.config.is_source_file(path) {
            self.workspace_symbols.invalidate_file(path);
        }
    }

    /// Apply new settings, dropping whatever they make stale. Returns the
    /// errors not reported before.
    pub fn apply_config(&mut self, config: Config, errors: Vec<ConfigError>) -> Vec<ConfigError> {
        if self.config.include_settings_changed(&config) {
            log::info!("Include settings changed; clearing include cache");
            self.include_cache.invalidate_all();
        }
        if self.config.symbol_settings_changed(&config) {
            log::info!("Symbol settings changed; clearing workspace symbols");
            self.workspace_symbols.invalidate_all();
        }
        self.config = config;

        errors
            .into_iter()
            .filter(|e| self.reported_config_errors.insert(e.clone()))
            .collect()
    }

    pub fn set_workspace_folders(&mut self, folders: Vec<Url>) {
        self.workspace_folders = folders;
        self.workspace_symbols.invalidate_all();
    }

    /// Workspace roots as filesystem paths
    pub fn workspace_roots(&self) -> Vec<PathBuf> {
        self.workspace_folders
            .iter()
            .filter_map(|f| f.to_file_path().ok())
            .collect()
    }
}
