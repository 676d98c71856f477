//
// cross_file/mod.rs
//
// Include-graph awareness for Wren
//

pub mod cache;
pub mod content_provider;
pub mod directive;
pub mod file_cache;
pub mod graph;
pub mod merge;
pub mod path_resolve;

#[cfg(test)]
mod property_tests;

pub use cache::*;
pub use content_provider::*;
pub use directive::*;
pub use file_cache::*;
pub use graph::*;
pub use merge::*;
pub use path_resolve::*;

use std::path::Path;
use std::sync::Arc;

use tower_lsp::lsp_types::Url;

use crate::config::Config;

/// Include-graph signatures for a document, from cache when the document's
/// include directives are unchanged (as a multiset), otherwise recomputed
/// and stored.
///
/// A result computed while an invalidation raced with it is returned to the
/// caller but not stored.
pub fn include_signatures(
    uri: &Url,
    document_path: &Path,
    text: &str,
    config: &Config,
    provider: &dyn ContentProvider,
    cache: &IncludeSignatureCache,
) -> Arc<IncludeEntry> {
    let directives = parse_includes(text);
    let fingerprint = IncludeFingerprint::from_directives(&directives);
    if let Some(entry) = cache.get(uri, &fingerprint) {
        return entry;
    }

    let generation = cache.begin();
    let files = collect_reachable_from_directives(document_path, &directives, config, provider);
    let signatures = collect_include_signatures(&files, provider);
    log::trace!(
        "Include graph for {}: {} file(s), {} signature(s)",
        uri,
        files.len(),
        signatures.len()
    );

    let entry = Arc::new(IncludeEntry {
        fingerprint,
        files,
        signatures,
    });
    cache.store(uri.clone(), generation, entry.clone());
    entry
}
