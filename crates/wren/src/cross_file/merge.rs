//
// cross_file/merge.rs
//
// Merged signature table for a document: built-ins, then included files,
// then the document's own functions. Later layers replace earlier entries.
//

use std::path::{Path, PathBuf};

use super::content_provider::ContentProvider;
use crate::signature::{extract_signatures, SignatureMap};

/// Short name shown in "Included from" documentation.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Signatures from every file in `files`, in order. A file that cannot be
/// read contributes nothing.
pub fn collect_include_signatures(files: &[PathBuf], provider: &dyn ContentProvider) -> SignatureMap {
    let mut merged = SignatureMap::new();
    for path in files {
        let Some(content) = provider.get_content(path) else {
            continue;
        };
        merged.extend(extract_signatures(&content, &file_label(path)));
    }
    merged
}

/// Overlay `layers` in order; a name in a later layer shadows earlier ones.
pub fn overlay(layers: &[&SignatureMap]) -> SignatureMap {
    let capacity = layers.iter().map(|l| l.len()).sum();
    let mut merged = SignatureMap::with_capacity(capacity);
    for layer in layers {
        for (key, sig) in layer.iter() {
            merged.insert(key.clone(), sig.clone());
        }
    }
    merged
}

/// Built-ins, included and local signatures with local taking precedence.
pub fn merged_signatures(
    builtins: &SignatureMap,
    included: &SignatureMap,
    local: &SignatureMap,
) -> SignatureMap {
    overlay(&[builtins, included, local])
}
