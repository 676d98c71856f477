//
// cross_file/path_resolve.rs
//
// Include path resolution
//
// Quoted includes look next to the including document first and fall back to
// the configured include paths with the library directory moved to the end.
// Bracketed includes search the include paths in configured order, library
// directory first. The first existing candidate wins.
//

use std::path::{Component, Path, PathBuf};
use tower_lsp::lsp_types::Url;

use super::directive::{IncludeDirective, IncludeKind};
use crate::error::ResolutionError;

/// AutoIt sources write `\` separators; turn a spec into a platform path.
fn spec_to_path(file_spec: &str) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(file_spec)
    } else {
        PathBuf::from(file_spec.replace('\\', "/"))
    }
}

/// Library lookups accept bare names; a spec with no extension means `.au3`.
pub fn with_default_extension(file_spec: &str) -> String {
    if spec_to_path(file_spec).extension().is_some() {
        file_spec.to_string()
    } else {
        format!("{file_spec}.au3")
    }
}

/// Search `search_paths` for `file_spec`.
///
/// The first entry of `search_paths` is the library directory. When
/// `prefer_library_first` is false it is moved to the end of the order for
/// this lookup only. Returns the first candidate that exists on disk.
pub fn resolve_include(
    file_spec: &str,
    search_paths: &[PathBuf],
    prefer_library_first: bool,
) -> Option<PathBuf> {
    if file_spec.is_empty() {
        log::trace!("Include resolution: empty spec");
        return None;
    }

    let spec_path = spec_to_path(file_spec);
    if spec_path.is_absolute() {
        return normalize_path(&spec_path).filter(|p| p.is_file());
    }

    let ordered: Vec<&PathBuf> = match search_paths.split_first() {
        Some((library, rest)) if !prefer_library_first => {
            rest.iter().chain(std::iter::once(library)).collect()
        }
        _ => search_paths.iter().collect(),
    };

    for dir in ordered {
        if let Some(candidate) = normalize_path(&dir.join(&spec_path)) {
            if candidate.is_file() {
                log::trace!(
                    "Resolved include '{}' to '{}'",
                    file_spec,
                    candidate.display()
                );
                return Some(candidate);
            }
        }
    }

    log::trace!(
        "Include '{}' not found in {} search path(s)",
        file_spec,
        search_paths.len()
    );
    None
}

/// Check `file_spec` against the including document's own directory.
pub fn resolve_relative(document_path: &Path, file_spec: &str) -> Option<PathBuf> {
    let spec_path = spec_to_path(file_spec);
    let candidate = if spec_path.is_absolute() {
        spec_path
    } else {
        document_path.parent()?.join(spec_path)
    };
    normalize_path(&candidate).filter(|p| p.is_file())
}

/// Resolve one directive found in `document_path`.
pub fn resolve_directive(
    directive: &IncludeDirective,
    document_path: &Path,
    search_paths: &[PathBuf],
) -> Result<PathBuf, ResolutionError> {
    let resolved = match directive.kind {
        IncludeKind::Quoted => resolve_relative(document_path, &directive.spec)
            .or_else(|| resolve_include(&directive.spec, search_paths, false)),
        IncludeKind::Bracketed => resolve_include(
            &with_default_extension(&directive.spec),
            search_paths,
            true,
        ),
    };
    resolved.ok_or_else(|| ResolutionError::NotFound {
        spec: directive.spec.clone(),
    })
}

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> Option<PathBuf> {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                // Only pop a Normal segment; RootDir and Prefix stay
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    if components.is_empty() {
        return None;
    }

    Some(components.iter().collect())
}

/// Convert a resolved path to a file URI.
pub fn path_to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}
