//
// cross_file/graph.rs
//
// Include graph walking: every file transitively reachable from a document
// through #include directives, in discovery order.
//

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::content_provider::ContentProvider;
use super::directive::{parse_include_line, parse_includes, IncludeDirective, IncludeKind};
use super::path_resolve::{normalize_path, resolve_directive};
use crate::config::Config;
use crate::error::ResolutionError;

struct Walker<'a> {
    config: &'a Config,
    provider: &'a dyn ContentProvider,
    visited: HashSet<PathBuf>,
    files: Vec<PathBuf>,
}

impl Walker<'_> {
    fn walk(&mut self, document_path: &Path, directives: &[IncludeDirective], depth: usize) {
        for directive in directives {
            if directive.kind == IncludeKind::Bracketed && self.config.is_allowlisted(&directive.spec)
            {
                log::trace!("Skipping standard library include <{}>", directive.spec);
                continue;
            }

            let resolved =
                match resolve_directive(directive, document_path, &self.config.include_paths) {
                    Ok(path) => path,
                    Err(e) => {
                        log::trace!("{} (from {})", e, document_path.display());
                        continue;
                    }
                };

            if !self.visited.insert(resolved.clone()) {
                continue;
            }
            self.files.push(resolved.clone());

            if depth + 1 >= self.config.max_include_depth {
                log::warn!(
                    "Include depth limit {} reached at {}",
                    self.config.max_include_depth,
                    resolved.display()
                );
                continue;
            }

            let Some(content) = self.provider.get_content(&resolved) else {
                log::trace!("No content for included file {}", resolved.display());
                continue;
            };
            let child_directives = parse_includes(&content);
            self.walk(&resolved, &child_directives, depth + 1);
        }
    }
}

/// Every file reachable from `document_path` through includes, in discovery
/// order, each at most once. The document itself is never part of the result.
///
/// Unresolvable includes are skipped. Bracketed includes naming a standard
/// library file are not probed.
pub fn collect_reachable_files(
    document_path: &Path,
    text: &str,
    config: &Config,
    provider: &dyn ContentProvider,
) -> Vec<PathBuf> {
    collect_reachable_from_directives(document_path, &parse_includes(text), config, provider)
}

/// As [`collect_reachable_files`], with the root's directives already parsed.
pub fn collect_reachable_from_directives(
    document_path: &Path,
    directives: &[IncludeDirective],
    config: &Config,
    provider: &dyn ContentProvider,
) -> Vec<PathBuf> {
    let _guard = crate::perf::TimingGuard::new("include_graph_walk");
    crate::perf::increment_include_walks();
    let mut walker = Walker {
        config,
        provider,
        visited: HashSet::new(),
        files: Vec::new(),
    };
    let root = normalize_path(document_path).unwrap_or_else(|| document_path.to_path_buf());
    walker.visited.insert(root);
    walker.walk(document_path, directives, 0);
    walker.files
}

/// Resolve the include directive on `line` of a document.
pub fn resolve_include_on_line(
    document_path: &Path,
    line_text: &str,
    line: u32,
    config: &Config,
) -> Result<PathBuf, ResolutionError> {
    let directive = parse_include_line(line_text, line).ok_or(ResolutionError::NotAnInclude)?;
    resolve_directive(&directive, document_path, &config.include_paths)
}
