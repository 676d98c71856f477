//
// cross_file/property_tests.rs
//
// Property-based tests for include graph awareness
//

#![cfg(test)]

use proptest::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::content_provider::DiskContentProvider;
use super::directive::{parse_includes, IncludeFingerprint};
use super::file_cache::IncludeFileCache;
use super::graph::collect_reachable_files;
use crate::config::Config;
use crate::signature::extract_signatures;
use crate::symbols::{extract_document_symbols, SymbolOptions};

// ============================================================================
// Generators
// ============================================================================

/// Generate an AutoIt identifier
fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,8}"
}

/// Generate an include line, quoted or bracketed
fn include_line() -> impl Strategy<Value = String> {
    (identifier(), any::<bool>()).prop_map(|(name, quoted)| {
        if quoted {
            format!("#include \"{}.au3\"", name)
        } else {
            format!("#include <{}.au3>", name)
        }
    })
}

/// Generate a directed graph over `n` files as adjacency lists
fn include_graph() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..7).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0..n, 0..4), n))
}

fn reachable(adjacency: &[Vec<usize>]) -> HashSet<usize> {
    let mut seen = HashSet::from([0]);
    let mut stack = vec![0];
    while let Some(node) = stack.pop() {
        for &next in &adjacency[node] {
            if seen.insert(next) {
                stack.push(next);
            }
        }
    }
    seen.remove(&0);
    seen
}

fn write_graph(dir: &TempDir, adjacency: &[Vec<usize>]) -> Vec<PathBuf> {
    adjacency
        .iter()
        .enumerate()
        .map(|(i, edges)| {
            let text: Vec<String> = edges
                .iter()
                .map(|e| format!("#include \"f{}.au3\"", e))
                .collect();
            let path = dir.path().join(format!("f{}.au3", i));
            fs::write(&path, text.join("\n")).unwrap();
            path
        })
        .collect()
}

// ============================================================================
// Include fingerprint: multiset equality
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Reordering directives never changes the fingerprint.
    #[test]
    fn prop_fingerprint_order_insensitive(
        lines in prop::collection::vec(include_line(), 0..8)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let (original, shuffled) = lines;
        let a = IncludeFingerprint::from_directives(&parse_includes(&original.join("\n")));
        let b = IncludeFingerprint::from_directives(&parse_includes(&shuffled.join("\n")));
        prop_assert_eq!(a, b);
    }

    /// Adding one more directive always changes the fingerprint.
    #[test]
    fn prop_fingerprint_counts_duplicates(
        lines in prop::collection::vec(include_line(), 1..6),
        pick in any::<prop::sample::Index>()
    ) {
        let extra = lines[pick.index(lines.len())].clone();
        let mut grown = lines.clone();
        grown.push(extra);
        let a = IncludeFingerprint::from_directives(&parse_includes(&lines.join("\n")));
        let b = IncludeFingerprint::from_directives(&parse_includes(&grown.join("\n")));
        prop_assert_ne!(a, b);
    }
}

// ============================================================================
// Include graph walking
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// The walk finds exactly the reachable files, each once, never the root,
    /// and repeating it gives the same order.
    #[test]
    fn prop_walk_matches_reachability(adjacency in include_graph()) {
        let dir = TempDir::new().unwrap();
        let paths = write_graph(&dir, &adjacency);
        let cache = IncludeFileCache::new();
        let provider = DiskContentProvider::new(&cache);
        let config = Config::default();
        let root_text = fs::read_to_string(&paths[0]).unwrap();

        let first = collect_reachable_files(&paths[0], &root_text, &config, &provider);
        let second = collect_reachable_files(&paths[0], &root_text, &config, &provider);
        prop_assert_eq!(&first, &second);

        let unique: HashSet<&PathBuf> = first.iter().collect();
        prop_assert_eq!(unique.len(), first.len());
        prop_assert!(!first.contains(&paths[0]));

        let expected: HashSet<PathBuf> = reachable(&adjacency)
            .into_iter()
            .map(|i| paths[i].clone())
            .collect();
        let actual: HashSet<PathBuf> = first.into_iter().collect();
        prop_assert_eq!(actual, expected);
    }
}

// ============================================================================
// Extraction
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Symbol ranges always lie on char boundaries inside the text.
    #[test]
    fn prop_symbol_ranges_in_bounds(text in "(\\PC|\n|Func |EndFunc|\\$[a-z]|#Region |#EndRegion|#cs|#ce| _){0,40}") {
        let symbols = extract_document_symbols(&text, &SymbolOptions::default());
        for s in &symbols {
            prop_assert!(s.range.start <= s.range.end);
            prop_assert!(s.range.end <= text.len());
            prop_assert!(text.is_char_boundary(s.range.start));
            prop_assert!(text.is_char_boundary(s.range.end));
        }
        prop_assert_eq!(symbols, extract_document_symbols(&text, &SymbolOptions::default()));
    }

    /// Parameters come out in declaration order, qualifiers and defaults
    /// stripped.
    #[test]
    fn prop_signature_parameters(
        name in identifier(),
        params in prop::collection::hash_set("[a-z][a-z0-9]{0,5}", 0..5),
        by_ref in any::<bool>()
    ) {
        let params: Vec<String> = params.into_iter().collect();
        let decl: Vec<String> = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if by_ref && i == 0 {
                    format!("ByRef ${}", p)
                } else if i % 2 == 1 {
                    format!("${} = {}", p, i)
                } else {
                    format!("${}", p)
                }
            })
            .collect();
        let text = format!("Func {}({})\nEndFunc", name, decl.join(", "));
        let sigs = extract_signatures(&text, "gen.au3");
        let sig = &sigs[&name.to_lowercase()];
        let got: Vec<&str> = sig.parameters.keys().map(|k| k.as_str()).collect();
        let want: Vec<String> = params.iter().map(|p| format!("${}", p)).collect();
        prop_assert_eq!(got, want.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    }
}
