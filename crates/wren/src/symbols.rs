//
// symbols.rs
//
// Document symbol extraction: functions, variables, constants, enums and
// #Region blocks, with byte ranges into the source text.
//

use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;

use crate::config::Config;
use crate::lexical::{self, BlockCommentState};
use crate::signature::match_function_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Variable,
    Constant,
    Enum,
    /// A `#Region` block
    Namespace,
}

/// A named, located entity in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Name of the enclosing function, for variables
    pub container_name: Option<String>,
    /// Byte range in the document text
    pub range: Range<usize>,
}

/// What to extract and how far to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolOptions {
    pub show_variables: bool,
    pub show_regions: bool,
    pub max_lines: usize,
}

impl Default for SymbolOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SymbolOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            show_variables: config.show_variables_in_symbols,
            show_regions: config.show_regions_in_symbols,
            max_lines: config.max_symbol_lines,
        }
    }
}

struct SymbolPatterns {
    function_end: Regex,
    function_start: Regex,
    variable: Regex,
    declaration_kind: Regex,
    region: Regex,
}

fn patterns() -> &'static SymbolPatterns {
    static PATTERNS: OnceLock<SymbolPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| SymbolPatterns {
        // Non-greedy up to the first EndFunc at a line start
        function_end: Regex::new(r"(?ims)\A.*?^[\t ]*EndFunc\b").unwrap(),
        function_start: Regex::new(r"(?im)^[\t ]*Func\s+\w").unwrap(),
        // Strings and comments are matched (and ignored) so `$x` inside them is skipped
        variable: Regex::new(r#""[^"\r\n]*"|'[^'\r\n]*'|;.*|(\$\w+)"#).unwrap(),
        declaration_kind: Regex::new(r"(?i)^\s*(?:(?:Local|Global)\s+)?(Const|Enum)\b").unwrap(),
        region: Regex::new(r"(?i)^[\t ]*#Region\b[\s-]*(.*)$").unwrap(),
    })
}

/// Byte offset just past the `EndFunc` that closes a function starting at
/// `start`, or `None` when the function is unterminated. Functions do not
/// nest, so another `Func` header before the `EndFunc` leaves it open.
pub fn function_end(text: &str, start: usize) -> Option<usize> {
    let rest = &text[start..];
    let m = patterns().function_end.find(rest)?;
    let body_start = rest.find('\n').map_or(rest.len(), |i| i + 1);
    if body_start < m.end() && patterns().function_start.is_match(&rest[body_start..m.end()]) {
        return None;
    }
    Some(start + m.end())
}

fn declaration_kind(line: &str) -> SymbolKind {
    match patterns().declaration_kind.captures(line) {
        Some(caps) if caps[1].eq_ignore_ascii_case("const") => SymbolKind::Constant,
        Some(_) => SymbolKind::Enum,
        None => SymbolKind::Variable,
    }
}

/// Find the end of the `#EndRegion` matching the region opened at
/// `lines[open]`, counting nested regions.
fn region_end(lines: &[(usize, usize, &str)], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut comments = BlockCommentState::new();
    for &(_, offset, line) in &lines[open + 1..] {
        if comments.observe(line) {
            continue;
        }
        if lexical::is_region_start(line) {
            depth += 1;
        } else if lexical::is_region_end(line) {
            if depth == 0 {
                return Some(offset + line.len());
            }
            depth -= 1;
        }
    }
    None
}

/// Extract symbols from a document. Deterministic for a given text and
/// options; symbols are ordered by discovery.
pub fn extract_document_symbols(text: &str, options: &SymbolOptions) -> Vec<Symbol> {
    let pats = patterns();
    let lines: Vec<(usize, usize, &str)> = lexical::lines_with_offsets(text)
        .take(options.max_lines)
        .collect();

    let mut symbols = Vec::new();
    let mut functions: Vec<(String, Range<usize>)> = Vec::new();
    let mut seen_functions: HashSet<String> = HashSet::new();
    let mut seen_variables: HashSet<(String, Option<String>)> = HashSet::new();
    let mut seen_regions: HashSet<String> = HashSet::new();
    let mut comments = BlockCommentState::new();
    let mut run_kind: Option<SymbolKind> = None;

    for (idx, &(_, offset, line)) in lines.iter().enumerate() {
        let is_region = lexical::is_region_start(line);
        if lexical::is_skippable(line) && !is_region {
            continue;
        }
        if comments.observe(line) {
            continue;
        }

        if let Some((name, _)) = match_function_line(line) {
            if !seen_functions.contains(&name.to_lowercase()) {
                match function_end(text, offset) {
                    Some(end) => {
                        seen_functions.insert(name.to_lowercase());
                        functions.push((name.to_string(), offset..end));
                        symbols.push(Symbol {
                            name: name.to_string(),
                            kind: SymbolKind::Function,
                            container_name: None,
                            range: offset..end,
                        });
                    }
                    None => log::trace!("Unterminated function {} at line {}", name, idx),
                }
            }
        }

        if is_region {
            if options.show_regions {
                let name = pats
                    .region
                    .captures(line)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                if !name.is_empty() && !seen_regions.contains(&name) {
                    if let Some(end) = region_end(&lines, idx) {
                        seen_regions.insert(name.clone());
                        symbols.push(Symbol {
                            name,
                            kind: SymbolKind::Namespace,
                            container_name: None,
                            range: offset..end,
                        });
                    }
                }
            }
            continue;
        }

        if !options.show_variables {
            continue;
        }

        let kind = *run_kind.get_or_insert_with(|| declaration_kind(line));
        let container = functions
            .iter()
            .rev()
            .find(|(_, range)| range.contains(&offset))
            .map(|(name, _)| name.clone());

        for caps in pats.variable.captures_iter(line) {
            let Some(var) = caps.get(1) else {
                continue;
            };
            let key = (var.as_str().to_lowercase(), container.clone());
            if seen_variables.insert(key) {
                symbols.push(Symbol {
                    name: var.as_str().to_string(),
                    kind,
                    container_name: container.clone(),
                    range: offset + var.start()..offset + var.end(),
                });
            }
        }

        if !lexical::has_continuation(line) {
            run_kind = None;
        }
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<Symbol> {
        extract_document_symbols(text, &SymbolOptions::default())
    }

    fn named<'a>(symbols: &'a [Symbol], name: &str) -> Vec<&'a Symbol> {
        symbols.iter().filter(|s| s.name == name).collect()
    }

    #[test]
    fn test_function_range_spans_to_endfunc() {
        let text = "Func Foo()\n\tReturn 1\nEndFunc\nLocal $after";
        let symbols = extract(text);
        let foo = named(&symbols, "Foo")[0];
        assert_eq!(foo.kind, SymbolKind::Function);
        assert_eq!(&text[foo.range.clone()], "Func Foo()\n\tReturn 1\nEndFunc");
    }

    #[test]
    fn test_unterminated_function_omitted() {
        let symbols = extract("Func Open()\n\tLocal $x");
        assert!(named(&symbols, "Open").is_empty());
        // Its variables still appear, without a container
        assert_eq!(named(&symbols, "$x")[0].container_name, None);
    }

    #[test]
    fn test_duplicate_functions_reported_once() {
        let symbols = extract("Func A()\nEndFunc\nFunc a()\nEndFunc");
        let fns: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Function)
            .collect();
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "A");
    }

    #[test]
    fn test_unterminated_duplicate_does_not_hide_later_definition() {
        let text = "Func A()\nFunc a($x)\nEndFunc";
        let symbols = extract(text);
        let fns: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Function)
            .collect();
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "a");
        assert_eq!(&text[fns[0].range.clone()], "Func a($x)\nEndFunc");
    }

    #[test]
    fn test_function_end_stops_at_next_header() {
        assert_eq!(function_end("Func A()\nEndFunc", 0), Some(16));
        assert_eq!(function_end("Func A()\nFunc B()\nEndFunc", 0), None);
        assert_eq!(function_end("Func A()\n\tLocal $f = 1\nEndFunc", 0), Some(30));
    }

    #[test]
    fn test_variables_attributed_to_enclosing_function() {
        let text = "Global $g\nFunc One()\n\tLocal $i = 1\nEndFunc\nFunc Two()\n\tLocal $i = 2\nEndFunc";
        let symbols = extract(text);
        let is: Vec<_> = named(&symbols, "$i");
        assert_eq!(is.len(), 2);
        assert_eq!(is[0].container_name.as_deref(), Some("One"));
        assert_eq!(is[1].container_name.as_deref(), Some("Two"));
        assert_eq!(named(&symbols, "$g")[0].container_name, None);
    }

    #[test]
    fn test_variable_dedup_is_case_insensitive() {
        let symbols = extract("Local $Count = 0\n$count += 1\n$COUNT += 1");
        let vars: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Variable)
            .collect();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "$Count");
    }

    #[test]
    fn test_variables_in_strings_and_comments_skipped() {
        let symbols = extract("Local $real = \"$fake\" & '$alsoFake' ; $comment");
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["$real"]);
    }

    #[test]
    fn test_const_and_enum_kinds_hold_across_continuation() {
        let text = "Global Const $A = 1, _\n\t$B = 2\nLocal Enum $X, $Y\nLocal $plain";
        let symbols = extract(text);
        assert_eq!(named(&symbols, "$A")[0].kind, SymbolKind::Constant);
        assert_eq!(named(&symbols, "$B")[0].kind, SymbolKind::Constant);
        assert_eq!(named(&symbols, "$X")[0].kind, SymbolKind::Enum);
        assert_eq!(named(&symbols, "$Y")[0].kind, SymbolKind::Enum);
        assert_eq!(named(&symbols, "$plain")[0].kind, SymbolKind::Variable);
    }

    #[test]
    fn test_region_symbol() {
        let text = "#Region - Foo\nLocal $a\n#EndRegion\n";
        let symbols = extract(text);
        let regions: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Namespace)
            .collect();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name, "Foo");
        assert_eq!(&text[regions[0].range.clone()], "#Region - Foo\nLocal $a\n#EndRegion");
    }

    #[test]
    fn test_nested_same_name_regions_reported_once() {
        let text = "#Region Foo\n#Region Foo\n#EndRegion\n#EndRegion";
        let symbols = extract(text);
        let regions: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Namespace)
            .collect();
        assert_eq!(regions.len(), 1);
        // The outer region matches the outer #EndRegion
        assert_eq!(regions[0].range, 0..text.len());
    }

    #[test]
    fn test_unmatched_region_omitted() {
        let symbols = extract("#Region Open\nLocal $a");
        assert!(symbols.iter().all(|s| s.kind != SymbolKind::Namespace));
    }

    #[test]
    fn test_block_comments_hide_everything() {
        let text = "#cs\nFunc Hidden()\nEndFunc\nLocal $hidden\n#Region R\n#EndRegion\n#ce\nLocal $shown";
        let names: Vec<_> = extract(text).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["$shown"]);
    }

    #[test]
    fn test_options_disable_variables_and_regions() {
        let options = SymbolOptions {
            show_variables: false,
            show_regions: false,
            max_lines: 100,
        };
        let text = "#Region R\nLocal $a\nFunc F()\nEndFunc\n#EndRegion";
        let symbols = extract_document_symbols(text, &options);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "F");
    }

    #[test]
    fn test_max_lines_limits_scan() {
        let options = SymbolOptions {
            max_lines: 1,
            ..SymbolOptions::default()
        };
        let symbols = extract_document_symbols("Local $a\nLocal $b", &options);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "$a");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let text = "#Region A\nFunc F($p)\n\tLocal $q\nEndFunc\n#EndRegion\nGlobal $r";
        assert_eq!(extract(text), extract(text));
    }
}
