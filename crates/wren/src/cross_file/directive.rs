//
// cross_file/directive.rs
//
// #include directive parsing and include fingerprints
//

use regex::Regex;
use std::sync::OnceLock;

use crate::lexical::BlockCommentState;

/// How an include names its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IncludeKind {
    /// `#include "file.au3"`: document directory first, library last
    Quoted,
    /// `#include <File.au3>`: library directory first
    Bracketed,
}

/// One `#include` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    pub kind: IncludeKind,
    /// File spec exactly as written between the delimiters
    pub spec: String,
    /// 0-based line of the directive
    pub line: u32,
}

/// Order-insensitive identity of a document's include list.
///
/// Two documents have equal fingerprints exactly when their directive lists
/// are equal as multisets (include names compared case-insensitively).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IncludeFingerprint(Vec<(IncludeKind, String)>);

impl IncludeFingerprint {
    pub fn from_directives(directives: &[IncludeDirective]) -> Self {
        let mut entries: Vec<(IncludeKind, String)> = directives
            .iter()
            .map(|d| (d.kind, d.spec.to_lowercase()))
            .collect();
        entries.sort();
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn include_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Groups: 1=quoted spec (double), 2=quoted spec (single), 3=bracketed spec
        Regex::new(
            r#"(?i)^[\t ]*#include[\t ]*(?:"([^"\r\n]+)"|'([^'\r\n]+)'|<([^>\r\n]+)>)[\t ]*(?:;.*)?$"#,
        )
        .unwrap()
    })
}

/// Parse a single line as an include directive.
///
/// `#include-once` and anything not matching the directive shape yields `None`.
pub fn parse_include_line(line: &str, line_num: u32) -> Option<IncludeDirective> {
    let caps = include_pattern().captures(line)?;
    let (kind, spec) = if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
        (IncludeKind::Quoted, m.as_str())
    } else {
        (IncludeKind::Bracketed, caps.get(3)?.as_str())
    };
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }
    Some(IncludeDirective {
        kind,
        spec: spec.to_string(),
        line: line_num,
    })
}

/// Collect include directives in document order, ignoring those inside
/// `#cs`/`#ce` blocks.
pub fn parse_includes(content: &str) -> Vec<IncludeDirective> {
    log::trace!("Starting include directive parsing");
    let mut comments = BlockCommentState::new();
    let mut includes = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        if comments.observe(line) {
            continue;
        }
        if let Some(directive) = parse_include_line(line, line_num as u32) {
            log::trace!(
                "  Parsed include at line {}: kind={:?} spec='{}'",
                line_num,
                directive.kind,
                directive.spec
            );
            includes.push(directive);
        }
    }

    includes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_and_bracketed() {
        let content = "#include \"lib\\Helpers.au3\"\n#include <Array.au3>\n";
        let includes = parse_includes(content);
        assert_eq!(includes.len(), 2);
        assert_eq!(includes[0].kind, IncludeKind::Quoted);
        assert_eq!(includes[0].spec, "lib\\Helpers.au3");
        assert_eq!(includes[0].line, 0);
        assert_eq!(includes[1].kind, IncludeKind::Bracketed);
        assert_eq!(includes[1].spec, "Array.au3");
        assert_eq!(includes[1].line, 1);
    }

    #[test]
    fn test_case_whitespace_and_trailing_comment() {
        let d = parse_include_line("   #INCLUDE   'x.au3'   ; helpers", 4).unwrap();
        assert_eq!(d.kind, IncludeKind::Quoted);
        assert_eq!(d.spec, "x.au3");
        assert_eq!(d.line, 4);
    }

    #[test]
    fn test_include_once_is_not_an_include() {
        assert!(parse_include_line("#include-once", 0).is_none());
        assert!(parse_include_line("; #include <Array.au3>", 0).is_none());
        assert!(parse_include_line("#include", 0).is_none());
        assert!(parse_include_line("#include \"\"", 0).is_none());
    }

    #[test]
    fn test_includes_inside_block_comment_are_ignored() {
        let content = "#cs\n#include <Hidden.au3>\n#ce\n#include <Shown.au3>";
        let includes = parse_includes(content);
        assert_eq!(includes.len(), 1);
        assert_eq!(includes[0].spec, "Shown.au3");
        assert_eq!(includes[0].line, 3);
    }

    #[test]
    fn test_fingerprint_ignores_order_and_case() {
        let a = parse_includes("#include <Array.au3>\n#include \"a.au3\"");
        let b = parse_includes("#include \"A.AU3\"\n#include <array.au3>");
        assert_eq!(
            IncludeFingerprint::from_directives(&a),
            IncludeFingerprint::from_directives(&b)
        );
    }

    #[test]
    fn test_fingerprint_is_a_multiset() {
        // Same distinct members, different multiplicities
        let a = parse_includes("#include \"a.au3\"\n#include \"a.au3\"\n#include \"b.au3\"");
        let b = parse_includes("#include \"a.au3\"\n#include \"b.au3\"\n#include \"b.au3\"");
        assert_ne!(
            IncludeFingerprint::from_directives(&a),
            IncludeFingerprint::from_directives(&b)
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_kind() {
        let a = parse_includes("#include \"a.au3\"");
        let b = parse_includes("#include <a.au3>");
        assert_ne!(
            IncludeFingerprint::from_directives(&a),
            IncludeFingerprint::from_directives(&b)
        );
    }
}
