//
// lexical.rs
//
// Line-level classification for AutoIt source: comments, directives, regions
//

/// Returns the line with leading whitespace removed.
fn leading_trimmed(line: &str) -> &str {
    line.trim_start()
}

/// Case-insensitive check that `line` starts with `keyword` and that the
/// keyword is not followed by more identifier characters.
fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    let head = match line.get(..keyword.len()) {
        Some(h) => h,
        None => return false,
    };
    if !head.eq_ignore_ascii_case(keyword) {
        return false;
    }
    match line[keyword.len()..].chars().next() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '_' || c == '-'),
    }
}

/// `#cs` or `#comments-start`
pub fn is_block_comment_start(line: &str) -> bool {
    let t = leading_trimmed(line);
    starts_with_keyword(t, "#cs") || starts_with_keyword(t, "#comments-start")
}

/// `#ce` or `#comments-end`
pub fn is_block_comment_end(line: &str) -> bool {
    let t = leading_trimmed(line);
    starts_with_keyword(t, "#ce") || starts_with_keyword(t, "#comments-end")
}

pub fn is_region_start(line: &str) -> bool {
    starts_with_keyword(leading_trimmed(line), "#region")
}

pub fn is_region_end(line: &str) -> bool {
    starts_with_keyword(leading_trimmed(line), "#endregion")
}

/// Whether a line carries no declarations of interest.
///
/// Blank lines, `;` comments and `#` directives are skippable. Block comment
/// markers are not, since callers need them to track comment state.
pub fn is_skippable(line: &str) -> bool {
    let t = leading_trimmed(line);
    match t.chars().next() {
        None => true,
        Some(';') => true,
        Some('#') => !(is_block_comment_start(t) || is_block_comment_end(t)),
        Some(_) => false,
    }
}

/// Tracks whether the scanner is inside a `#cs` ... `#ce` block.
///
/// AutoIt accepts nested blocks, so this is a depth counter. Without nesting
/// it behaves as a simple toggle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockCommentState {
    depth: usize,
}

impl BlockCommentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_comment(&self) -> bool {
        self.depth > 0
    }

    /// Feed one line. Returns `true` when the line is part of a comment block,
    /// including the markers themselves.
    pub fn observe(&mut self, line: &str) -> bool {
        if is_block_comment_start(line) {
            self.depth += 1;
            return true;
        }
        if is_block_comment_end(line) {
            if self.depth > 0 {
                self.depth -= 1;
                return true;
            }
            // Stray #ce outside any block
            return false;
        }
        self.in_comment()
    }
}

/// Yields `(line_index, byte_offset, line)` for each line outside block
/// comments. Line terminators are stripped from `line`.
pub fn code_lines(text: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut state = BlockCommentState::new();
    lines_with_offsets(text).filter(move |(_, _, line)| !state.observe(line))
}

/// Split text into lines, keeping the byte offset of each line start.
/// `\r\n` and `\n` terminators are stripped.
pub fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut offset = 0usize;
    text.split_inclusive('\n').enumerate().map(move |(idx, raw)| {
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        (idx, start, line)
    })
}

/// Whether a line continues onto the next one (` _` at the end, optionally
/// followed by a comment).
pub fn has_continuation(line: &str) -> bool {
    let code = strip_line_comment(line).trim_end();
    match code.strip_suffix('_') {
        Some(rest) => rest.is_empty() || rest.ends_with(char::is_whitespace),
        None => false,
    }
}

/// Drop a trailing `;` comment, respecting quoted strings.
pub fn strip_line_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ';' => return &line[..i],
            None => {}
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_lines() {
        assert!(is_skippable(""));
        assert!(is_skippable("   \t"));
        assert!(is_skippable("; a comment"));
        assert!(is_skippable("  ;indented comment"));
        assert!(is_skippable("#include <Array.au3>"));
        assert!(is_skippable("#Region Helpers"));
        assert!(!is_skippable("Local $x = 1"));
        assert!(!is_skippable("Func Foo()"));
    }

    #[test]
    fn test_block_markers_are_not_skippable() {
        assert!(!is_skippable("#cs"));
        assert!(!is_skippable("  #CE"));
        assert!(!is_skippable("#comments-start"));
        assert!(!is_skippable("#Comments-End"));
    }

    #[test]
    fn test_block_marker_needs_word_boundary() {
        assert!(!is_block_comment_start("#csv"));
        assert!(!is_block_comment_end("#center"));
        assert!(is_block_comment_start("#cs ; start"));
    }

    #[test]
    fn test_region_markers() {
        assert!(is_region_start("#Region - Foo"));
        assert!(is_region_start("  #region"));
        assert!(!is_region_start("#Regional"));
        assert!(is_region_end("#EndRegion"));
        assert!(is_region_end("#endregion ; Foo"));
    }

    #[test]
    fn test_block_comment_state_nesting() {
        let mut state = BlockCommentState::new();
        assert!(!state.observe("Local $a"));
        assert!(state.observe("#cs"));
        assert!(state.observe("#cs"));
        assert!(state.observe("Func Hidden()"));
        assert!(state.observe("#ce"));
        assert!(state.in_comment());
        assert!(state.observe("#ce"));
        assert!(!state.in_comment());
        assert!(!state.observe("Local $b"));
    }

    #[test]
    fn test_stray_block_end_is_ignored() {
        let mut state = BlockCommentState::new();
        assert!(!state.observe("#ce"));
        assert!(!state.in_comment());
    }

    #[test]
    fn test_code_lines_skips_comment_blocks() {
        let text = "a\r\n#cs\nb\n#ce\nc";
        let lines: Vec<_> = code_lines(text).collect();
        assert_eq!(lines, vec![(0, 0, "a"), (4, 13, "c")]);
    }

    #[test]
    fn test_continuation() {
        assert!(has_continuation("Local $a = 1, _"));
        assert!(has_continuation("Local $a = 1, _ ; note"));
        assert!(!has_continuation("Local $a_"));
        assert!(!has_continuation("Local $s = \"; _\""));
    }

    #[test]
    fn test_strip_line_comment_respects_strings() {
        assert_eq!(strip_line_comment("$a = 1 ; x"), "$a = 1 ");
        assert_eq!(strip_line_comment("$a = \"x;y\""), "$a = \"x;y\"");
        assert_eq!(strip_line_comment("$a = 'it''s;' ; c"), "$a = 'it''s;' ");
    }
}
