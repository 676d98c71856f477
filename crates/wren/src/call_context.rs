//
// call_context.rs
//
// Detects the enclosing call and active argument at the cursor for
// signature help. A single forward pass over the text before the cursor
// keeps a stack of open brackets; strings and comments are skipped by a
// small state machine.
//

use crate::lexical;

/// Enclosing call at the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Callee name, `None` when the cursor is not inside a named call
    pub function_name: Option<String>,
    /// 0-based index of the argument under the cursor
    pub argument_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FsmState {
    Normal,
    DoubleQuoted,
    SingleQuoted,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BracketKind {
    Paren,
    Square,
}

#[derive(Debug, Clone)]
struct Frame {
    kind: BracketKind,
    name: Option<String>,
    commas: usize,
}

/// Words that may directly precede `(` without being a call.
const NON_CALL_KEYWORDS: &[&str] = &[
    "and", "case", "elseif", "if", "in", "not", "or", "return", "select", "step", "switch",
    "then", "to", "until", "while", "with",
];

/// Identifier (optionally `$`-prefixed) ending at byte `end` of `text`.
fn identifier_before(text: &str, end: usize) -> Option<String> {
    let head = text[..end].trim_end();
    let start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)?;
    let start = if head[..start].ends_with('$') {
        start - 1
    } else {
        start
    };
    let ident = &head[start..];
    if NON_CALL_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(ident))
    {
        return None;
    }
    Some(ident.to_string())
}

/// Resolve the call context for `text_up_to_cursor`.
///
/// `Outer(Inner(1,2), ` yields `Outer` at argument 1. Commas inside string
/// literals, nested calls or `[...]` subscripts do not count.
pub fn resolve_call_context(text_up_to_cursor: &str) -> CallContext {
    let mut stack: Vec<Frame> = Vec::new();
    let mut state = FsmState::Normal;
    let mut chars = text_up_to_cursor.char_indices().peekable();
    let mut prev_significant: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        match state {
            FsmState::Comment => {
                if c == '\n' {
                    state = FsmState::Normal;
                }
                continue;
            }
            FsmState::DoubleQuoted | FsmState::SingleQuoted => {
                let quote = if state == FsmState::DoubleQuoted { '"' } else { '\'' };
                if c == quote {
                    // A doubled quote is an escaped quote
                    if chars.peek().map(|(_, n)| *n) == Some(quote) {
                        chars.next();
                    } else {
                        state = FsmState::Normal;
                        prev_significant = Some(c);
                    }
                }
                continue;
            }
            FsmState::Normal => {}
        }

        match c {
            '"' => state = FsmState::DoubleQuoted,
            '\'' => state = FsmState::SingleQuoted,
            ';' => state = FsmState::Comment,
            '(' => {
                let name = if prev_significant == Some('(') {
                    stack.last().and_then(|f| f.name.clone())
                } else {
                    identifier_before(text_up_to_cursor, i)
                };
                stack.push(Frame {
                    kind: BracketKind::Paren,
                    name,
                    commas: 0,
                });
            }
            '[' => stack.push(Frame {
                kind: BracketKind::Square,
                name: None,
                commas: 0,
            }),
            ')' | ']' => {
                stack.pop();
            }
            ',' => {
                if let Some(top) = stack.last_mut() {
                    top.commas += 1;
                }
            }
            _ => {}
        }
        if !c.is_whitespace() {
            prev_significant = Some(c);
        }
    }

    stack
        .iter()
        .rev()
        .find(|f| f.kind == BracketKind::Paren)
        .map(|f| CallContext {
            function_name: f.name.clone(),
            argument_index: f.commas,
        })
        .unwrap_or_default()
}

/// Text of line `line` up to byte `byte_col`, preceded by any lines it
/// continues (` _` endings). Continuation markers and their trailing
/// comments are removed.
pub fn continued_line_prefix(text: &str, line: usize, byte_col: usize) -> String {
    let lines: Vec<&str> = lexical::lines_with_offsets(text)
        .map(|(_, _, l)| l)
        .collect();
    let Some(current) = lines.get(line) else {
        return String::new();
    };
    let mut col = byte_col.min(current.len());
    while !current.is_char_boundary(col) {
        col -= 1;
    }

    let mut first = line;
    while first > 0 && lexical::has_continuation(lines[first - 1]) {
        first -= 1;
    }

    let mut joined = String::new();
    for prev in &lines[first..line] {
        let code = lexical::strip_line_comment(prev).trim_end();
        let code = code.strip_suffix('_').unwrap_or(code);
        joined.push_str(code);
        joined.push(' ');
    }
    joined.push_str(&current[..col]);
    joined
}
