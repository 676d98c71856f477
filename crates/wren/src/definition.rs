//
// definition.rs
//
// Go-to-definition search over a document and its include graph
//

use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::cross_file::ContentProvider;
use crate::lexical;
use crate::signature::{find_function_definitions, match_function_line};

/// Where a definition was found. `path` is `None` for the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSite {
    pub path: Option<PathBuf>,
    /// Byte offset in that file
    pub offset: usize,
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^[\t ]*(?:(?:Local|Global|Dim|Static)|(?:Const|Enum))\b").unwrap()
    })
}

/// Word under byte column `col` of `line`, with its `$` or `@` sigil if any.
pub fn word_at(line: &str, col: usize) -> Option<(Range<usize>, &str)> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let col = col.min(line.len());
    if !line.is_char_boundary(col) {
        return None;
    }
    // Cursor on the sigil itself
    let col = match line[col..].chars().next() {
        Some('$') | Some('@') => col + 1,
        _ => col,
    };

    let start = line[..col]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word(*c))
        .last()
        .map_or(col, |(i, _)| i);
    let end = line[col..]
        .char_indices()
        .find(|(_, c)| !is_word(*c))
        .map_or(line.len(), |(i, _)| col + i);

    let start = match line[..start].chars().next_back() {
        Some('$') | Some('@') => start - 1,
        _ => start,
    };
    let word = &line[start..end];
    if word.is_empty() || word == "$" || word == "@" {
        return None;
    }
    Some((start..end, word))
}

fn variable_pattern(name: &str) -> Option<Regex> {
    // Strings and comments are matched so occurrences inside them are skipped
    Regex::new(&format!(
        r#""[^"\r\n]*"|'[^'\r\n]*'|;.*|(?i:({})\b)"#,
        regex::escape(name)
    ))
    .ok()
}

fn find_in_line(pattern: &Regex, line: &str) -> Option<usize> {
    pattern
        .captures_iter(line)
        .find_map(|caps| caps.get(1))
        .map(|m| m.start())
}

/// Offset of the declaration of variable `name` (`Local`, `Global`, `Dim`,
/// `Static`, `Const`, `Enum`, or a function parameter), following ` _`
/// continuations of a declaration.
pub fn find_variable_declaration(text: &str, name: &str) -> Option<usize> {
    let pattern = variable_pattern(name)?;
    let mut in_declaration = false;
    for (_, offset, line) in lexical::code_lines(text) {
        let declares = in_declaration
            || declaration_pattern().is_match(line)
            || match_function_line(line).is_some();
        if declares {
            if let Some(col) = find_in_line(&pattern, line) {
                return Some(offset + col);
            }
        }
        in_declaration = declares && lexical::has_continuation(line);
    }
    None
}

/// Offset of the first code occurrence of variable `name`.
pub fn find_first_occurrence(text: &str, name: &str) -> Option<usize> {
    let pattern = variable_pattern(name)?;
    lexical::code_lines(text)
        .find_map(|(_, offset, line)| find_in_line(&pattern, line).map(|col| offset + col))
}

/// Offset of the first `Func name` definition, case-insensitively.
pub fn find_function(text: &str, name: &str) -> Option<usize> {
    find_function_definitions(text)
        .into_iter()
        .find(|def| def.name.eq_ignore_ascii_case(name))
        .map(|def| def.offset)
}

/// Definition of `word` as seen from a document.
///
/// The document itself is searched first. For variables a declaration is
/// preferred, falling back to the first occurrence. Included files, in
/// discovery order, are then searched for functions and declarations only.
/// Macros have no definition.
pub fn find_definition(
    text: &str,
    word: &str,
    reachable: &[PathBuf],
    provider: &dyn ContentProvider,
) -> Option<DefinitionSite> {
    if word.starts_with('@') {
        return None;
    }
    let is_variable = word.starts_with('$');
    let search = |content: &str| {
        if is_variable {
            find_variable_declaration(content, word)
        } else {
            find_function(content, word)
        }
    };

    if let Some(offset) = search(text) {
        return Some(DefinitionSite { path: None, offset });
    }

    for path in reachable {
        let Some(content) = provider.get_content(path) else {
            continue;
        };
        if let Some(offset) = search(&content) {
            log::trace!("Definition of {} found in {}", word, path.display());
            return Some(DefinitionSite {
                path: Some(path.clone()),
                offset,
            });
        }
    }

    if is_variable {
        return find_first_occurrence(text, word).map(|offset| DefinitionSite { path: None, offset });
    }
    None
}

/// Definition target for an `#include` line: the resolved file at offset 0.
pub fn include_target(path: &Path) -> DefinitionSite {
    DefinitionSite {
        path: Some(path.to_path_buf()),
        offset: 0,
    }
}
