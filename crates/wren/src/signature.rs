//
// signature.rs
//
// Function definition discovery and signature extraction
//

use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

use crate::lexical::{self, BlockCommentState};
use crate::udf_header;

/// One parameter of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Name with `$`, without `ByRef`/`Const` or default value
    pub name: String,
    pub documentation: Option<String>,
}

/// Callable shape of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Name as spelled at the definition
    pub name: String,
    /// `name(params)` as displayed to the user
    pub label: String,
    pub documentation: String,
    /// Keyed by parameter name; declaration order, last duplicate wins
    pub parameters: IndexMap<String, Parameter>,
    /// Byte offset of the definition in its file; `None` for built-ins
    pub offset: Option<usize>,
}

impl Signature {
    pub fn parameter_at(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get_index(index).map(|(_, p)| p)
    }
}

/// Signatures keyed by lower-cased function name.
pub type SignatureMap = IndexMap<String, Signature>;

/// A parameter entry taken apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedParameter {
    pub name: String,
    pub by_ref: bool,
    pub is_const: bool,
    pub default: Option<String>,
}

/// A `Func` line located in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: String,
    /// Text between the parentheses, continuation lines joined
    pub params_text: String,
    /// 0-based line of the `Func` keyword
    pub line: usize,
    /// Byte offset of the start of that line
    pub offset: usize,
}

fn func_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^[\t ]*(?:volatile[\t ]+)?func[\t ]+(\w+)[\t ]*\(").unwrap())
}

/// Match a single line as a function definition head. Returns the name and
/// the byte index just past the opening parenthesis.
pub fn match_function_line(line: &str) -> Option<(&str, usize)> {
    let caps = func_pattern().captures(line)?;
    let name = caps.get(1)?.as_str();
    Some((name, caps.get(0)?.end()))
}

/// Scan `text` from the start of the parameter list to its closing paren.
/// Returns the collected text and whether the paren was closed.
fn collect_params(text: &str, depth: &mut usize, out: &mut String) -> bool {
    let mut quote: Option<char> = None;
    for c in text.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                ';' => return false,
                '(' => *depth += 1,
                ')' => {
                    if *depth == 0 {
                        return true;
                    }
                    *depth -= 1;
                }
                _ => {}
            },
        }
        out.push(c);
    }
    false
}

/// Find every function definition outside block comments, in document order.
///
/// Parameter lists continued with ` _` are joined.
pub fn find_function_definitions(text: &str) -> Vec<FunctionDefinition> {
    let lines: Vec<(usize, usize, &str)> = lexical::lines_with_offsets(text).collect();
    let mut comments = BlockCommentState::new();
    let mut defs = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let (line_num, offset, line) = lines[idx];
        idx += 1;
        if comments.observe(line) {
            continue;
        }
        let Some((name, params_start)) = match_function_line(line) else {
            continue;
        };

        let mut params_text = String::new();
        let mut depth = 0usize;
        let mut rest = &line[params_start..];
        let mut current = line;
        loop {
            if collect_params(rest, &mut depth, &mut params_text) {
                break;
            }
            if !lexical::has_continuation(current) || idx >= lines.len() {
                break;
            }
            // Drop the trailing ` _` before joining the next line
            let trimmed = params_text.trim_end();
            let trimmed = trimmed.strip_suffix('_').unwrap_or(trimmed);
            params_text = format!("{} ", trimmed.trim_end());
            current = lines[idx].2;
            rest = current.trim_start();
            idx += 1;
        }

        defs.push(FunctionDefinition {
            name: name.to_string(),
            params_text: params_text.trim().to_string(),
            line: line_num,
            offset,
        });
    }

    defs
}

/// Split a parameter list on top-level commas. Commas inside nested
/// parentheses or string literals do not split.
pub fn split_parameters(params_text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;

    for (i, c) in params_text.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(params_text[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(params_text[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    let rest = &text[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Take one parameter entry apart: `ByRef Const $x = 5` → `$x`, by-ref,
/// const, default `5`.
pub fn parse_parameter(entry: &str) -> Option<ParsedParameter> {
    let mut rest = entry.trim();
    let mut by_ref = false;
    let mut is_const = false;
    loop {
        if let Some(r) = strip_keyword(rest, "byref") {
            by_ref = true;
            rest = r;
        } else if let Some(r) = strip_keyword(rest, "const") {
            is_const = true;
            rest = r;
        } else {
            break;
        }
    }

    let (name, default) = match rest.split_once('=') {
        Some((n, d)) => (n.trim(), Some(d.trim().to_string())),
        None => (rest.trim(), None),
    };
    if name.is_empty() {
        return None;
    }
    Some(ParsedParameter {
        name: name.to_string(),
        by_ref,
        is_const,
        default: default.filter(|d| !d.is_empty()),
    })
}

/// Build a signature from a definition, using a UDF header above it when
/// its `Name` matches the function.
pub fn build_signature(def: &FunctionDefinition, lines: &[&str], file_label: &str) -> Signature {
    let header = udf_header::parse_header_above(lines, def.line).filter(|h| {
        h.name
            .as_deref()
            .map_or(true, |n| n.eq_ignore_ascii_case(&def.name))
    });

    let entries = split_parameters(&def.params_text);
    let mut parameters = IndexMap::new();
    for entry in &entries {
        if let Some(parsed) = parse_parameter(entry) {
            let documentation = header
                .as_ref()
                .and_then(|h| h.param_doc(&parsed.name))
                .map(str::to_string);
            parameters.insert(
                parsed.name.clone(),
                Parameter {
                    name: parsed.name,
                    documentation,
                },
            );
        }
    }

    let documentation = header
        .and_then(|h| h.description)
        .unwrap_or_else(|| format!("Included from {file_label}"));

    Signature {
        name: def.name.clone(),
        label: format!("{}({})", def.name, entries.join(", ")),
        documentation,
        parameters,
        offset: Some(def.offset),
    }
}

/// Extract every function signature in a file. Later definitions of the same
/// name (case-insensitive) replace earlier ones.
pub fn extract_signatures(file_text: &str, file_label: &str) -> SignatureMap {
    let lines: Vec<&str> = lexical::lines_with_offsets(file_text)
        .map(|(_, _, line)| line)
        .collect();
    let mut signatures = SignatureMap::new();
    for def in find_function_definitions(file_text) {
        let sig = build_signature(&def, &lines, file_label);
        log::trace!("  Extracted signature {} from {}", sig.label, file_label);
        signatures.insert(def.name.to_lowercase(), sig);
    }
    signatures
}
