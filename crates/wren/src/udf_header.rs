//
// udf_header.rs
//
// UDF header comment blocks: parsing the `; #FUNCTION# ===` block above a
// function definition, and generating a fresh one for the insert-header command.
//
// A header is a run of contiguous `;` lines. Labelled lines have the shape
// `; Label ....: text`; unlabelled `;` lines continue the previous label.
//

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::signature::ParsedParameter;

/// Parsed header fields. Parameter keys are lower-cased names with `$`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdfHeader {
    pub name: Option<String>,
    pub description: Option<String>,
    pub syntax: Option<String>,
    pub params: HashMap<String, String>,
}

impl UdfHeader {
    pub fn param_doc(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.syntax.is_none()
    }
}

struct HeaderPatterns {
    label: Regex,
    param: Regex,
}

fn patterns() -> &'static HeaderPatterns {
    static PATTERNS: OnceLock<HeaderPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HeaderPatterns {
        label: Regex::new(r"^[\t ]*;[\t ]*([A-Za-z][A-Za-z ]*?)[\t ]*\.+[\t ]*:[\t ]?(.*)$").unwrap(),
        param: Regex::new(r"(?i)^(?:(?:ByRef|Const)[\t ]+)*(\$\w+)[^-]*?-[\t ]*(.*)$").unwrap(),
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
    Syntax,
    Parameters,
    Other,
}

fn field_for(label: &str) -> Field {
    match label.trim().to_ascii_lowercase().as_str() {
        "name" => Field::Name,
        "description" => Field::Description,
        "syntax" => Field::Syntax,
        "parameters" => Field::Parameters,
        _ => Field::Other,
    }
}

/// Text of a `;` line with the comment marker and surrounding space removed.
fn comment_body(line: &str) -> &str {
    line.trim_start()
        .strip_prefix(';')
        .map(str::trim)
        .unwrap_or("")
}

fn append(target: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

/// Parse the header block directly above `func_line` (0-based index into
/// `lines`). Returns `None` when there is no contiguous `;` block with at
/// least a `Name`, `Description` or `Syntax` label.
pub fn parse_header_above(lines: &[&str], func_line: usize) -> Option<UdfHeader> {
    if func_line == 0 || func_line > lines.len() {
        return None;
    }

    let mut start = func_line;
    while start > 0 && lines[start - 1].trim_start().starts_with(';') {
        start -= 1;
    }
    if start == func_line {
        return None;
    }

    let header = parse_header_lines(&lines[start..func_line]);
    (!header.is_empty()).then_some(header)
}

/// Parse a block of `;` lines into header fields.
pub fn parse_header_lines(block: &[&str]) -> UdfHeader {
    let pats = patterns();
    let mut header = UdfHeader::default();
    let mut description = String::new();
    let mut field = Field::Other;
    let mut current_param: Option<String> = None;

    for line in block {
        let (text, labelled) = match pats.label.captures(line) {
            Some(caps) => {
                field = field_for(&caps[1]);
                current_param = None;
                (caps.get(2).map_or("", |m| m.as_str()).trim().to_string(), true)
            }
            None => {
                let body = comment_body(line);
                if body.starts_with('#') || body.starts_with("==") {
                    field = Field::Other;
                    current_param = None;
                }
                (body.to_string(), false)
            }
        };

        match field {
            Field::Name if labelled => {
                if !text.is_empty() {
                    header.name = Some(text);
                }
            }
            Field::Description => append(&mut description, &text),
            Field::Syntax if labelled => {
                if !text.is_empty() {
                    header.syntax = Some(text);
                }
            }
            Field::Parameters => {
                if let Some(caps) = pats.param.captures(&text) {
                    let key = caps[1].to_lowercase();
                    header.params.insert(key.clone(), caps[2].trim().to_string());
                    current_param = Some(key);
                } else if let Some(key) = &current_param {
                    if let Some(doc) = header.params.get_mut(key) {
                        append(doc, &text);
                    }
                }
            }
            _ => {}
        }
    }

    if !description.is_empty() {
        header.description = Some(description);
    }
    header
}

fn label_line(label: &str, text: &str) -> String {
    let dots = ".".repeat(14usize.saturating_sub(label.len()).max(1));
    if text.is_empty() {
        format!("; {label} {dots}:")
    } else {
        format!("; {label} {dots}: {text}")
    }
}

/// Syntax line with optional parameters in nested brackets:
/// `Foo($a[, $b = 5[, $c = 0]])`
fn syntax_for(name: &str, params: &[ParsedParameter]) -> String {
    let mut out = format!("{name}(");
    let mut optional = 0usize;
    for (i, p) in params.iter().enumerate() {
        let mut shown = String::new();
        if p.by_ref {
            shown.push_str("ByRef ");
        }
        shown.push_str(&p.name);
        if let Some(default) = &p.default {
            shown.push_str(" = ");
            shown.push_str(default);
            out.push('[');
            optional += 1;
        }
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&shown);
    }
    out.push_str(&"]".repeat(optional));
    out.push(')');
    out
}

const RULE: &str = "===============================================================================================================================";

/// Generate a header block for a function, one line per element, no trailing
/// newline on the last line.
pub fn generate_header(name: &str, params: &[ParsedParameter]) -> Vec<String> {
    let mut lines = vec![
        format!("; #FUNCTION# {}", &RULE[11..]),
        label_line("Name", name),
        label_line("Description", ""),
        label_line("Syntax", &syntax_for(name, params)),
    ];

    if params.is_empty() {
        lines.push(label_line("Parameters", "None"));
    } else {
        for (i, p) in params.iter().enumerate() {
            let mut doc = String::new();
            if p.by_ref {
                doc.push_str("[in/out] ");
            }
            if p.default.is_some() {
                doc.push_str("[optional] ");
            }
            doc.push_str("A value.");
            if let Some(default) = &p.default {
                doc.push_str(&format!(" Default is {default}."));
            }
            let entry = format!("{:<20} - {}", p.name, doc);
            if i == 0 {
                lines.push(label_line("Parameters", &entry));
            } else {
                lines.push(format!(";{}{}", " ".repeat(18), entry));
            }
        }
    }

    for label in [
        "Return values",
        "Author",
        "Modified",
        "Remarks",
        "Related",
        "Link",
    ] {
        lines.push(label_line(label, ""));
    }
    lines.push(label_line("Example", "No"));
    lines.push(format!("; {RULE}"));
    lines
}
