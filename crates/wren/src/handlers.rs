//
// handlers.rs
//
// LSP request handlers. Each takes a read view of the world state and
// translates between editor coordinates and the core's byte offsets.
//

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tower_lsp::lsp_types::*;

use crate::builtins;
use crate::call_context::{continued_line_prefix, resolve_call_context};
use crate::checker::CheckerReport;
use crate::cross_file::{
    file_label, include_signatures, merged_signatures, parse_include_line, resolve_include_on_line,
    ContentProvider, IncludeEntry,
};
use crate::definition::{find_definition, include_target, word_at, DefinitionSite};
use crate::error::ResolutionError;
use crate::signature::{
    extract_signatures, find_function_definitions, parse_parameter, split_parameters, Signature,
    SignatureMap,
};
use crate::state::WorldState;
use crate::symbols::{self, extract_document_symbols, SymbolOptions};
use crate::udf_header;
use crate::utf16::{
    byte_offset_to_position, byte_range_to_range, line_text, position_to_byte_offset,
    utf16_column_to_byte_offset,
};
use crate::workspace_symbols::{filter_symbols, IndexedSymbol};

// ============================================================================
// Shared helpers
// ============================================================================

/// Include-graph entry for an open document. Documents without a file path
/// (untitled buffers) have no includes.
fn include_entry(state: &WorldState, uri: &Url, text: &str) -> Option<Arc<IncludeEntry>> {
    let path = uri.to_file_path().ok()?;
    let provider = state.content_provider();
    Some(include_signatures(
        uri,
        &path,
        text,
        &state.config,
        &provider,
        &state.include_cache,
    ))
}

/// Built-ins, included and local signatures for a document, local winning.
fn document_signatures(state: &WorldState, uri: &Url, text: &str) -> SignatureMap {
    let label = uri
        .to_file_path()
        .map(|p| file_label(&p))
        .unwrap_or_else(|_| uri.path().to_string());
    let local = extract_signatures(text, &label);
    let included = include_entry(state, uri, text)
        .map(|entry| entry.signatures.clone())
        .unwrap_or_default();
    merged_signatures(builtins::builtin_signatures(), &included, &local)
}

fn signature_markdown(sig: &Signature) -> String {
    let mut value = format!("```autoit\n{}\n```", sig.label);
    if !sig.documentation.is_empty() {
        value.push_str("\n\n");
        value.push_str(&sig.documentation);
    }
    value
}

fn markdown(value: String) -> MarkupContent {
    MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    }
}

/// Word at an LSP position, with its byte range on the line
fn word_at_position(text: &str, position: Position) -> Option<(String, std::ops::Range<usize>)> {
    let line = line_text(text, position.line)?;
    let col = utf16_column_to_byte_offset(line, position.character);
    word_at(line, col).map(|(range, word)| (word.to_string(), range))
}

/// Sigil (`$` or `@`) of the token being typed at `position`, including a
/// lone sigil with nothing after it yet
fn completion_sigil(text: &str, position: Position) -> Option<char> {
    let line = line_text(text, position.line)?;
    let col = utf16_column_to_byte_offset(line, position.character);
    line[..col]
        .trim_end_matches(|c: char| c.is_alphanumeric() || c == '_')
        .chars()
        .next_back()
        .filter(|c| matches!(c, '$' | '@'))
}

fn lsp_symbol_kind(kind: symbols::SymbolKind) -> SymbolKind {
    match kind {
        symbols::SymbolKind::Function => SymbolKind::FUNCTION,
        symbols::SymbolKind::Variable => SymbolKind::VARIABLE,
        symbols::SymbolKind::Constant => SymbolKind::CONSTANT,
        symbols::SymbolKind::Enum => SymbolKind::ENUM,
        symbols::SymbolKind::Namespace => SymbolKind::NAMESPACE,
    }
}

#[allow(deprecated)]
fn symbol_information(
    name: String,
    kind: symbols::SymbolKind,
    container_name: Option<String>,
    location: Location,
) -> SymbolInformation {
    SymbolInformation {
        name,
        kind: lsp_symbol_kind(kind),
        tags: None,
        deprecated: None,
        location,
        container_name,
    }
}

// ============================================================================
// Hover
// ============================================================================

pub fn hover(state: &WorldState, uri: &Url, position: Position) -> Option<Hover> {
    let doc = state.get_document(uri)?;
    let text = doc.text();
    let (word, range) = word_at_position(&text, position)?;

    let contents = if word.starts_with('@') {
        let info = builtins::macro_doc(&word)?;
        format!("```autoit\n{}\n```\n\n{}", word, info)
    } else if word.starts_with('$') {
        return None;
    } else {
        let signatures = document_signatures(state, uri, &text);
        signature_markdown(signatures.get(&word.to_lowercase())?)
    };

    let line_start = position_to_byte_offset(&text, Position::new(position.line, 0));
    let range = Range::new(
        byte_offset_to_position(&text, line_start + range.start),
        byte_offset_to_position(&text, line_start + range.end),
    );
    Some(Hover {
        contents: HoverContents::Markup(markdown(contents)),
        range: Some(range),
    })
}

// ============================================================================
// Completion
// ============================================================================

pub fn completion(state: &WorldState, uri: &Url, position: Position) -> Option<CompletionResponse> {
    let doc = state.get_document(uri)?;
    let text = doc.text();
    let sigil = completion_sigil(&text, position);

    let mut items = Vec::new();

    if sigil == Some('@') {
        for (name, doc) in builtins::macros() {
            items.push(CompletionItem {
                label: name.clone(),
                kind: Some(CompletionItemKind::CONSTANT),
                documentation: Some(Documentation::String(doc.clone())),
                ..Default::default()
            });
        }
        return Some(CompletionResponse::Array(items));
    }

    let options = SymbolOptions {
        show_variables: true,
        ..SymbolOptions::from_config(&state.config)
    };
    let mut seen = HashSet::new();
    for symbol in extract_document_symbols(&text, &options) {
        if symbol.kind == symbols::SymbolKind::Function || symbol.kind == symbols::SymbolKind::Namespace {
            continue;
        }
        if !seen.insert(symbol.name.to_lowercase()) {
            continue;
        }
        items.push(CompletionItem {
            label: symbol.name,
            kind: Some(CompletionItemKind::VARIABLE),
            detail: symbol.container_name,
            ..Default::default()
        });
    }

    if sigil == Some('$') {
        return Some(CompletionResponse::Array(items));
    }

    for sig in document_signatures(state, uri, &text).values() {
        items.push(CompletionItem {
            label: sig.name.clone(),
            kind: Some(CompletionItemKind::FUNCTION),
            detail: Some(sig.label.clone()),
            documentation: Some(Documentation::MarkupContent(markdown(sig.documentation.clone()))),
            ..Default::default()
        });
    }
    for keyword in builtins::keywords() {
        items.push(CompletionItem {
            label: keyword.clone(),
            kind: Some(CompletionItemKind::KEYWORD),
            ..Default::default()
        });
    }

    Some(CompletionResponse::Array(items))
}

// ============================================================================
// Signature Help
// ============================================================================

pub fn signature_help(state: &WorldState, uri: &Url, position: Position) -> Option<SignatureHelp> {
    let doc = state.get_document(uri)?;
    let text = doc.text();
    let line = line_text(&text, position.line)?;
    let col = utf16_column_to_byte_offset(line, position.character);

    let prefix = continued_line_prefix(&text, position.line as usize, col);
    let context = resolve_call_context(&prefix);
    let name = context.function_name?;

    let signatures = document_signatures(state, uri, &text);
    let sig = signatures.get(&name.to_lowercase())?;

    let parameters = sig
        .parameters
        .values()
        .map(|p| ParameterInformation {
            label: ParameterLabel::Simple(p.name.clone()),
            documentation: p.documentation.clone().map(Documentation::String),
        })
        .collect();

    Some(SignatureHelp {
        signatures: vec![SignatureInformation {
            label: sig.label.clone(),
            documentation: Some(Documentation::MarkupContent(markdown(sig.documentation.clone()))),
            parameters: Some(parameters),
            active_parameter: Some(context.argument_index as u32),
        }],
        active_signature: Some(0),
        active_parameter: Some(context.argument_index as u32),
    })
}

// ============================================================================
// Goto Definition
// ============================================================================

fn site_location(state: &WorldState, uri: &Url, text: &str, site: &DefinitionSite) -> Option<Location> {
    let (target_uri, position) = match &site.path {
        None => (uri.clone(), byte_offset_to_position(text, site.offset)),
        Some(path) => {
            let target_uri = Url::from_file_path(path).ok()?;
            let position = if site.offset == 0 {
                Position::new(0, 0)
            } else {
                let content = state.content_provider().get_content(path)?;
                byte_offset_to_position(&content, site.offset)
            };
            (target_uri, position)
        }
    };
    Some(Location {
        uri: target_uri,
        range: Range::new(position, position),
    })
}

/// Definition of the word at the cursor, or the target of an `#include`
/// line.
pub fn goto_definition(
    state: &WorldState,
    uri: &Url,
    position: Position,
) -> Option<GotoDefinitionResponse> {
    let doc = state.get_document(uri)?;
    let text = doc.text();
    let line = line_text(&text, position.line)?;

    if parse_include_line(line, position.line).is_some() {
        let path = uri.to_file_path().ok()?;
        return match resolve_include_on_line(&path, line, position.line, &state.config) {
            Ok(target) => site_location(state, uri, &text, &include_target(&target))
                .map(GotoDefinitionResponse::Scalar),
            Err(e) => {
                log::trace!("goto_definition: {}", e);
                None
            }
        };
    }

    let (word, _) = word_at_position(&text, position)?;
    let reachable = include_entry(state, uri, &text)
        .map(|entry| entry.files.clone())
        .unwrap_or_default();
    let provider = state.content_provider();
    let site = find_definition(&text, &word, &reachable, &provider)?;
    site_location(state, uri, &text, &site).map(GotoDefinitionResponse::Scalar)
}

// ============================================================================
// Symbols
// ============================================================================

pub fn document_symbol(state: &WorldState, uri: &Url) -> Option<DocumentSymbolResponse> {
    let doc = state.get_document(uri)?;
    let text = doc.text();
    let options = SymbolOptions::from_config(&state.config);

    let symbols = extract_document_symbols(&text, &options)
        .into_iter()
        .map(|s| {
            let location = Location {
                uri: uri.clone(),
                range: byte_range_to_range(&text, &s.range),
            };
            symbol_information(s.name, s.kind, s.container_name, location)
        })
        .collect();

    Some(DocumentSymbolResponse::Flat(symbols))
}

/// Workspace symbol results for `query` from a built index.
pub fn workspace_symbol_results(
    entries: &[(std::path::PathBuf, Arc<Vec<IndexedSymbol>>)],
    query: &str,
) -> Vec<SymbolInformation> {
    filter_symbols(entries, query)
        .into_iter()
        .filter_map(|(path, s)| {
            let uri = Url::from_file_path(path).ok()?;
            Some(symbol_information(
                s.name.clone(),
                s.kind,
                s.container_name.clone(),
                Location { uri, range: s.range },
            ))
        })
        .collect()
}

// ============================================================================
// Commands
// ============================================================================

/// `wren.openInclude`: the file named by the include on `line`.
pub fn open_include(state: &WorldState, uri: &Url, line: u32) -> Result<Url, ResolutionError> {
    let doc = state.get_document(uri).ok_or(ResolutionError::NotAnInclude)?;
    let text = doc.text();
    let line_str = line_text(&text, line).ok_or(ResolutionError::NotAnInclude)?;
    let path = uri.to_file_path().map_err(|_| ResolutionError::NotAnInclude)?;
    let target = resolve_include_on_line(&path, line_str, line, &state.config)?;
    Url::from_file_path(&target).map_err(|_| ResolutionError::NotFound {
        spec: target.display().to_string(),
    })
}

/// `wren.insertHeader`: a workspace edit inserting a UDF header above the
/// function defined on `line`. `None` when there is no function there or it
/// already has a header.
pub fn insert_header(state: &WorldState, uri: &Url, line: u32) -> Option<WorkspaceEdit> {
    let doc = state.get_document(uri)?;
    let text = doc.text();
    let def = find_function_definitions(&text)
        .into_iter()
        .find(|d| d.line == line as usize)?;

    let lines: Vec<&str> = crate::lexical::lines_with_offsets(&text)
        .map(|(_, _, l)| l)
        .collect();
    if udf_header::parse_header_above(&lines, def.line).is_some() {
        log::trace!("{} already has a header", def.name);
        return None;
    }

    let params: Vec<_> = split_parameters(&def.params_text)
        .into_iter()
        .filter_map(parse_parameter)
        .collect();
    let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let mut new_text = udf_header::generate_header(&def.name, &params).join(eol);
    new_text.push_str(eol);

    let position = Position::new(line, 0);
    let edit = TextEdit {
        range: Range::new(position, position),
        new_text,
    };
    Some(WorkspaceEdit {
        changes: Some(HashMap::from([(uri.clone(), vec![edit])])),
        ..Default::default()
    })
}

// ============================================================================
// Checker diagnostics
// ============================================================================

/// Diagnostics to publish for a checker run. Files that carried checker
/// diagnostics before and have none now are cleared.
pub fn checker_diagnostics(report: &CheckerReport, previous: &HashSet<Url>) -> Vec<(Url, Vec<Diagnostic>)> {
    let mut publish: Vec<(Url, Vec<Diagnostic>)> = Vec::new();
    if let CheckerReport::Findings(findings) = report {
        for (path, records) in findings {
            let Ok(uri) = Url::from_file_path(path) else {
                log::trace!("Skipping checker findings for non-file path {}", path.display());
                continue;
            };
            publish.push((uri, records.iter().map(|r| r.to_diagnostic()).collect()));
        }
    }

    let mut stale: Vec<&Url> = previous
        .iter()
        .filter(|uri| !publish.iter().any(|(u, _)| u == *uri))
        .collect();
    stale.sort();
    publish.extend(stale.into_iter().map(|uri| (uri.clone(), Vec::new())));
    publish
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)], open: &str) -> (TempDir, WorldState, Url) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
        }
        let mut state = WorldState::new(Config::default());
        let uri = Url::from_file_path(dir.path().join(open)).unwrap();
        let text = fs::read_to_string(dir.path().join(open)).unwrap();
        state.open_document(uri.clone(), &text, Some(1));
        (dir, state, uri)
    }

    fn hover_text(hover: Hover) -> String {
        match hover.contents {
            HoverContents::Markup(m) => m.value,
            _ => panic!("expected markup"),
        }
    }

    #[test]
    fn test_hover_included_function() {
        let (_dir, state, uri) = setup(
            &[
                ("main.au3", "#include \"lib.au3\"\nAdd(1, 2)"),
                ("lib.au3", "Func Add($a, $b)\n\tReturn $a + $b\nEndFunc"),
            ],
            "main.au3",
        );
        let text = hover_text(hover(&state, &uri, Position::new(1, 1)).unwrap());
        assert!(text.contains("Add($a, $b)"));
        assert!(text.contains("Included from lib.au3"));
    }

    #[test]
    fn test_hover_builtin_and_macro() {
        let (_dir, state, uri) = setup(&[("main.au3", "MsgBox(0, @ScriptName, \"\")")], "main.au3");
        let h = hover(&state, &uri, Position::new(0, 2)).unwrap();
        assert_eq!(h.range.unwrap().start, Position::new(0, 0));
        assert!(hover_text(h).contains("MsgBox("));
        assert!(hover(&state, &uri, Position::new(0, 12)).is_some());
    }

    #[test]
    fn test_signature_help_across_continuation() {
        let (_dir, state, uri) = setup(
            &[("main.au3", "Func Pair($first, $second)\nEndFunc\nPair(1, _\n\t")],
            "main.au3",
        );
        let help = signature_help(&state, &uri, Position::new(3, 1)).unwrap();
        assert_eq!(help.active_parameter, Some(1));
        assert_eq!(help.signatures[0].label, "Pair($first, $second)");
    }

    #[test]
    fn test_signature_help_outside_call() {
        let (_dir, state, uri) = setup(&[("main.au3", "Local $x = 1")], "main.au3");
        assert!(signature_help(&state, &uri, Position::new(0, 5)).is_none());
    }

    #[test]
    fn test_goto_definition_in_include() {
        let (dir, state, uri) = setup(
            &[
                ("main.au3", "#include \"lib\\util.au3\"\nHelper()"),
                ("lib/util.au3", "; util\nFunc Helper()\nEndFunc"),
            ],
            "main.au3",
        );
        let target = Url::from_file_path(dir.path().join("lib/util.au3")).unwrap();

        let Some(GotoDefinitionResponse::Scalar(loc)) = goto_definition(&state, &uri, Position::new(1, 2)) else {
            panic!("expected a location");
        };
        assert_eq!(loc.uri, target);
        assert_eq!(loc.range.start, Position::new(1, 0));

        // On the include line itself
        let Some(GotoDefinitionResponse::Scalar(loc)) = goto_definition(&state, &uri, Position::new(0, 3)) else {
            panic!("expected a location");
        };
        assert_eq!(loc.uri, target);
        assert_eq!(loc.range.start, Position::new(0, 0));
    }

    #[test]
    fn test_document_symbol_kinds() {
        let (_dir, state, uri) = setup(
            &[("main.au3", "#Region Setup\nGlobal Const $MAX = 3\n#EndRegion\nFunc Run()\nEndFunc")],
            "main.au3",
        );
        let Some(DocumentSymbolResponse::Flat(symbols)) = document_symbol(&state, &uri) else {
            panic!("expected flat symbols");
        };
        let kinds: Vec<(String, SymbolKind)> = symbols.into_iter().map(|s| (s.name, s.kind)).collect();
        assert!(kinds.contains(&("Setup".to_string(), SymbolKind::NAMESPACE)));
        assert!(kinds.contains(&("$MAX".to_string(), SymbolKind::CONSTANT)));
        assert!(kinds.contains(&("Run".to_string(), SymbolKind::FUNCTION)));
    }

    #[test]
    fn test_completion_macros_and_variables() {
        let (_dir, state, uri) = setup(&[("main.au3", "Local $count\n$c\n@")], "main.au3");
        let Some(CompletionResponse::Array(items)) = completion(&state, &uri, Position::new(2, 1)) else {
            panic!("expected items");
        };
        assert!(items.iter().all(|i| i.label.starts_with('@')));

        let Some(CompletionResponse::Array(items)) = completion(&state, &uri, Position::new(1, 2)) else {
            panic!("expected items");
        };
        assert!(items.iter().any(|i| i.label == "$count"));
        assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::VARIABLE)));
    }

    #[test]
    fn test_completion_after_lone_sigil() {
        let (_dir, state, uri) = setup(&[("main.au3", "Local $count
Foo($
X = @")], "main.au3");
        let Some(CompletionResponse::Array(items)) = completion(&state, &uri, Position::new(1, 5)) else {
            panic!("expected items");
        };
        assert!(items.iter().any(|i| i.label == "$count"));
        assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::VARIABLE)));

        let Some(CompletionResponse::Array(items)) = completion(&state, &uri, Position::new(2, 5)) else {
            panic!("expected items");
        };
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.label.starts_with('@')));
    }

    #[test]
    fn test_completion_sigil() {
        assert_eq!(completion_sigil("$", Position::new(0, 1)), Some('$'));
        assert_eq!(completion_sigil("x = @Tab", Position::new(0, 6)), Some('@'));
        assert_eq!(completion_sigil("MsgB", Position::new(0, 4)), None);
        assert_eq!(completion_sigil("", Position::new(0, 0)), None);
    }

    #[test]
    fn test_completion_includes_functions_and_keywords() {
        let (_dir, state, uri) = setup(&[("main.au3", "Func Mine()\nEndFunc\nMi")], "main.au3");
        let Some(CompletionResponse::Array(items)) = completion(&state, &uri, Position::new(2, 2)) else {
            panic!("expected items");
        };
        assert!(items.iter().any(|i| i.label == "Mine" && i.kind == Some(CompletionItemKind::FUNCTION)));
        assert!(items.iter().any(|i| i.label == "MsgBox"));
        assert!(items.iter().any(|i| i.kind == Some(CompletionItemKind::KEYWORD)));
    }

    #[test]
    fn test_open_include_errors() {
        let (_dir, state, uri) = setup(&[("main.au3", "#include \"gone.au3\"\nLocal $x")], "main.au3");
        assert_eq!(
            open_include(&state, &uri, 0),
            Err(ResolutionError::NotFound {
                spec: "gone.au3".to_string()
            })
        );
        assert_eq!(open_include(&state, &uri, 1), Err(ResolutionError::NotAnInclude));
    }

    #[test]
    fn test_insert_header() {
        let (_dir, state, uri) = setup(&[("main.au3", "Local $x\r\nFunc Go($a, $b = 1)\r\nEndFunc")], "main.au3");
        let edit = insert_header(&state, &uri, 1).unwrap();
        let edits = &edit.changes.unwrap()[&uri];
        assert_eq!(edits[0].range.start, Position::new(1, 0));
        assert!(edits[0].new_text.starts_with("; #FUNCTION# ="));
        assert!(edits[0].new_text.contains("; Name ..........: Go\r\n"));
        assert!(edits[0].new_text.ends_with("\r\n"));
        assert!(insert_header(&state, &uri, 0).is_none());
    }

    #[test]
    fn test_checker_diagnostics_clear_stale() {
        let stale = Url::parse("file:///work/old.au3").unwrap();
        let previous = HashSet::from([stale.clone()]);
        let report = crate::checker::parse_checker_output(
            "\"/work/new.au3\"(2,3) : error: bad\n",
        );
        let publish = checker_diagnostics(&report, &previous);
        assert_eq!(publish.len(), 2);
        assert_eq!(publish[0].1[0].range.start, Position::new(1, 2));
        assert_eq!(publish[1], (stale.clone(), Vec::new()));

        let cleared = checker_diagnostics(&CheckerReport::Clear, &previous);
        assert_eq!(cleared, vec![(stale, Vec::new())]);
    }
}
