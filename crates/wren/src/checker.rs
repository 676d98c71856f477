//
// checker.rs
//
// Parsing of external syntax checker output into diagnostics.
//
// The client runs the checker and forwards its text. Records look like
//
//   "C:\path\file.au3"(12,5) : warning: $x: declared, but not used in func.
//
// and a clean run ends with `- 0 error(s), 0 warning(s)`.
//

use indexmap::IndexMap;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

const CLEAN_SENTINEL: &str = "- 0 error(s), 0 warning(s)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerSeverity {
    Warning,
    Error,
}

/// One checker finding, 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerRecord {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub severity: CheckerSeverity,
    pub message: String,
}

/// Parsed checker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerReport {
    /// Clean run: previously published checker diagnostics are withdrawn
    Clear,
    /// Findings grouped by file, in order of first appearance
    Findings(IndexMap<PathBuf, Vec<CheckerRecord>>),
}

fn record_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#""(?P<path>[^"]+)"\((?P<line>\d+),(?P<col>\d+)\)\s*:\s*(?P<sev>\w+):\s*(?P<msg>.+)"#,
        )
        .unwrap()
    })
}

fn parse_record(line: &str) -> Option<CheckerRecord> {
    let caps = record_pattern().captures(line)?;
    let line_num: u32 = caps["line"].parse().ok()?;
    let column: u32 = caps["col"].parse().ok()?;
    let severity = if caps["sev"].eq_ignore_ascii_case("warning") {
        CheckerSeverity::Warning
    } else {
        CheckerSeverity::Error
    };
    Some(CheckerRecord {
        path: PathBuf::from(&caps["path"]),
        line: line_num.saturating_sub(1),
        column: column.saturating_sub(1),
        severity,
        message: caps["msg"].trim_end().to_string(),
    })
}

/// Parse the full text of one checker run. Lines that are not records are
/// ignored.
pub fn parse_checker_output(output: &str) -> CheckerReport {
    if output.lines().any(|l| l.contains(CLEAN_SENTINEL)) {
        return CheckerReport::Clear;
    }

    let mut findings: IndexMap<PathBuf, Vec<CheckerRecord>> = IndexMap::new();
    for record in output.lines().filter_map(parse_record) {
        findings.entry(record.path.clone()).or_default().push(record);
    }
    log::trace!("Checker output: {} file(s) with findings", findings.len());
    CheckerReport::Findings(findings)
}

impl CheckerRecord {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let position = Position::new(self.line, self.column);
        Diagnostic {
            range: Range::new(position, position),
            severity: Some(match self.severity {
                CheckerSeverity::Warning => DiagnosticSeverity::WARNING,
                CheckerSeverity::Error => DiagnosticSeverity::ERROR,
            }),
            source: Some("au3check".to_string()),
            message: self.message.clone(),
            ..Default::default()
        }
    }
}
