//
// config.rs
//
// Server configuration and settings parsing
//

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Resolved server configuration, passed by reference into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Include search directories. The first entry is the library directory.
    pub include_paths: Vec<PathBuf>,
    /// Standard library names that bracketed includes never probe
    pub library_allowlist: Vec<String>,
    /// Emit variables in document symbols
    pub show_variables_in_symbols: bool,
    /// Emit `#Region` blocks in document symbols
    pub show_regions_in_symbols: bool,
    /// Maximum nesting of the include walk
    pub max_include_depth: usize,
    /// Lines scanned per document for symbols
    pub max_symbol_lines: usize,
    /// File extensions (without dot) treated as AutoIt sources
    pub file_extensions: Vec<String>,
    /// Cap on files indexed for workspace symbol search
    pub workspace_symbols_max_files: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            library_allowlist: crate::builtins::default_library_allowlist(),
            show_variables_in_symbols: true,
            show_regions_in_symbols: true,
            max_include_depth: 32,
            max_symbol_lines: 50_000,
            file_extensions: vec!["au3".to_string()],
            workspace_symbols_max_files: 5_000,
        }
    }
}

impl Config {
    /// Whether any setting that shapes the include graph changed
    pub fn include_settings_changed(&self, other: &Self) -> bool {
        self.include_paths != other.include_paths
            || self.library_allowlist != other.library_allowlist
            || self.max_include_depth != other.max_include_depth
    }

    /// Whether any setting that shapes symbol extraction changed
    pub fn symbol_settings_changed(&self, other: &Self) -> bool {
        self.show_variables_in_symbols != other.show_variables_in_symbols
            || self.show_regions_in_symbols != other.show_regions_in_symbols
            || self.max_symbol_lines != other.max_symbol_lines
            || self.file_extensions != other.file_extensions
            || self.workspace_symbols_max_files != other.workspace_symbols_max_files
    }

    /// Whether a bracketed include names a standard library file.
    /// Comparison ignores case and a trailing `.au3`.
    pub fn is_allowlisted(&self, spec: &str) -> bool {
        let name = library_name(spec);
        self.library_allowlist
            .iter()
            .any(|entry| library_name(entry) == name)
    }

    /// Whether `path` has one of the configured source extensions
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.file_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

fn library_name(spec: &str) -> String {
    let lower = spec.trim().to_lowercase();
    match lower.strip_suffix(".au3") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn string_list(
    value: &serde_json::Value,
    field: &'static str,
) -> Result<Vec<String>, ConfigError> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(field, "expected an array of strings"))?;
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(s) if !s.contains('\0') => Ok(s.to_string()),
            _ => Err(invalid(field, format!("unexpected entry {item}"))),
        })
        .collect()
}

fn positive(value: &serde_json::Value, field: &'static str) -> Result<usize, ConfigError> {
    match value.as_u64() {
        Some(v) if v > 0 => Ok(v as usize),
        _ => Err(invalid(field, format!("expected a positive integer, got {value}"))),
    }
}

fn boolean(value: &serde_json::Value, field: &'static str) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| invalid(field, format!("expected true or false, got {value}")))
}

/// Parse settings from `initializationOptions` or
/// `workspace/didChangeConfiguration`.
///
/// Settings may be nested under a `wren` key. Absent fields keep their
/// defaults; invalid fields keep their defaults and are reported in the
/// returned error list.
pub fn parse_config(settings: &serde_json::Value) -> (Config, Vec<ConfigError>) {
    let settings = settings.get("wren").unwrap_or(settings);
    let mut config = Config::default();
    let mut errors = Vec::new();

    if let Some(v) = settings.get("includePaths") {
        match string_list(v, "includePaths") {
            Ok(paths) => {
                config.include_paths = paths
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect()
            }
            Err(e) => errors.push(e),
        }
    }
    if let Some(v) = settings.get("libraryAllowlist") {
        match string_list(v, "libraryAllowlist") {
            Ok(names) => config.library_allowlist = names,
            Err(e) => errors.push(e),
        }
    }
    if let Some(v) = settings.get("showVariablesInSymbols") {
        match boolean(v, "showVariablesInSymbols") {
            Ok(b) => config.show_variables_in_symbols = b,
            Err(e) => errors.push(e),
        }
    }
    if let Some(v) = settings.get("showRegionsInSymbols") {
        match boolean(v, "showRegionsInSymbols") {
            Ok(b) => config.show_regions_in_symbols = b,
            Err(e) => errors.push(e),
        }
    }
    if let Some(v) = settings.get("maxIncludeDepth") {
        match positive(v, "maxIncludeDepth") {
            Ok(n) => config.max_include_depth = n,
            Err(e) => errors.push(e),
        }
    }
    if let Some(v) = settings.get("maxSymbolLines") {
        match positive(v, "maxSymbolLines") {
            Ok(n) => config.max_symbol_lines = n,
            Err(e) => errors.push(e),
        }
    }
    if let Some(v) = settings.get("fileExtensions") {
        match string_list(v, "fileExtensions") {
            Ok(exts) => {
                let exts: Vec<String> = exts
                    .iter()
                    .map(|e| e.trim_start_matches('.').to_string())
                    .filter(|e| !e.is_empty())
                    .collect();
                if exts.is_empty() {
                    errors.push(invalid("fileExtensions", "no usable extensions"));
                } else {
                    config.file_extensions = exts;
                }
            }
            Err(e) => errors.push(e),
        }
    }
    if let Some(v) = settings.get("workspaceSymbolsMaxFiles") {
        match positive(v, "workspaceSymbolsMaxFiles") {
            Ok(n) => config.workspace_symbols_max_files = n,
            Err(e) => errors.push(e),
        }
    }

    (config, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.include_paths.is_empty());
        assert!(config.show_variables_in_symbols);
        assert!(config.show_regions_in_symbols);
        assert_eq!(config.max_include_depth, 32);
        assert_eq!(config.max_symbol_lines, 50_000);
        assert_eq!(config.file_extensions, vec!["au3".to_string()]);
        assert!(config.is_allowlisted("Array.au3"));
    }

    #[test]
    fn test_parse_nested_under_wren() {
        let settings = json!({
            "wren": {
                "includePaths": ["C:/AutoIt3/Include", "", "D:/MyUDFs"],
                "showVariablesInSymbols": false,
                "maxIncludeDepth": 4
            }
        });
        let (config, errors) = parse_config(&settings);
        assert!(errors.is_empty());
        assert_eq!(
            config.include_paths,
            vec![
                PathBuf::from("C:/AutoIt3/Include"),
                PathBuf::from("D:/MyUDFs")
            ]
        );
        assert!(!config.show_variables_in_symbols);
        assert_eq!(config.max_include_depth, 4);
    }

    #[test]
    fn test_parse_flat_settings() {
        let settings = json!({ "fileExtensions": [".au3", "a3x"], "showRegionsInSymbols": false });
        let (config, errors) = parse_config(&settings);
        assert!(errors.is_empty());
        assert_eq!(config.file_extensions, vec!["au3", "a3x"]);
        assert!(!config.show_regions_in_symbols);
        assert!(config.is_source_file(Path::new("/x/Script.AU3")));
        assert!(!config.is_source_file(Path::new("/x/readme.md")));
    }

    #[test]
    fn test_invalid_field_falls_back_to_default() {
        let settings = json!({
            "includePaths": "C:/AutoIt3/Include",
            "maxIncludeDepth": 0,
            "showVariablesInSymbols": "yes",
            "maxSymbolLines": 100
        });
        let (config, errors) = parse_config(&settings);
        assert_eq!(errors.len(), 3);
        assert!(config.include_paths.is_empty());
        assert_eq!(config.max_include_depth, 32);
        assert!(config.show_variables_in_symbols);
        assert_eq!(config.max_symbol_lines, 100);
        assert!(matches!(
            errors[0],
            ConfigError::InvalidValue { field: "includePaths", .. }
        ));
    }

    #[test]
    fn test_allowlist_ignores_case_and_extension() {
        let config = Config {
            library_allowlist: vec!["GUIConstantsEx".to_string()],
            ..Config::default()
        };
        assert!(config.is_allowlisted("guiconstantsex.au3"));
        assert!(config.is_allowlisted("GUIConstantsEx"));
        assert!(!config.is_allowlisted("GUIConstants.au3"));
    }

    #[test]
    fn test_change_detection() {
        let base = Config::default();
        let mut other = base.clone();
        assert!(!base.include_settings_changed(&other));
        other.include_paths.push(PathBuf::from("/lib"));
        assert!(base.include_settings_changed(&other));
        assert!(!base.symbol_settings_changed(&other));

        let mut other = base.clone();
        other.show_regions_in_symbols = false;
        assert!(base.symbol_settings_changed(&other));
        assert!(!base.include_settings_changed(&other));
    }
}
