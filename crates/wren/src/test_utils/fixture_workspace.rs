//! Deterministic fixture workspace generator for benchmarks and tests.
//!
//! Generates synthetic AutoIt workspaces with controlled characteristics:
//! file count, functions per file, `#include` chains, library includes,
//! and extra lines of top-level code.
//!
//! All output is deterministic (no randomness) so benchmarks are reproducible.

use std::fmt::Write;
use std::path::Path;
use tempfile::TempDir;

/// Configuration for generating a fixture workspace.
#[derive(Debug, Clone)]
pub struct FixtureConfig {
    pub file_count: usize,
    pub functions_per_file: usize,
    pub include_chain_depth: usize,
    pub library_includes_per_file: usize,
    pub extra_lines_per_file: usize,
    /// The last file in the chain includes `file_0.au3` again
    pub close_cycle: bool,
}

/// Standard UDF names used deterministically in bracketed includes.
const LIBRARIES: &[&str] = &[
    "Array.au3", "File.au3", "String.au3", "Date.au3", "Math.au3", "Misc.au3",
];

impl FixtureConfig {
    /// Small workspace: 10 files, 5 functions each, include chain depth 3.
    pub fn small() -> Self {
        Self {
            file_count: 10,
            functions_per_file: 5,
            include_chain_depth: 3,
            library_includes_per_file: 1,
            extra_lines_per_file: 5,
            close_cycle: false,
        }
    }

    /// Medium workspace: 50 files, 10 functions each, include chain depth 10.
    pub fn medium() -> Self {
        Self {
            file_count: 50,
            functions_per_file: 10,
            include_chain_depth: 10,
            library_includes_per_file: 2,
            extra_lines_per_file: 10,
            close_cycle: false,
        }
    }

    /// Large workspace: 200 files, 20 functions each, include chain depth 30.
    pub fn large() -> Self {
        Self {
            file_count: 200,
            functions_per_file: 20,
            include_chain_depth: 30,
            library_includes_per_file: 3,
            extra_lines_per_file: 20,
            close_cycle: true,
        }
    }
}

/// Name of the `index`-th generated file.
pub fn fixture_file_name(index: usize) -> String {
    format!("file_{}.au3", index)
}

/// Name of the `func_i`-th function in file `index`.
pub fn fixture_function_name(index: usize, func_i: usize) -> String {
    format!("Func_{}_{}", index, func_i)
}

fn generate_au3_file_content(index: usize, config: &FixtureConfig) -> String {
    let mut content = String::new();

    for lib_i in 0..config.library_includes_per_file {
        let lib = LIBRARIES[(index * config.library_includes_per_file + lib_i) % LIBRARIES.len()];
        writeln!(content, "#include <{}>", lib).unwrap();
    }

    // file_0 includes file_1, file_1 includes file_2, and so on
    let in_chain = index < config.include_chain_depth;
    if in_chain && index + 1 < config.file_count {
        writeln!(content, "#include \"{}\"", fixture_file_name(index + 1)).unwrap();
    } else if config.close_cycle && index == config.include_chain_depth.min(config.file_count - 1) && index > 0 {
        writeln!(content, "#include \"{}\"", fixture_file_name(0)).unwrap();
    }
    content.push('\n');

    for line_i in 0..config.extra_lines_per_file {
        writeln!(content, "Global $g_iVar_{}_{} = {}", index, line_i, line_i + 1).unwrap();
    }
    if config.extra_lines_per_file > 0 {
        content.push('\n');
    }

    for func_i in 0..config.functions_per_file {
        let name = fixture_function_name(index, func_i);
        writeln!(content, "; #FUNCTION# ====================================================================================================================").unwrap();
        writeln!(content, "; Name ..........: {}", name).unwrap();
        writeln!(content, "; Description ...: Generated function {} of file {}.", func_i, index).unwrap();
        writeln!(content, "; Parameters ....: $iX                 - A number.").unwrap();
        writeln!(content, ";                  $iY                 - [optional] A number. Default is {}.", func_i + 1).unwrap();
        writeln!(content, "; ===============================================================================================================================").unwrap();
        writeln!(content, "Func {}($iX, $iY = {})", name, func_i + 1).unwrap();
        writeln!(content, "\tLocal $iResult = $iX + $iY * {}", func_i + 1).unwrap();
        writeln!(content, "\tIf $iResult < 0 Then").unwrap();
        writeln!(content, "\t\tReturn SetError(1, 0, 0)").unwrap();
        writeln!(content, "\tEndIf").unwrap();
        writeln!(content, "\tReturn $iResult").unwrap();
        writeln!(content, "EndFunc").unwrap();
        content.push('\n');
    }

    content
}

/// Create a temporary fixture workspace from the given configuration.
///
/// Calling this twice with the same `FixtureConfig` produces byte-identical files.
pub fn create_fixture_workspace(config: &FixtureConfig) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory for fixture workspace");
    write_fixture_workspace(temp_dir.path(), config);
    temp_dir
}

/// Write fixture files into an existing directory.
pub fn write_fixture_workspace(dir: &Path, config: &FixtureConfig) {
    for i in 0..config.file_count {
        let content = generate_au3_file_content(i, config);
        let filename = fixture_file_name(i);
        std::fs::write(dir.join(&filename), &content)
            .unwrap_or_else(|e| panic!("Failed to write fixture file {}: {}", filename, e));
    }
}
