// cli/analysis_stats.rs - `wren analysis-stats` subcommand
//
// Loads a workspace and reports timing metrics for each analysis phase.
//
// Phases measured:
//   1. scan       - discovering and reading AutoIt files
//   2. includes   - walking every file's include graph
//   3. signatures - extracting function signatures
//   4. symbols    - extracting document symbols

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::cross_file::{collect_reachable_files, DiskContentProvider, IncludeFileCache};
use crate::perf::TimingGuard;
use crate::signature::extract_signatures;
use crate::symbols::{extract_document_symbols, SymbolOptions};
use crate::workspace_symbols::discover_source_files;

/// Parsed arguments for the `analysis-stats` subcommand.
#[derive(Debug)]
pub struct AnalysisStatsArgs {
    pub path: PathBuf,
    pub csv: bool,
    pub only: Option<String>,
}

/// Result of running a single analysis phase.
pub struct PhaseResult {
    pub name: String,
    pub duration: Duration,
    pub peak_rss_bytes: Option<u64>,
    pub detail: String,
}

/// All valid phase names.
const VALID_PHASES: &[&str] = &["scan", "includes", "signatures", "symbols"];

/// Parse `analysis-stats` arguments from the remaining CLI args.
///
/// Expected usage: `wren analysis-stats <path> [--csv] [--only <phase>]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<AnalysisStatsArgs, String> {
    let mut path: Option<PathBuf> = None;
    let mut csv = false;
    let mut only: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => csv = true,
            "--only" => {
                let phase = args
                    .next()
                    .ok_or_else(|| "--only requires a phase name".to_string())?;
                if !VALID_PHASES.contains(&phase.as_str()) {
                    return Err(format!(
                        "Unknown phase '{}'. Valid phases: {}",
                        phase,
                        VALID_PHASES.join(", ")
                    ));
                }
                only = Some(phase);
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => {
                if path.is_some() {
                    return Err("Multiple paths provided; expected exactly one".to_string());
                }
                path = Some(PathBuf::from(arg));
            }
        }
    }

    let path = path.ok_or_else(|| "Missing required <path> argument".to_string())?;
    if !path.exists() {
        return Err(format!("Path does not exist: {}", path.display()));
    }

    Ok(AnalysisStatsArgs { path, csv, only })
}

fn phase(name: &str, start: Instant, detail: String) -> PhaseResult {
    PhaseResult {
        name: name.to_string(),
        duration: start.elapsed(),
        peak_rss_bytes: crate::perf::peak_rss_bytes(),
        detail,
    }
}

/// Run the analysis-stats command and return phase results.
pub fn run_analysis_stats(args: &AnalysisStatsArgs) -> Vec<PhaseResult> {
    let mut results = Vec::new();
    let config = Config::default();
    let file_cache = IncludeFileCache::new();

    let should_run = |phase: &str| -> bool {
        args.only.as_ref().map_or(true, |only| only == phase)
    };

    // Phase 1: Scan. Later phases need the files either way.
    let start = Instant::now();
    let files = {
        let _guard = TimingGuard::new("analysis-stats:scan");
        discover_files(&args.path, &config, &file_cache)
    };
    if should_run("scan") {
        let bytes: usize = files.iter().map(|(_, c)| c.len()).sum();
        results.push(phase("scan", start, format!("{} files, {}", files.len(), format_bytes(bytes as u64))));
    }

    // Phase 2: Includes
    if should_run("includes") {
        let _guard = TimingGuard::new("analysis-stats:includes");
        let start = Instant::now();
        let provider = DiskContentProvider::new(&file_cache);
        let mut edges = 0usize;
        let mut widest = 0usize;
        for (path, content) in &files {
            let reachable = collect_reachable_files(path, content, &config, &provider);
            edges += reachable.len();
            widest = widest.max(reachable.len());
        }
        results.push(phase(
            "includes",
            start,
            format!(
                "{} files, {} reachable includes, widest graph {}",
                files.len(),
                edges,
                widest
            ),
        ));
    }

    // Phase 3: Signatures
    if should_run("signatures") {
        let _guard = TimingGuard::new("analysis-stats:signatures");
        let start = Instant::now();
        let total: usize = files
            .iter()
            .map(|(path, content)| extract_signatures(content, &path.display().to_string()).len())
            .sum();
        results.push(phase("signatures", start, format!("{} functions", total)));
    }

    // Phase 4: Symbols
    if should_run("symbols") {
        let _guard = TimingGuard::new("analysis-stats:symbols");
        let start = Instant::now();
        let options = SymbolOptions::from_config(&config);
        let total: usize = files
            .iter()
            .map(|(_, content)| extract_document_symbols(content, &options).len())
            .sum();
        results.push(phase("symbols", start, format!("{} symbols", total)));
    }

    results
}

/// Print phase results in human-readable format.
pub fn print_results(results: &[PhaseResult]) {
    println!("=== Wren Analysis Stats ===\n");
    for result in results {
        let rss_str = match result.peak_rss_bytes {
            Some(bytes) => format_bytes(bytes),
            None => "N/A".to_string(),
        };
        println!(
            "  {:<12} {:>10.2?}   RSS: {:<10}  ({})",
            result.name, result.duration, rss_str, result.detail
        );
    }

    if results.len() > 1 {
        let total: Duration = results.iter().map(|r| r.duration).sum();
        println!("\n  {:<12} {:>10.2?}", "TOTAL", total);
    }
    println!();
}

/// Print phase results in CSV format.
pub fn print_results_csv(results: &[PhaseResult]) {
    println!("phase,duration_ms,peak_rss_bytes,detail");
    for result in results {
        let rss = result
            .peak_rss_bytes
            .map_or(String::new(), |b| b.to_string());
        println!(
            "{},{:.3},{},\"{}\"",
            result.name,
            result.duration.as_secs_f64() * 1000.0,
            rss,
            result.detail.replace('"', "\"\"")
        );
    }
}

/// Discover all AutoIt files under `root` (or `root` itself) and read them.
fn discover_files(root: &Path, config: &Config, file_cache: &IncludeFileCache) -> Vec<(PathBuf, String)> {
    let paths = if root.is_file() {
        vec![root.to_path_buf()]
    } else {
        discover_source_files(&[root.to_path_buf()], config)
    };
    paths
        .into_iter()
        .filter_map(|path| file_cache.read(&path).map(|content| (path, content)))
        .collect()
}

/// Format a byte count as a human-readable string (e.g., "12.3 MB").
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
