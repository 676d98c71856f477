//
// perf.rs
//
// Timing instrumentation, controlled via the WREN_PERF environment variable.
//
//   WREN_PERF=1 wren --stdio        # timing logs
//   WREN_PERF=verbose wren --stdio  # timing logs plus threshold warnings
//

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global flag indicating whether performance timing is enabled
static PERF_ENABLED: OnceLock<bool> = OnceLock::new();

/// Global flag indicating verbose mode (includes threshold warnings)
static PERF_VERBOSE: OnceLock<bool> = OnceLock::new();

/// Check if performance timing is enabled
pub fn is_enabled() -> bool {
    *PERF_ENABLED.get_or_init(|| {
        std::env::var("WREN_PERF")
            .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
            .unwrap_or(false)
    })
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    *PERF_VERBOSE.get_or_init(|| {
        std::env::var("WREN_PERF")
            .map(|v| v.to_lowercase() == "verbose")
            .unwrap_or(false)
    })
}

/// RAII timing guard that logs duration on drop
///
/// Use this to measure the duration of a scope:
/// ```
/// use wren::perf::TimingGuard;
///
/// let _guard = TimingGuard::new("operation_name");
/// // ... do work ...
/// // Duration logged when _guard goes out of scope
/// ```
pub struct TimingGuard {
    start: Instant,
    name: &'static str,
    threshold_warn_ms: Option<u64>,
    enabled: bool,
}

impl TimingGuard {
    /// Create a new timing guard with the given name
    ///
    /// Duration will be logged at INFO level when the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: None,
            enabled: is_enabled(),
        }
    }

    /// Create a timing guard with a warning threshold
    ///
    /// If the operation takes longer than `threshold_ms`, a warning will be logged.
    pub fn with_threshold(name: &'static str, threshold_ms: u64) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: Some(threshold_ms),
            enabled: is_enabled(),
        }
    }

    /// Get the elapsed time without consuming the guard
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Manually complete the timing and return the duration
    ///
    /// This consumes the guard without logging (useful when you want to handle
    /// the duration yourself).
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        std::mem::forget(self); // Prevent Drop from running
        elapsed
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }

        let elapsed = self.start.elapsed();
        log::info!("[PERF] {} completed in {:?}", self.name, elapsed);

        if let Some(threshold) = self.threshold_warn_ms {
            if elapsed.as_millis() > threshold as u128 && is_verbose() {
                log::warn!(
                    "[PERF] {} exceeded threshold ({}ms > {}ms)",
                    self.name,
                    elapsed.as_millis(),
                    threshold
                );
            }
        }
    }
}

/// Aggregated metrics for the initial workspace symbol build
#[derive(Debug, Default, Clone)]
pub struct PerfMetrics {
    /// Duration of the workspace scan
    pub workspace_scan_duration: Option<Duration>,
    /// Number of files scanned
    pub files_scanned: usize,
    /// Number of symbols extracted during the scan
    pub symbols_indexed: usize,
    /// Number of include graph walks performed
    pub include_walks: usize,
}

impl PerfMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a summary of the metrics
    pub fn log_summary(&self) {
        if !is_enabled() {
            return;
        }

        log::info!("[PERF] === Performance Summary ===");

        if let Some(d) = self.workspace_scan_duration {
            log::info!(
                "[PERF] Workspace scan: {:?} ({} files, {} symbols)",
                d,
                self.files_scanned,
                self.symbols_indexed
            );
        }
        log::info!("[PERF] Include graph walks: {}", self.include_walks);
    }
}

static METRICS: OnceLock<std::sync::Mutex<PerfMetrics>> = OnceLock::new();

/// Get or initialize the global metrics
pub fn metrics() -> &'static std::sync::Mutex<PerfMetrics> {
    METRICS.get_or_init(|| std::sync::Mutex::new(PerfMetrics::new()))
}

/// Record a completed workspace scan
pub fn record_workspace_scan(duration: Duration, files_scanned: usize, symbols_indexed: usize) {
    if !is_enabled() {
        return;
    }
    if let Ok(mut metrics) = metrics().lock() {
        metrics.workspace_scan_duration = Some(duration);
        metrics.files_scanned = files_scanned;
        metrics.symbols_indexed = symbols_indexed;
    }
}

/// Log the global metrics, folding in the include walk counter
pub fn log_metrics_summary() {
    if let Ok(mut metrics) = metrics().lock() {
        metrics.include_walks = get_include_walks();
        metrics.log_summary();
    }
}

static INCLUDE_WALKS: AtomicUsize = AtomicUsize::new(0);

pub fn increment_include_walks() {
    INCLUDE_WALKS.fetch_add(1, Ordering::Relaxed);
}

pub fn get_include_walks() -> usize {
    INCLUDE_WALKS.load(Ordering::Relaxed)
}

/// Returns the peak resident set size (RSS) of the current process in bytes.
///
/// - **macOS**: Uses `libc::getrusage` (`ru_maxrss`, which is in bytes on macOS).
/// - **Linux**: Reads `/proc/self/status` and parses the `VmHWM` field (reported in kB).
/// - **Other platforms**: Returns `None`.
pub fn peak_rss_bytes() -> Option<u64> {
    #[cfg(target_os = "macos")]
    {
        peak_rss_macos()
    }
    #[cfg(target_os = "linux")]
    {
        peak_rss_linux()
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

#[cfg(target_os = "macos")]
fn peak_rss_macos() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut usage = MaybeUninit::<libc::rusage>::uninit();
    // SAFETY: getrusage writes into the provided pointer; we check the return value.
    let ret = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if ret == 0 {
        // SAFETY: getrusage succeeded, so the struct is fully initialized.
        let usage = unsafe { usage.assume_init() };
        // On macOS, ru_maxrss is in bytes.
        Some(usage.ru_maxrss as u64)
    } else {
        None
    }
}

#[cfg(target_os = "linux")]
fn peak_rss_linux() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            // Format: "VmHWM:    12345 kB"
            let trimmed = rest.trim();
            let kb_str = trimmed.strip_suffix("kB").unwrap_or(trimmed).trim();
            let kb: u64 = kb_str.parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_guard_elapsed() {
        let guard = TimingGuard::new("test");
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = guard.elapsed();
        assert!(elapsed.as_millis() >= 10);
    }

    #[test]
    fn test_timing_guard_finish() {
        let guard = TimingGuard::new("test");
        std::thread::sleep(std::time::Duration::from_millis(10));
        let duration = guard.finish();
        assert!(duration.as_millis() >= 10);
    }

    #[test]
    fn test_perf_metrics_default() {
        let metrics = PerfMetrics::new();
        assert!(metrics.workspace_scan_duration.is_none());
        assert_eq!(metrics.files_scanned, 0);
        assert_eq!(metrics.symbols_indexed, 0);
    }

    #[test]
    fn test_include_walk_counter_increments() {
        let before = get_include_walks();
        increment_include_walks();
        assert!(get_include_walks() > before);
    }

    #[test]
    fn test_metrics_summary_reads_global_metrics() {
        increment_include_walks();
        log_metrics_summary();
        let metrics = metrics().lock().unwrap();
        assert!(metrics.include_walks >= 1);
    }

    #[test]
    fn test_peak_rss_bytes_returns_value_on_supported_platforms() {
        let rss = peak_rss_bytes();
        // On macOS and Linux, we should get a value; on other platforms, None.
        if cfg!(any(target_os = "macos", target_os = "linux")) {
            assert!(rss.is_some(), "peak_rss_bytes() should return Some on macOS/Linux");
            let bytes = rss.unwrap();
            // A running process should have at least some RSS (> 0)
            assert!(bytes > 0, "peak RSS should be > 0, got {}", bytes);
        } else {
            assert!(rss.is_none(), "peak_rss_bytes() should return None on unsupported platforms");
        }
    }
}
