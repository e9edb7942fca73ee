//! Scan progress display with progress bars.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use onionscout_probe::{ProbeReport, ScanConfig, ScanObserver, ScanSummary};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Scan progress tracker
pub struct ScanProgress {
    bar: ProgressBar,
    goal: usize,
}

impl ScanProgress {
    /// Create a progress tracker
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} relays probed, {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );

        Self { bar, goal: 0 }
    }

    /// Create a tracker that draws nothing
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            goal: 0,
        }
    }

    /// stderr writer for log output that keeps the bar intact
    #[must_use]
    pub fn log_writer(&self) -> LogWriter {
        LogWriter {
            bar: self.bar.clone(),
        }
    }
}

/// Writes to stderr with the progress bar cleared, then redraws it
#[derive(Clone)]
pub struct LogWriter {
    bar: ProgressBar,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bar.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        // One suspend per log line, not per partial write
        self.bar.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for ScanProgress {
    fn on_started(&mut self, total: usize, config: &ScanConfig) {
        self.goal = config.goal;
        self.bar.set_length(total as u64);
        self.bar.set_message(format!("found 0/{}", self.goal));
        self.bar.enable_steady_tick(Duration::from_millis(120));
    }

    fn on_probed(&mut self, report: &ProbeReport, found: usize) {
        self.bar.inc(1);

        if report.is_reachable() {
            for line in report.bridge_lines() {
                self.bar.println(format!("{} {}", style("reachable").green(), line));
            }
            self.bar.set_message(format!("found {}/{}", found, self.goal));
        }
    }

    fn on_finished(&mut self, summary: &ScanSummary) {
        self.bar.finish_with_message(format!(
            "found {}/{} in {}",
            summary.working.len(),
            self.goal,
            format_duration(summary.elapsed)
        ));
    }
}

/// Format duration in human-readable format
///
/// # Example
///
/// ```
/// use onionscout_cli::progress::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(30)), "30s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Format a probe latency in milliseconds
#[must_use]
pub fn format_latency(latency: Duration) -> String {
    format!("{}ms", latency.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h 0m");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(Duration::from_millis(87)), "87ms");
        assert_eq!(format_latency(Duration::from_micros(1500)), "1ms");
    }

    #[test]
    fn test_log_writer_leaves_bar_state() {
        let mut progress = ScanProgress::hidden();
        progress.on_started(10, &ScanConfig::default());
        progress.bar.inc(3);

        let mut writer = progress.log_writer().make_writer();
        writer.write_all(b"log line while scanning\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(progress.bar.position(), 3);
        assert_eq!(progress.bar.length(), Some(10));
        assert!(!progress.bar.is_finished());
    }

    #[test]
    fn test_hidden_progress_observer() {
        let mut progress = ScanProgress::hidden();
        progress.on_started(10, &ScanConfig::default());
        assert_eq!(progress.goal, 5);
        assert_eq!(progress.bar.length(), Some(10));
    }
}
