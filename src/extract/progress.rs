//! Progress tracking for dump scans

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Progress tracker for a single forward pass over a dump
pub struct ScanProgress {
    /// Short label of the pass ("answers", "titles", "bodies")
    label: String,
    /// Spinner (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    /// Start time
    start_time: Instant,
    /// Rows read
    rows_scanned: AtomicU64,
    /// Rows that matched the pass's predicate
    rows_matched: AtomicUsize,
}

impl ScanProgress {
    /// Create a new progress tracker
    pub fn new(label: impl Into<String>, quiet: bool) -> Self {
        let label = label.into();

        let progress_bar = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {prefix}: {pos} rows {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_prefix(label.clone());
            Some(pb)
        } else {
            None
        };

        Self {
            label,
            progress_bar,
            start_time: Instant::now(),
            rows_scanned: AtomicU64::new(0),
            rows_matched: AtomicUsize::new(0),
        }
    }

    /// Tracker that never draws anything
    pub fn hidden(label: impl Into<String>) -> Self {
        Self::new(label, true)
    }

    /// Record one row read from the dump
    pub fn row_scanned(&self) {
        let scanned = self.rows_scanned.fetch_add(1, Ordering::Relaxed) + 1;

        // Redraw every 10k rows
        if scanned % 10_000 == 0 {
            if let Some(ref pb) = self.progress_bar {
                pb.set_position(scanned);
                pb.set_message(format!("({:.0} rows/s)", self.rate()));
            }
        }
    }

    /// Record a row that matched, showing its id next to the spinner
    pub fn row_matched(&self, id: &str) {
        let matched = self.rows_matched.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(ref pb) = self.progress_bar {
            let display_id = if id.chars().count() > 30 {
                let truncated: String = id.chars().take(27).collect();
                format!("{}...", truncated)
            } else {
                id.to_string()
            };
            pb.set_message(format!("| {} matched | last {}", matched, display_id));
        }
    }

    /// Rows read so far
    pub fn rows_scanned(&self) -> u64 {
        self.rows_scanned.load(Ordering::Relaxed)
    }

    /// Rows matched so far
    pub fn rows_matched(&self) -> usize {
        self.rows_matched.load(Ordering::Relaxed)
    }

    /// Rows per second since the pass started
    fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.rows_scanned() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Finish the spinner
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(self.rows_scanned());
            pb.finish_with_message(format!(
                "done: {} matched, {:.0} rows/s",
                self.rows_matched(),
                self.rate()
            ));
        }
        tracing::debug!(
            "Pass '{}' finished: {} rows scanned, {} matched",
            self.label,
            self.rows_scanned(),
            self.rows_matched()
        );
    }
}
