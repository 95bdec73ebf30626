//! Per-item outcome tracking for batch encode/decode.

use serde::Serialize;
use std::fmt;

/// Outcome of a batch operation that skips bad items instead of aborting.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IoReport {
    /// Items handled successfully.
    pub processed: usize,
    /// Items that were skipped, with the reason.
    pub skipped: Vec<SkippedItem>,
}

/// A single skipped item (image, XML file, ...).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedItem {
    pub item: String,
    pub reason: String,
}

impl IoReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&mut self) {
        self.processed += 1;
    }

    /// Records a skip and emits the diagnostic.
    pub fn record_skip(&mut self, item: impl Into<String>, reason: impl fmt::Display) {
        let item = item.into();
        let reason = reason.to_string();
        log::warn!("skipping {item}: {reason}");
        self.skipped.push(SkippedItem { item, reason });
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: IoReport) {
        self.processed += other.processed;
        self.skipped.extend(other.skipped);
    }
}

impl fmt::Display for IoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} processed, {} skipped",
            self.processed,
            self.skipped.len()
        )?;
        for skipped in &self.skipped {
            writeln!(f, "  - {}: {}", skipped.item, skipped.reason)?;
        }
        Ok(())
    }
}
