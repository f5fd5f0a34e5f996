//! Progress reporting for a conversion run
//!
//! The driver announces what happens to each marker through this trait so the
//! conversion itself stays decoupled from how the host displays it.

use crate::{convert::ConvertError, scanner::MarkerOccurrence};

pub trait ConversionReporter: Sync {
    /// Markers were found and processing is about to start.
    fn found(&self, count: usize);

    /// The marker was replaced by a card.
    fn converted(&self, occurrence: &MarkerOccurrence, title: &str);

    /// The marker was replaced by a failure annotation.
    fn failed(&self, occurrence: &MarkerOccurrence, reason: &str);

    /// The marker could not be processed and was left as it was.
    fn skipped(&self, occurrence: &MarkerOccurrence, error: &ConvertError);
}

/// A no-op reporter for callers that only want the rewritten text.
pub struct NullReporter;

impl ConversionReporter for NullReporter {
    fn found(&self, _count: usize) {}
    fn converted(&self, _occurrence: &MarkerOccurrence, _title: &str) {}
    fn failed(&self, _occurrence: &MarkerOccurrence, _reason: &str) {}
    fn skipped(&self, _occurrence: &MarkerOccurrence, _error: &ConvertError) {}
}

/// Per-run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub converted: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.converted + self.failed + self.skipped
    }
}
