//! # Report Module
//!
//! Run statistics accumulated over the comparison stream, plus the
//! recorder that feeds them. The merger credits its removal counts into
//! the same shared report.

use crate::classify::{self, Disposition};
use crate::model::Comparison;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// Accumulated, mutable statistics for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Comparisons processed
    pub overall: u64,
    /// Comparisons classified as an outright match
    pub matches: u64,
    /// Comparisons below the match threshold with no review flag
    pub non_matches: u64,
    /// Comparisons parked for the manual workflow
    pub need_review: u64,
    /// Owner rows deleted by the merger
    pub removed_owners: u64,
    /// Housing-owner links deleted by the merger
    pub removed_owner_links: u64,
    /// Running sum of best scores
    pub score_sum: f64,
    /// Mean best score, recomputed on every update and again on flush
    pub score_mean: f64,
}

impl Report {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one comparison into the counters.
    pub fn record(&mut self, comparison: &Comparison) {
        self.overall += 1;
        match classify::classify(comparison) {
            Disposition::Match => self.matches += 1,
            Disposition::NeedsReview => self.need_review += 1,
            Disposition::NonMatch => self.non_matches += 1,
        }
        self.score_sum += comparison.score;
        self.score_mean = self.score_sum / self.overall as f64;
    }

    /// Credit removals performed by the merger.
    pub fn note_removed(&mut self, owners: u64, links: u64) {
        self.removed_owners += owners;
        self.removed_owner_links += links;
    }

    /// Final mean computation at run end.
    pub fn flush(&mut self) {
        if self.overall > 0 {
            self.score_mean = self.score_sum / self.overall as f64;
        }
    }
}

/// Report shared between the recorder and the merger's bookkeeping.
pub type SharedReport = Arc<Mutex<Report>>;

/// Wrap a report for cross-task sharing.
pub fn new_shared_report(report: Report) -> SharedReport {
    Arc::new(Mutex::new(report))
}

/// Pure consumer side of the comparison stream: observes every comparison
/// in arrival order and accumulates statistics, no side effects on the
/// store.
pub struct Recorder {
    report: SharedReport,
}

impl Recorder {
    /// Create a recorder over the shared run report.
    pub fn new(report: SharedReport) -> Self {
        Self { report }
    }

    /// Fold one comparison into the run report.
    pub fn observe(&self, comparison: &Comparison) {
        self.report.lock().record(comparison);
    }

    /// Current report state.
    pub fn snapshot(&self) -> Report {
        self.report.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Owner, ScoredOwner};

    fn comparison(score: f64, needs_review: bool) -> Comparison {
        let duplicates = if score > 0.0 {
            vec![ScoredOwner::new(Owner::new("X", vec![]), score)]
        } else {
            vec![]
        };
        Comparison::new(Owner::new("X", vec![]), duplicates, needs_review)
    }

    #[test]
    fn test_counters_partition_the_stream() {
        let mut report = Report::new();
        report.record(&comparison(0.9, false)); // match
        report.record(&comparison(0.8, true)); // review
        report.record(&comparison(0.5, false)); // non-match
        report.record(&comparison(0.0, false)); // non-match
        report.record(&comparison(0.95, true)); // review despite high score

        assert_eq!(report.overall, 5);
        assert_eq!(report.matches, 1);
        assert_eq!(report.non_matches, 2);
        assert_eq!(report.need_review, 2);
        assert_eq!(
            report.matches + report.non_matches + report.need_review,
            report.overall
        );
    }

    #[test]
    fn test_mean_tracks_running_sum() {
        let mut report = Report::new();
        report.record(&comparison(0.9, false));
        report.record(&comparison(0.5, false));
        assert!((report.score_mean - 0.7).abs() < 1e-12);

        report.record(&comparison(0.0, false));
        report.flush();
        assert!((report.score_sum - 1.4).abs() < 1e-12);
        assert!((report.score_mean - 1.4 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_flush_on_empty_report_is_safe() {
        let mut report = Report::new();
        report.flush();
        assert_eq!(report.score_mean, 0.0);
    }

    #[test]
    fn test_recorder_feeds_shared_report() {
        let shared = new_shared_report(Report::new());
        let recorder = Recorder::new(shared.clone());
        recorder.observe(&comparison(0.9, false));

        // Merger bookkeeping lands in the same report.
        shared.lock().note_removed(2, 3);

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.overall, 1);
        assert_eq!(snapshot.removed_owners, 2);
        assert_eq!(snapshot.removed_owner_links, 3);
    }

    #[test]
    fn test_report_serializes_for_operators() {
        let mut report = Report::new();
        report.record(&comparison(0.9, false));
        report.flush();

        let json = serde_json::to_value(&report).expect("serializable report");
        assert_eq!(json["overall"], 1);
        assert_eq!(json["matches"], 1);
    }
}
