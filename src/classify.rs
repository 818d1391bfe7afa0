//! # Classifier Module
//!
//! Turns a comparator score, plus birth-date consistency across the
//! candidate set, into one of three dispositions: match, needs-review,
//! or non-match.

use crate::model::{Comparison, Owner, ScoredOwner};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scores at or above this bound enter the manual-review band.
pub const REVIEW_THRESHOLD: f64 = 0.70;

/// Scores at or above this bound qualify as an outright match.
pub const MATCH_THRESHOLD: f64 = 0.85;

/// Terminal classification of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// At least one candidate reaches the match threshold and no manual
    /// review override applies; the merger consolidates it.
    Match,
    /// Parked for the manual review workflow.
    NeedsReview,
    /// No candidate reaches the match threshold.
    NonMatch,
}

/// Outright match: score at or above [`MATCH_THRESHOLD`].
pub fn is_match(score: f64) -> bool {
    score >= MATCH_THRESHOLD
}

/// Review band: score in [[`REVIEW_THRESHOLD`], [`MATCH_THRESHOLD`]).
pub fn is_review_match(score: f64) -> bool {
    score >= REVIEW_THRESHOLD && score < MATCH_THRESHOLD
}

/// Decide whether a comparison must go to a manual workflow instead of an
/// automatic merge.
///
/// With `matches` the candidates at or above the review threshold, review
/// is required when `matches` is non-empty and either
/// - no member of `matches` reaches the match threshold, or
/// - the source and the members of `matches` carry at least two distinct
///   non-null birth dates.
///
/// A clean auto-merge therefore needs one confidently matching candidate
/// and no contradictory biographical evidence. Fewer than two non-null
/// birth dates can never conflict, whatever the scores.
pub fn needs_manual_review(source: &Owner, scored: &[ScoredOwner]) -> bool {
    let matches: Vec<&ScoredOwner> = scored
        .iter()
        .filter(|candidate| candidate.score >= REVIEW_THRESHOLD)
        .collect();
    if matches.is_empty() {
        return false;
    }

    let none_reaches_match = matches.iter().all(|candidate| !is_match(candidate.score));
    none_reaches_match || has_birth_date_conflict(source, &matches)
}

/// True when the source and the matched candidates carry two distinct
/// non-null birth dates.
fn has_birth_date_conflict(source: &Owner, matches: &[&ScoredOwner]) -> bool {
    let mut first: Option<NaiveDate> = None;
    for date in std::iter::once(source.birth_date)
        .chain(matches.iter().map(|candidate| candidate.owner.birth_date))
        .flatten()
    {
        match first {
            None => first = Some(date),
            Some(seen) if seen != date => return true,
            Some(_) => {}
        }
    }
    false
}

/// Classify a scored, review-flagged comparison into its disposition.
pub fn classify(comparison: &Comparison) -> Disposition {
    if comparison.needs_review {
        Disposition::NeedsReview
    } else if is_match(comparison.score) {
        Disposition::Match
    } else {
        Disposition::NonMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn scored(score: f64) -> ScoredOwner {
        ScoredOwner::new(Owner::new("X", vec![]), score)
    }

    fn scored_with_date(score: f64, birth: NaiveDate) -> ScoredOwner {
        ScoredOwner::new(Owner::new("X", vec![]).with_birth_date(birth), score)
    }

    #[test]
    fn test_threshold_bands() {
        assert!(is_match(0.85));
        assert!(is_match(1.0));
        assert!(!is_match(0.8499));

        assert!(is_review_match(0.70));
        assert!(is_review_match(0.8499));
        assert!(!is_review_match(0.85));
        assert!(!is_review_match(0.6999));
    }

    #[test]
    fn test_review_band_only_requires_review() {
        let source = Owner::new("X", vec![]);
        assert!(needs_manual_review(&source, &[scored(0.75), scored(0.84)]));
    }

    #[test]
    fn test_outright_match_without_dates_is_clean() {
        let source = Owner::new("X", vec![]);
        assert!(!needs_manual_review(&source, &[scored(0.9), scored(0.72)]));
    }

    #[test]
    fn test_birth_date_conflict_overrides_high_score() {
        let source = Owner::new("X", vec![]).with_birth_date(date(1950, 3, 1));
        let candidates = [scored_with_date(0.95, date(1962, 7, 12))];
        assert!(needs_manual_review(&source, &candidates));
    }

    #[test]
    fn test_conflict_between_two_candidates() {
        let source = Owner::new("X", vec![]);
        let candidates = [
            scored_with_date(0.95, date(1950, 3, 1)),
            scored_with_date(0.88, date(1962, 7, 12)),
        ];
        assert!(needs_manual_review(&source, &candidates));
    }

    #[test]
    fn test_single_birth_date_cannot_conflict() {
        let source = Owner::new("X", vec![]).with_birth_date(date(1950, 3, 1));
        assert!(!needs_manual_review(&source, &[scored(0.9)]));
    }

    #[test]
    fn test_agreeing_birth_dates_are_clean() {
        let source = Owner::new("X", vec![]).with_birth_date(date(1950, 3, 1));
        let candidates = [scored_with_date(0.9, date(1950, 3, 1))];
        assert!(!needs_manual_review(&source, &candidates));
    }

    #[test]
    fn test_candidates_below_review_band_are_ignored() {
        // The 0.3 candidate's conflicting date sits outside the review
        // band and must not trigger the override.
        let source = Owner::new("X", vec![]).with_birth_date(date(1950, 3, 1));
        let candidates = [
            scored_with_date(0.9, date(1950, 3, 1)),
            scored_with_date(0.3, date(1971, 1, 1)),
        ];
        assert!(!needs_manual_review(&source, &candidates));
    }

    #[test]
    fn test_no_candidates_in_band_is_not_review() {
        let source = Owner::new("X", vec![]);
        assert!(!needs_manual_review(&source, &[]));
        assert!(!needs_manual_review(&source, &[scored(0.5)]));
    }

    #[test]
    fn test_classify_dispositions() {
        let source = Owner::new("X", vec![]);
        let matched = Comparison::new(source.clone(), vec![scored(0.9)], false);
        assert_eq!(classify(&matched), Disposition::Match);

        let review = Comparison::new(source.clone(), vec![scored(0.8)], true);
        assert_eq!(classify(&review), Disposition::NeedsReview);

        let non_match = Comparison::new(source, vec![scored(0.2)], false);
        assert_eq!(classify(&non_match), Disposition::NonMatch);
    }
}
