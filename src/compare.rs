//! # Comparator Module
//!
//! Computes a similarity score in [0, 1] between two owner records, built
//! on fuzzy address comparison with import-specific normalization.

use crate::model::Owner;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Matches a zero-padded four-digit street number at the start of a line.
/// Import files pad street numbers to four digits ("0017 RUE ..."), while
/// other sources carry them bare.
fn street_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})\s").expect("street number pattern"))
}

/// Strip leading zeros from a zero-padded four-digit street number at the
/// start of an address line. Lines without that shape pass through
/// unchanged, so postal codes ("64500 ...", five digits) are untouched.
pub fn normalize_line(line: &str) -> String {
    match street_number().captures(line) {
        Some(caps) => {
            let digits = &caps[1];
            let trimmed = digits.trim_start_matches('0');
            let number = if trimmed.is_empty() { "0" } else { trimmed };
            format!("{}{}", number, &line[digits.len()..])
        }
        None => line.to_string(),
    }
}

/// Normalize an address for comparison: zero-strip street numbers per
/// line, join the ordered lines into one string, and collapse repeated
/// whitespace.
pub fn normalize_address(lines: &[String]) -> String {
    let joined = lines
        .iter()
        .map(|line| normalize_line(line))
        .collect::<Vec<_>>()
        .join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maximal alphanumeric runs of the normalized string, case-folded.
/// Splitting on every non-alphanumeric character makes hyphenated and
/// spaced city spellings ("SAINT-JEAN-DE-LUZ" / "SAINT JEAN DE LUZ")
/// tokenize identically.
fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_uppercase())
        .collect()
}

/// Jaccard token-set overlap between two normalized strings.
fn jaccard(a: &str, b: &str) -> f64 {
    let tokens_a = tokens(a);
    let tokens_b = tokens(b);
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.len() + tokens_b.len() - intersection;
    intersection as f64 / union as f64
}

/// Address sub-score. Undefined (not zero) when either owner carries no
/// address lines at all.
fn address_score(source: &Owner, candidate: &Owner) -> Option<f64> {
    if source.raw_address.is_empty() || candidate.raw_address.is_empty() {
        return None;
    }
    Some(jaccard(
        &normalize_address(&source.raw_address),
        &normalize_address(&candidate.raw_address),
    ))
}

/// Similarity score in [0, 1] between two owner records.
///
/// The overall score is the arithmetic mean of the defined sub-scores.
/// Address is the only sub-score today; the averaging leaves room for
/// name or phone sub-scores, each optional. With no defined sub-score the
/// result is 0.
///
/// Pure and symmetric: `compare(a, b) == compare(b, a)`.
pub fn compare(source: &Owner, candidate: &Owner) -> f64 {
    let sub_scores = [address_score(source, candidate)];
    let defined: Vec<f64> = sub_scores.iter().flatten().copied().collect();
    if defined.is_empty() {
        return 0.0;
    }
    defined.iter().sum::<f64>() / defined.len() as f64
}
