//! # Data Model
//!
//! Core data structures for owner deduplication: owner records, housing
//! links, scored candidates, and the comparison unit flowing through a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier for owner records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for housing units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HousingId(pub Uuid);

impl HousingId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HousingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HousingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Composite key for a housing unit: local identifier plus the geo
/// perimeter code it was imported under. Both parts are needed to address
/// a housing-owner link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HousingKey {
    pub id: HousingId,
    pub geo_code: String,
}

impl HousingKey {
    /// Create a new housing key
    pub fn new(id: HousingId, geo_code: impl Into<String>) -> Self {
        Self {
            id,
            geo_code: geo_code.into(),
        }
    }
}

impl fmt::Display for HousingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.geo_code)
    }
}

/// A person or legal entity that can hold property rights over housing.
///
/// Owner rows are created by the import pipelines; this engine only reads
/// them, merges their references, and deletes absorbed duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    /// Full name as imported; candidate discovery matches it exactly.
    pub full_name: String,
    /// Ordered address lines, as imported. May be empty.
    pub raw_address: Vec<String>,
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Name of the administrator acting for the owner, if any.
    pub administrator: Option<String>,
    pub kind: Option<String>,
    pub kind_detail: Option<String>,
}

impl Owner {
    /// Create an owner with a fresh identifier and no optional fields.
    pub fn new(full_name: impl Into<String>, raw_address: Vec<String>) -> Self {
        Self {
            id: OwnerId::new(),
            full_name: full_name.into(),
            raw_address,
            birth_date: None,
            email: None,
            phone: None,
            administrator: None,
            kind: None,
            kind_detail: None,
        }
    }

    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_administrator(mut self, administrator: impl Into<String>) -> Self {
        self.administrator = Some(administrator.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>, detail: Option<&str>) -> Self {
        self.kind = Some(kind.into());
        self.kind_detail = detail.map(str::to_string);
        self
    }
}

/// Associates an owner with a housing unit.
///
/// `rank` encodes priority and status: 1..N for active owners ordered by
/// priority (1 = primary), zero or negative sentinels for inactive or
/// previous-owner states. Among active links of one housing, a rank value
/// appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HousingOwnerLink {
    pub owner_id: OwnerId,
    pub housing: HousingKey,
    pub rank: i32,
}

impl HousingOwnerLink {
    /// Create a new housing-owner link
    pub fn new(owner_id: OwnerId, housing: HousingKey, rank: i32) -> Self {
        Self {
            owner_id,
            housing,
            rank,
        }
    }

    /// Active links hold positive ranks; the rest are sentinel states.
    pub fn is_active(&self) -> bool {
        self.rank >= 1
    }
}

/// An outreach or audit event attached to an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub kind: String,
}

impl Event {
    /// Create a new event
    pub fn new(owner_id: OwnerId, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            kind: kind.into(),
        }
    }
}

/// A free-form note attached to an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub content: String,
}

impl Note {
    /// Create a new note
    pub fn new(owner_id: OwnerId, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            content: content.into(),
        }
    }
}

/// A candidate duplicate with its similarity score against a source owner.
///
/// Produced and consumed within a single evaluation; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOwner {
    pub owner: Owner,
    pub score: f64,
}

impl ScoredOwner {
    /// Create a new scored candidate
    pub fn new(owner: Owner, score: f64) -> Self {
        Self { owner, score }
    }
}

/// The scored, classified relationship between a source owner and its
/// candidate duplicates: the unit of work handed from the evaluator to
/// the merger and the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub source: Owner,
    /// Candidates ordered by descending score.
    pub duplicates: Vec<ScoredOwner>,
    /// Best duplicate score, or 0 with no candidates.
    pub score: f64,
    pub needs_review: bool,
}

impl Comparison {
    /// Build a comparison, ordering the candidates and deriving the best
    /// score so the `score == max(duplicates)` invariant holds by
    /// construction.
    pub fn new(source: Owner, mut duplicates: Vec<ScoredOwner>, needs_review: bool) -> Self {
        duplicates.sort_by(|a, b| b.score.total_cmp(&a.score));
        let score = duplicates.first().map_or(0.0, |best| best.score);
        Self {
            source,
            duplicates,
            score,
            needs_review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_activity() {
        let housing = HousingKey::new(HousingId::new(), "33500");
        let owner = OwnerId::new();

        assert!(HousingOwnerLink::new(owner, housing.clone(), 1).is_active());
        assert!(HousingOwnerLink::new(owner, housing.clone(), 3).is_active());
        assert!(!HousingOwnerLink::new(owner, housing.clone(), 0).is_active());
        assert!(!HousingOwnerLink::new(owner, housing, -2).is_active());
    }

    #[test]
    fn test_comparison_orders_duplicates_and_takes_best_score() {
        let source = Owner::new("A", vec![]);
        let duplicates = vec![
            ScoredOwner::new(Owner::new("A", vec![]), 0.4),
            ScoredOwner::new(Owner::new("A", vec![]), 0.9),
            ScoredOwner::new(Owner::new("A", vec![]), 0.7),
        ];

        let comparison = Comparison::new(source, duplicates, false);
        assert_eq!(comparison.score, 0.9);
        let scores: Vec<f64> = comparison.duplicates.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.4]);
    }

    #[test]
    fn test_comparison_without_candidates_scores_zero() {
        let comparison = Comparison::new(Owner::new("A", vec![]), vec![], false);
        assert_eq!(comparison.score, 0.0);
        assert!(comparison.duplicates.is_empty());
    }

    #[test]
    fn test_housing_key_identity() {
        let id = HousingId::new();
        let a = HousingKey::new(id, "64500");
        let b = HousingKey::new(id, "64500");
        let c = HousingKey::new(id, "33500");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
