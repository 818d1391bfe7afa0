//! # Evaluator Module
//!
//! Orchestrates candidate discovery, memoized pairwise scoring, and
//! classification for a stream of owners, emitting one [`Comparison`] per
//! owner.

use crate::classify;
use crate::compare::compare;
use crate::model::{Comparison, Owner, ScoredOwner};
use crate::pairs::PairCache;
use crate::store::CaseStore;
use anyhow::Result;
use std::sync::Arc;

/// Evaluates owners against their same-name candidates.
///
/// Candidate discovery is symmetric (if A finds B, B later finds A), so
/// every member of a name-sharing cluster gets its own comparison, with
/// itself excluded from its candidate list. The pairwise cache keeps each
/// pair from being scored more than once per run.
pub struct Evaluator {
    store: Arc<dyn CaseStore>,
    pairs: PairCache,
}

impl Evaluator {
    /// Create an evaluator with a fresh pairwise cache.
    pub fn new(store: Arc<dyn CaseStore>) -> Self {
        Self::with_cache(store, PairCache::new())
    }

    /// Create an evaluator over a run-scoped cache.
    pub fn with_cache(store: Arc<dyn CaseStore>, pairs: PairCache) -> Self {
        Self { store, pairs }
    }

    /// Produce the comparison for one owner.
    ///
    /// Candidates whose pair with this owner was already scored earlier in
    /// the run are skipped; the earlier comparison carries them.
    pub async fn evaluate(&mut self, owner: &Owner) -> Result<Comparison> {
        let candidates = self
            .store
            .find_owners_by_full_name(&owner.full_name, owner.id)
            .await?;

        let mut scored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self.pairs.has(owner.id, candidate.id) {
                continue;
            }
            self.pairs.add(owner.id, candidate.id);
            let score = compare(owner, &candidate);
            scored.push(ScoredOwner::new(candidate, score));
        }

        let needs_review = classify::needs_manual_review(owner, &scored);
        Ok(Comparison::new(owner.clone(), scored, needs_review))
    }

    /// The run-scoped cache, for stats inspection.
    pub fn cache(&self) -> &PairCache {
        &self.pairs
    }

    /// Surrender the cache back to the run context.
    pub fn into_cache(self) -> PairCache {
        self.pairs
    }
}
