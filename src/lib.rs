//! # Ownerdedup
//!
//! Batch deduplication and merge engine for housing owner records.
//!
//! Owner records are populated independently by recurring data imports,
//! so the same person or entity ends up as several rows. This crate finds
//! candidate duplicates by exact full name, scores them with fuzzy
//! address comparison and birth-date consistency, classifies each
//! comparison as auto-mergeable, needing manual review, or not a match,
//! and consolidates clean matches in one atomic cross-table merge that
//! preserves links, events, notes, and ranking invariants.

pub mod classify;
pub mod compare;
pub mod config;
pub mod evaluate;
pub mod merge;
pub mod model;
pub mod pairs;
pub mod pipeline;
pub mod report;
pub mod store;

// Re-export main types for convenience
pub use classify::{Disposition, MATCH_THRESHOLD, REVIEW_THRESHOLD};
pub use config::RunTuning;
pub use merge::{MergeError, Merger};
pub use model::{
    Comparison, Event, HousingId, HousingKey, HousingOwnerLink, Note, Owner, OwnerId, ScoredOwner,
};
pub use pipeline::RunContext;
pub use report::{Recorder, Report};
pub use store::{CaseStore, CaseTransaction, MemoryStore, OwnerPatch};

use anyhow::Result;
use std::sync::Arc;

/// Main API for owner deduplication
pub struct Dedup {
    store: Arc<dyn CaseStore>,
    tuning: RunTuning,
}

impl Dedup {
    /// Create an engine over the given store with default tuning.
    pub fn new<S>(store: S) -> Self
    where
        S: CaseStore + 'static,
    {
        Self::with_tuning(store, RunTuning::default())
    }

    /// Create an engine with custom run tuning.
    pub fn with_tuning<S>(store: S, tuning: RunTuning) -> Self
    where
        S: CaseStore + 'static,
    {
        Self {
            store: Arc::new(store),
            tuning,
        }
    }

    /// Run one reconciliation pass over the given owners and return the
    /// accumulated report.
    pub async fn run(&self, owners: Vec<Owner>) -> Result<Report> {
        pipeline::run(Arc::clone(&self.store), &self.tuning, owners).await
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn CaseStore> {
        &self.store
    }
}
