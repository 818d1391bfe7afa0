//! # Merger Module
//!
//! Consumes classified comparisons and performs the transactional
//! consolidation: per-housing link dedup, reference reassignment, owner
//! deletion, and the field merge onto the surviving record.

use crate::classify;
use crate::compare::normalize_line;
use crate::model::{Comparison, HousingKey, HousingOwnerLink, Owner, OwnerId};
use crate::report::SharedReport;
use crate::store::{CaseStore, CaseTransaction, OwnerPatch};
use anyhow::Result;
use hashbrown::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A failed consolidation, carrying the comparison that was being applied
/// and the underlying storage error. The transaction is rolled back before
/// this is raised; no partial mutation survives.
#[derive(Debug, Error)]
#[error("merge of owner {owner} failed: {cause}")]
pub struct MergeError {
    /// Id of the owner that was being kept.
    pub owner: OwnerId,
    /// The comparison that was being applied.
    pub comparison: Box<Comparison>,
    /// The underlying storage error.
    pub cause: anyhow::Error,
}

/// Applies clean matches to the store.
///
/// One merge call runs as a single transaction; unrelated merges may
/// commit in any relative order, but nothing runs in parallel within one
/// consolidation.
pub struct Merger {
    store: Arc<dyn CaseStore>,
    report: SharedReport,
}

impl Merger {
    /// Create a merger writing its removal bookkeeping into the shared
    /// run report.
    pub fn new(store: Arc<dyn CaseStore>, report: SharedReport) -> Self {
        Self { store, report }
    }

    /// Consolidate one comparison.
    ///
    /// No-ops when the comparison needs manual review, when the source
    /// owner was already absorbed by an earlier merge in this run (the
    /// re-entrancy guard that makes redelivery safe), or when no duplicate
    /// qualifies for removal.
    pub async fn merge(&self, comparison: &Comparison) -> Result<(), MergeError> {
        if comparison.needs_review {
            debug!(owner = %comparison.source.id, "left for manual review");
            return Ok(());
        }

        let keeping = &comparison.source;
        let exists = self
            .store
            .owner_exists(keeping.id)
            .await
            .map_err(|cause| self.wrap(comparison, cause))?;
        if !exists {
            debug!(owner = %keeping.id, "source already merged away, skipping");
            return Ok(());
        }

        // A duplicate is removed only when it is an outright match AND
        // would not need review on its own against the source; this
        // single-candidate check is stricter than the aggregate one.
        let removing: Vec<&Owner> = comparison
            .duplicates
            .iter()
            .filter(|duplicate| {
                classify::is_match(duplicate.score)
                    && !classify::needs_manual_review(keeping, std::slice::from_ref(*duplicate))
            })
            .map(|duplicate| &duplicate.owner)
            .collect();
        if removing.is_empty() {
            return Ok(());
        }
        let removing_ids: Vec<OwnerId> = removing.iter().map(|owner| owner.id).collect();

        let (owners_removed, links_removed) = self
            .apply(keeping, &removing, &removing_ids)
            .await
            .map_err(|cause| self.wrap(comparison, cause))?;

        self.report
            .lock()
            .note_removed(owners_removed, links_removed);
        debug!(
            owner = %keeping.id,
            removed = owners_removed,
            links_removed,
            "merged duplicates into keeper"
        );
        Ok(())
    }

    fn wrap(&self, comparison: &Comparison, cause: anyhow::Error) -> MergeError {
        MergeError {
            owner: comparison.source.id,
            comparison: Box::new(comparison.clone()),
            cause,
        }
    }

    /// Run the consolidation inside one transaction; commit on success,
    /// roll back on any error.
    async fn apply(
        &self,
        keeping: &Owner,
        removing: &[&Owner],
        removing_ids: &[OwnerId],
    ) -> Result<(u64, u64)> {
        let mut tx = self.store.begin().await?;
        match consolidate(tx.as_mut(), keeping, removing, removing_ids).await {
            Ok(counts) => {
                tx.commit().await?;
                Ok(counts)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}

/// The transactional body. Returns (owner rows removed, links removed).
async fn consolidate(
    tx: &mut dyn CaseTransaction,
    keeping: &Owner,
    removing: &[&Owner],
    removing_ids: &[OwnerId],
) -> Result<(u64, u64)> {
    let mut touched: Vec<OwnerId> = Vec::with_capacity(removing_ids.len() + 1);
    touched.push(keeping.id);
    touched.extend_from_slice(removing_ids);

    let links = tx.links_by_owner_ids(&touched).await?;
    let doomed = duplicate_links(&links);
    let links_removed = if doomed.is_empty() {
        0
    } else {
        tx.delete_links(&doomed).await?
    };

    tx.reassign_links(removing_ids, keeping.id).await?;
    tx.reassign_events(removing_ids, keeping.id).await?;
    tx.reassign_archived_events(removing_ids, keeping.id).await?;
    tx.reassign_notes(removing_ids, keeping.id).await?;

    let owners_removed = tx.delete_owners(removing_ids).await?;

    let patch = merged_fields(keeping, removing);
    if !patch.is_empty() {
        tx.update_owner(keeping.id, patch).await?;
    }

    Ok((owners_removed, links_removed))
}

/// Among the loaded links, for any housing carrying more than one link
/// keep the minimum-rank link and mark the rest for deletion, so the
/// reassignment step cannot leave two links for one housing under the
/// keeper's id.
fn duplicate_links(links: &[HousingOwnerLink]) -> Vec<HousingOwnerLink> {
    let mut by_housing: HashMap<&HousingKey, Vec<&HousingOwnerLink>> = HashMap::new();
    for link in links {
        by_housing.entry(&link.housing).or_default().push(link);
    }

    let mut doomed = Vec::new();
    for group in by_housing.values() {
        if group.len() < 2 {
            continue;
        }
        let min_rank = group
            .iter()
            .map(|link| link.rank)
            .min()
            .expect("non-empty group");
        let mut kept = false;
        for link in group {
            if !kept && link.rank == min_rank {
                kept = true;
                continue;
            }
            doomed.push((*link).clone());
        }
    }
    doomed
}

/// Merged field values for the keeper: first-non-null precedence over
/// `[keeping, removing...]`. The raw address comes from whichever owner
/// carries the longest address-line list (ties resolved by that same
/// order), street numbers zero-stripped.
fn merged_fields(keeping: &Owner, removing: &[&Owner]) -> OwnerPatch {
    let chain = || std::iter::once(keeping).chain(removing.iter().copied());

    let mut longest = &keeping.raw_address;
    for owner in removing {
        if owner.raw_address.len() > longest.len() {
            longest = &owner.raw_address;
        }
    }
    let raw_address = if longest.is_empty() {
        None
    } else {
        Some(longest.iter().map(|line| normalize_line(line)).collect())
    };

    OwnerPatch {
        administrator: chain().find_map(|owner| owner.administrator.clone()),
        birth_date: chain().find_map(|owner| owner.birth_date),
        email: chain().find_map(|owner| owner.email.clone()),
        phone: chain().find_map(|owner| owner.phone.clone()),
        kind: chain().find_map(|owner| owner.kind.clone()),
        kind_detail: chain().find_map(|owner| owner.kind_detail.clone()),
        raw_address,
    }
}
