//! # Pipeline Module
//!
//! Bounded-queue producer/consumer pipeline over a batch of owners: the
//! evaluator feeds a tee, which fans every comparison out to the merger
//! and the recorder. The two consumers run independently over the same
//! logical stream; the recorder observes comparisons in evaluation order,
//! while unrelated merges carry no cross-ordering guarantee.

use crate::config::RunTuning;
use crate::evaluate::Evaluator;
use crate::merge::{MergeError, Merger};
use crate::model::{Comparison, Owner};
use crate::pairs::PairCache;
use crate::report::{new_shared_report, Recorder, Report, SharedReport};
use crate::store::CaseStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-run state with explicit creation and disposal boundaries: the
/// pairwise cache and the shared report live exactly as long as one run.
pub struct RunContext {
    pub pairs: PairCache,
    pub report: SharedReport,
}

impl RunContext {
    /// Create the state for a fresh run.
    pub fn new() -> Self {
        Self {
            pairs: PairCache::new(),
            report: new_shared_report(Report::new()),
        }
    }

    /// Flush and surrender the final report, ending the run.
    pub fn finish(self) -> Report {
        let mut report = self.report.lock().clone();
        report.flush();
        report
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one reconciliation pass over the given owners.
///
/// A merge failure is fail-loud: the pipeline drains, the error wrapping
/// the offending comparison propagates, and the transaction that failed
/// has been rolled back. Per-owner evaluation failures are isolated and
/// logged when the tuning says so.
pub async fn run(
    store: Arc<dyn CaseStore>,
    tuning: &RunTuning,
    owners: Vec<Owner>,
) -> Result<Report> {
    let mut ctx = RunContext::new();
    let capacity = tuning.queue_capacity.max(1);
    let isolate = tuning.isolate_evaluation_errors;

    let (comparison_tx, mut comparison_rx) = mpsc::channel::<Comparison>(capacity);
    let (merge_tx, mut merge_rx) = mpsc::channel::<Comparison>(capacity);
    let (record_tx, mut record_rx) = mpsc::channel::<Comparison>(capacity);

    let mut evaluator = Evaluator::with_cache(Arc::clone(&store), std::mem::take(&mut ctx.pairs));
    let evaluator_task = tokio::spawn(async move {
        for owner in owners {
            match evaluator.evaluate(&owner).await {
                Ok(comparison) => {
                    // A closed channel means a consumer failed; its error
                    // surfaces when the task is joined.
                    if comparison_tx.send(comparison).await.is_err() {
                        break;
                    }
                }
                Err(err) if isolate => {
                    warn!(owner = %owner.id, error = %err, "evaluation failed, skipping owner");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(evaluator.into_cache())
    });

    let tee_task = tokio::spawn(async move {
        while let Some(comparison) = comparison_rx.recv().await {
            if record_tx.send(comparison.clone()).await.is_err() {
                break;
            }
            if merge_tx.send(comparison).await.is_err() {
                break;
            }
        }
    });

    let merger = Merger::new(Arc::clone(&store), Arc::clone(&ctx.report));
    let merger_task = tokio::spawn(async move {
        while let Some(comparison) = merge_rx.recv().await {
            merger.merge(&comparison).await?;
        }
        Ok::<(), MergeError>(())
    });

    let recorder = Recorder::new(Arc::clone(&ctx.report));
    let recorder_task = tokio::spawn(async move {
        while let Some(comparison) = record_rx.recv().await {
            recorder.observe(&comparison);
        }
    });

    ctx.pairs = evaluator_task.await.context("evaluator task failed")??;
    tee_task.await.context("tee task failed")?;
    merger_task.await.context("merger task failed")??;
    recorder_task.await.context("recorder task failed")?;

    let cache_stats = ctx.pairs.stats();
    debug!(
        entries = cache_stats.entries,
        hits = cache_stats.hits,
        "pairwise cache usage"
    );

    let report = ctx.finish();
    info!(
        overall = report.overall,
        matches = report.matches,
        need_review = report.need_review,
        removed_owners = report.removed_owners,
        removed_owner_links = report.removed_owner_links,
        "reconciliation run complete"
    );
    Ok(report)
}
