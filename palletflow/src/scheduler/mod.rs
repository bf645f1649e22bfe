//! Batch scheduler: periodic discovery and chunked dispatch.
//!
//! Each run discovers eligible shipments (opted-in tenant, pallet routing
//! requested, upstream packing complete, not yet dispatched), partitions
//! them into fixed-size chunks and submits one planning job per chunk to a
//! deterministic planner slot. Shipments are marked dispatched only after
//! confirmed submission, so a busy slot or a failed submission simply
//! leaves the chunk eligible for the next periodic cycle — at-least-once
//! dispatch, never silent at-most-once.

use crate::config::PipelineConfig;
use crate::dispatch::DispatchError;
use crate::model::ShipmentId;
use crate::payload::ChunkJob;
use crate::store::{ShipmentStore, StoreError, TenantDirectory};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Fatal scheduler-run errors.
///
/// These abort the run before anything is marked dispatched, which makes
/// the whole run safe to retry. Per-chunk submission problems are not
/// errors at this level; they are counted in the [`SchedulerReport`].
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Tenant resolution or shipment search failed.
    #[error("discovery failed: {0}")]
    Discovery(#[from] StoreError),
}

/// Accepts one planning chunk for a specific worker slot.
///
/// The production implementation is the pipeline service, which occupies
/// the slot and spawns the chunk planner; tests substitute a recorder.
pub trait ChunkSubmitter: Send + Sync + 'static {
    /// Submits the chunk to the given planner slot, non-blocking.
    fn submit_chunk(
        &self,
        slot: usize,
        job: ChunkJob,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// Outcome summary of one scheduler run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Shipments returned by the discovery search (post-cap).
    pub discovered: usize,
    /// Shipments dropped by in-run de-duplication or the re-verify pass.
    pub skipped: usize,
    /// Chunks submitted successfully.
    pub chunks_submitted: usize,
    /// Chunks skipped because their slot was busy (expected backpressure).
    pub chunks_busy: usize,
    /// Chunks that failed submission for any other reason.
    pub chunks_failed: usize,
    /// Shipments marked dispatched this run.
    pub shipments_dispatched: usize,
}

/// Partitions shipment ids into chunks of at most `chunk_size`.
///
/// Produces `ceil(len / chunk_size)` chunks covering every id exactly once,
/// in the input order.
pub fn chunk_ids(ids: &[ShipmentId], chunk_size: usize) -> Vec<Vec<ShipmentId>> {
    assert!(chunk_size > 0, "chunk_size must be > 0");
    ids.chunks(chunk_size).map(|c| c.to_vec()).collect()
}

/// Periodic discovery and dispatch entry point.
pub struct BatchScheduler<S, D> {
    store: Arc<S>,
    submitter: Arc<D>,
    config: PipelineConfig,
}

impl<S, D> BatchScheduler<S, D>
where
    S: TenantDirectory + ShipmentStore,
    D: ChunkSubmitter,
{
    /// Creates a scheduler over the given store and chunk submitter.
    pub fn new(store: Arc<S>, submitter: Arc<D>, config: PipelineConfig) -> Self {
        Self {
            store,
            submitter,
            config,
        }
    }

    /// Runs one discovery-and-dispatch cycle.
    pub async fn run_once(&self) -> Result<SchedulerReport, SchedulerError> {
        let mut report = SchedulerReport::default();

        let tenants = self.store.auto_pallet_tenants().await?;
        if tenants.is_empty() {
            info!("No tenants opted into auto pallet creation");
            return Ok(report);
        }

        let candidates = self
            .store
            .search_plannable(&tenants, self.config.max_shipments_per_run)
            .await?;
        report.discovered = candidates.len();

        // De-duplicate within the run and re-verify the not-yet-dispatched
        // condition against current persisted state right before enqueueing.
        // Search results can be stale; this closes that window.
        let mut seen: HashSet<ShipmentId> = HashSet::new();
        let mut work_list: Vec<ShipmentId> = Vec::new();
        for candidate in candidates {
            if !seen.insert(candidate.id.clone()) {
                report.skipped += 1;
                continue;
            }
            match self.store.shipment(&candidate.id).await {
                Ok(current) if current.is_plannable() => work_list.push(current.id),
                Ok(_) => {
                    report.skipped += 1;
                    info!(shipment_id = %candidate.id, "Shipment no longer plannable, skipping");
                }
                Err(e) => {
                    report.skipped += 1;
                    warn!(shipment_id = %candidate.id, error = %e, "Re-verify failed, skipping");
                }
            }
        }

        if work_list.is_empty() {
            info!("No plannable shipments this cycle");
            return Ok(report);
        }

        let chunks = chunk_ids(&work_list, self.config.chunk_size);
        info!(
            shipments = work_list.len(),
            chunks = chunks.len(),
            "Dispatching planning chunks"
        );

        for (index, chunk) in chunks.into_iter().enumerate() {
            let slot = (self.config.planner_slot_base + index) % self.config.planner_slots;
            let job = ChunkJob {
                shipment_ids: chunk.clone(),
            };

            match self.submitter.submit_chunk(slot, job).await {
                Ok(()) => {
                    report.chunks_submitted += 1;
                    // Only now, after confirmed submission, gate re-discovery.
                    for id in &chunk {
                        match self.store.mark_dispatched(id).await {
                            Ok(()) => report.shipments_dispatched += 1,
                            Err(e) => {
                                error!(shipment_id = %id, error = %e, "Failed to mark dispatched")
                            }
                        }
                    }
                }
                Err(DispatchError::SlotBusy { slot, .. }) => {
                    // Expected backpressure: leave the chunk's shipments
                    // unmarked and let the next cycle retry.
                    report.chunks_busy += 1;
                    info!(slot, shipments = chunk.len(), "Planner slot busy, chunk deferred");
                }
                Err(e) => {
                    report.chunks_failed += 1;
                    error!(error = %e, shipments = chunk.len(), "Chunk submission failed");
                }
            }
        }

        Ok(report)
    }
}
