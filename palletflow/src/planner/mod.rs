//! Batch pallet planner: one chunk of shipments per worker slot.
//!
//! For each shipment in its chunk the planner independently invokes the
//! pallet creator; one shipment's failure never aborts the chunk. All
//! surviving plans merge into a single [`AssignmentBatch`] dispatched to
//! the package-assignment pool with best-effort round-robin.
//!
//! A shipment whose planning fails is transitioned to `PlanningFailed` and
//! excluded from the batch. A failed batch submission leaves its shipments
//! dispatched but unpopulated — there is no automatic re-drive for that
//! case; the stuck state is visible to operators via the dispatch state.

use crate::creator::PalletCreator;
use crate::dispatch::DispatchError;
use crate::model::ShipmentId;
use crate::payload::{AssignmentBatch, ChunkJob};
use crate::store::{ItemMaster, PackingUnitSource, PalletStore, ShipmentStore};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Accepts one merged assignment batch for the worker pool.
///
/// The production implementation is the pipeline service, which picks an
/// assignment slot round-robin and spawns the worker; tests substitute a
/// recorder.
pub trait BatchSubmitter: Send + Sync + 'static {
    /// Submits the batch, non-blocking round-robin over the pool.
    fn submit_batch(
        &self,
        batch: AssignmentBatch,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// Outcome summary of one chunk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlannerReport {
    /// Shipments planned and merged into the batch.
    pub planned: usize,
    /// Shipments that failed planning and were excluded.
    pub failed: usize,
    /// Shipments skipped as valid no-ops (no packing units).
    pub skipped_empty: usize,
    /// Whether the merged batch was submitted downstream.
    pub batch_submitted: bool,
}

/// Plans every shipment of one chunk and dispatches the merged batch.
pub struct ChunkPlanner<S, D> {
    store: Arc<S>,
    creator: PalletCreator<S>,
    submitter: Arc<D>,
}

impl<S, D> ChunkPlanner<S, D>
where
    S: ShipmentStore + PackingUnitSource + ItemMaster + PalletStore,
    D: BatchSubmitter,
{
    /// Creates a chunk planner stamping the given warehouse entity onto
    /// new pallets.
    pub fn new(store: Arc<S>, submitter: Arc<D>, entity_id: impl Into<String>) -> Self {
        let creator = PalletCreator::new(Arc::clone(&store), entity_id);
        Self {
            store,
            creator,
            submitter,
        }
    }

    /// Processes one chunk to completion.
    pub async fn run(&self, job: ChunkJob) -> PlannerReport {
        let mut report = PlannerReport::default();
        let mut batch = AssignmentBatch::default();

        for shipment_id in &job.shipment_ids {
            let shipment = match self.store.shipment(shipment_id).await {
                Ok(s) => s,
                Err(e) => {
                    error!(shipment_id = %shipment_id, error = %e, "Failed to load shipment");
                    report.failed += 1;
                    continue;
                }
            };

            match self.creator.create_for_shipment(&shipment).await {
                Ok(plan) if plan.is_dispatchable() => {
                    report.planned += 1;
                    batch.jobs.push(plan);
                }
                Ok(plan) if plan.errors.is_empty() => {
                    // Zero pallets, no errors: valid no-op, skip downstream.
                    report.skipped_empty += 1;
                }
                Ok(plan) => {
                    error!(
                        shipment_id = %shipment_id,
                        errors = ?plan.errors,
                        "Pallet creation reported errors, excluding shipment from batch"
                    );
                    report.failed += 1;
                    self.record_planning_failure(shipment_id).await;
                }
                Err(e) => {
                    error!(shipment_id = %shipment_id, error = %e, "Pallet creation failed");
                    report.failed += 1;
                    self.record_planning_failure(shipment_id).await;
                }
            }
        }

        if batch.jobs.is_empty() {
            info!(
                chunk_size = job.shipment_ids.len(),
                "Chunk produced no dispatchable plans"
            );
            return report;
        }

        info!(
            shipments = batch.jobs.len(),
            pallets = batch.total_pallets(),
            "Submitting merged assignment batch"
        );

        match self.submitter.submit_batch(batch).await {
            Ok(()) => report.batch_submitted = true,
            Err(e) => {
                // The shipments stay dispatched-but-unpopulated; operators
                // see the stuck state through the dispatch flag and notes.
                error!(error = %e, "Assignment batch submission failed");
            }
        }

        report
    }

    async fn record_planning_failure(&self, shipment_id: &ShipmentId) {
        if let Err(e) = self.store.mark_planning_failed(shipment_id).await {
            error!(shipment_id = %shipment_id, error = %e, "Failed to record planning failure");
        }
    }
}
