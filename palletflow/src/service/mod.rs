//! Pipeline service facade.
//!
//! [`PalletPipeline`] owns the backing store, the configuration and the two
//! disjoint worker-slot pools, and wires the pipeline stages together:
//!
//! ```text
//! run_cycle()
//!   └── BatchScheduler ── ChunkJob per chunk ──> planner slot (try-acquire)
//!           └── spawned ChunkPlanner task
//!                   └── AssignmentBatch ──> assignment slot (round-robin)
//!                           └── spawned AssignmentWorker task
//!                                   └── CompletionTracker pass
//! ```
//!
//! Payloads are serialized to JSON at every dispatch boundary and parsed
//! inside the receiving task, matching the platform's opaque-parameter job
//! submission. Slot permits are moved into the spawned tasks and released
//! on drop, so a slot stays occupied for exactly its job's lifetime.

use crate::config::PipelineConfig;
use crate::dispatch::{clock_offset, DispatchError, SlotPool};
use crate::completion::CompletionTracker;
use crate::payload::{AssignmentBatch, ChunkJob};
use crate::planner::{BatchSubmitter, ChunkPlanner};
use crate::scheduler::{BatchScheduler, ChunkSubmitter, SchedulerError, SchedulerReport};
use crate::store::WarehouseStore;
use crate::worker::AssignmentWorker;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Registry of spawned job tasks, drained by [`PalletPipeline::quiesce`].
type TaskRegistry = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Wires the scheduler, planners, workers and tracker over one store.
pub struct PalletPipeline<S> {
    store: Arc<S>,
    config: PipelineConfig,
    planner_pool: Arc<SlotPool>,
    assignment_pool: Arc<SlotPool>,
    tasks: TaskRegistry,
}

impl<S> PalletPipeline<S>
where
    S: WarehouseStore,
{
    /// Creates a pipeline over the given store.
    pub fn new(store: Arc<S>, config: PipelineConfig) -> Self {
        let planner_pool = Arc::new(SlotPool::new("pallet-planner", config.planner_slots));
        let assignment_pool =
            Arc::new(SlotPool::new("package-assignment", config.assignment_slots));
        Self {
            store,
            config,
            planner_pool,
            assignment_pool,
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The planner slot pool (for observing occupancy).
    pub fn planner_pool(&self) -> &SlotPool {
        &self.planner_pool
    }

    /// The assignment slot pool (for observing occupancy).
    pub fn assignment_pool(&self) -> &SlotPool {
        &self.assignment_pool
    }

    /// Runs one scheduler cycle: discovery, chunking and dispatch.
    ///
    /// Returns once every chunk has been submitted (or deferred); the
    /// planning and assignment jobs continue asynchronously in their slots.
    pub async fn run_cycle(self: &Arc<Self>) -> Result<SchedulerReport, SchedulerError> {
        let scheduler = BatchScheduler::new(
            Arc::clone(&self.store),
            Arc::clone(self),
            self.config.clone(),
        );
        scheduler.run_once().await
    }

    /// Awaits every spawned job, including jobs spawned by jobs.
    pub async fn quiesce(&self) {
        loop {
            let drained: Vec<JoinHandle<()>> = {
                let mut tasks = self.tasks.lock().expect("task registry poisoned");
                std::mem::take(&mut *tasks)
            };
            if drained.is_empty() {
                return;
            }
            for handle in drained {
                if let Err(e) = handle.await {
                    error!(error = %e, "Pipeline job panicked");
                }
            }
        }
    }

    fn register(&self, handle: JoinHandle<()>) {
        self.tasks.lock().expect("task registry poisoned").push(handle);
    }
}

impl<S> ChunkSubmitter for PalletPipeline<S>
where
    S: WarehouseStore,
{
    fn submit_chunk(
        &self,
        slot: usize,
        job: ChunkJob,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send {
        let result = (|| {
            let permit = self.planner_pool.try_acquire(slot)?;
            let params =
                serde_json::to_string(&job).map_err(|e| DispatchError::Payload(e.to_string()))?;

            debug!(slot, bytes = params.len(), "Spawning chunk planner job");
            let store = Arc::clone(&self.store);
            let submitter = Arc::new(AssignmentSubmitter {
                store: Arc::clone(&self.store),
                pool: Arc::clone(&self.assignment_pool),
                tasks: Arc::clone(&self.tasks),
            });
            let entity_id = self.config.entity_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let job: ChunkJob = match serde_json::from_str(&params) {
                    Ok(job) => job,
                    Err(e) => {
                        error!(error = %e, "Malformed chunk job payload");
                        return;
                    }
                };
                let planner = ChunkPlanner::new(store, submitter, entity_id);
                let report = planner.run(job).await;
                debug!(?report, "Chunk planner job finished");
            });
            self.register(handle);
            Ok(())
        })();
        async move { result }
    }
}

/// Production [`BatchSubmitter`]: round-robin over the assignment pool,
/// spawning one worker-plus-tracker job per batch.
struct AssignmentSubmitter<S> {
    store: Arc<S>,
    pool: Arc<SlotPool>,
    tasks: TaskRegistry,
}

impl<S> BatchSubmitter for AssignmentSubmitter<S>
where
    S: WarehouseStore,
{
    fn submit_batch(
        &self,
        batch: AssignmentBatch,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send {
        let result = (|| {
            // Wall-clock starting offset spreads load across repeated runs.
            let permit = self
                .pool
                .try_acquire_round_robin(clock_offset(self.pool.capacity()))?;
            let params = serde_json::to_string(&batch)
                .map_err(|e| DispatchError::Payload(e.to_string()))?;

            debug!(
                slot = permit.slot(),
                shipments = batch.jobs.len(),
                "Spawning assignment worker job"
            );
            let store = Arc::clone(&self.store);

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let batch: AssignmentBatch = match serde_json::from_str(&params) {
                    Ok(batch) => batch,
                    Err(e) => {
                        error!(error = %e, "Malformed assignment batch payload");
                        return;
                    }
                };
                let worker = AssignmentWorker::new(Arc::clone(&store));
                let records = worker.run(&batch).await;

                // Terminal accounting pass for this job's records.
                let tracker = CompletionTracker::new(store);
                tracker.reconcile(&records).await;
            });
            self.tasks.lock().expect("task registry poisoned").push(handle);
            Ok(())
        })();
        async move { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PackingUnit, RequestKind, ShipmentId, ShipmentRecord};
    use crate::store::InMemoryStore;

    fn seeded_pipeline(shipments: usize) -> (Arc<InMemoryStore>, Arc<PalletPipeline<InMemoryStore>>) {
        let store = Arc::new(InMemoryStore::new());
        store.add_tenant("acme", true);
        store.set_units_per_pallet("SKU-1", 20);
        store.set_vpn("SKU-1", "VPN-1");
        for i in 0..shipments {
            let mut s = ShipmentRecord::new(
                format!("IF-{}", i),
                format!("Order {}", i),
                "acme",
                RequestKind::PalletRouting,
            );
            s.packages_created = true;
            store.add_shipment(s);
            let sid = ShipmentId::new(format!("IF-{}", i));
            for c in 0..4 {
                store.add_packing_unit(
                    &sid,
                    PackingUnit::new(
                        "SKU-1",
                        2,
                        format!("IF-{}-PKG-{}", i, c),
                        format!("IF-{}-PC-{}", i, c),
                    ),
                );
            }
        }
        let pipeline = Arc::new(PalletPipeline::new(
            Arc::clone(&store),
            PipelineConfig::default(),
        ));
        (store, pipeline)
    }

    #[tokio::test]
    async fn test_cycle_drives_shipments_to_completion() {
        let (store, pipeline) = seeded_pipeline(3);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.chunks_submitted, 1);
        assert_eq!(report.shipments_dispatched, 3);

        pipeline.quiesce().await;

        for s in store.all_shipments() {
            assert!(s.population_complete, "{} not complete", s.id);
        }
        // All slots released after quiesce.
        assert_eq!(pipeline.planner_pool().available(), 10);
        assert_eq!(pipeline.assignment_pool().available(), 10);
    }

    #[tokio::test]
    async fn test_busy_planner_slot_defers_chunk() {
        let (store, pipeline) = seeded_pipeline(2);

        // Occupy slot 0, the deterministic target of the only chunk.
        let held = pipeline.planner_pool().try_acquire(0).unwrap();
        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.chunks_busy, 1);
        assert_eq!(report.shipments_dispatched, 0);

        pipeline.quiesce().await;
        assert!(store.all_shipments().iter().all(|s| s.is_plannable()));

        // Next cycle succeeds once the slot frees up.
        drop(held);
        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.chunks_submitted, 1);
        pipeline.quiesce().await;
        assert!(store.all_shipments().iter().all(|s| s.population_complete));
    }
}
