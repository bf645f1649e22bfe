//! Package assignment worker.
//!
//! Consumes one merged [`AssignmentBatch`], flattens it into independent
//! per-pallet work items and processes each in turn: write the item
//! manifest onto the pallet, then stamp the pallet id onto every package
//! and package-content row listed in the assignment.
//!
//! The three write families are independently caught — a manifest failure
//! does not stop the stamps and vice versa; no write is rolled back (no
//! transactional boundary spans multiple entities). One completion record
//! is emitted per pallet regardless of partial failure, carrying a
//! per-pallet status so the completion tracker can distinguish attempted
//! from clean work.

use crate::payload::{AssignmentBatch, CompletionRecord, CompletionStatus, PalletWorkItem};
use crate::store::{PackageStore, PalletStore};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Processes assignment batches into stamped pallets.
pub struct AssignmentWorker<S> {
    store: Arc<S>,
}

impl<S> AssignmentWorker<S>
where
    S: PalletStore + PackageStore,
{
    /// Creates a worker over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Runs the batch to completion, returning one completion record per
    /// pallet. Work items are processed sequentially within this job;
    /// concurrency comes from many jobs running across the slot pool.
    pub async fn run(&self, batch: &AssignmentBatch) -> Vec<CompletionRecord> {
        let items = batch.flatten();
        info!(
            shipments = batch.jobs.len(),
            pallets = items.len(),
            "Processing assignment batch"
        );

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            records.push(self.process_pallet(&item).await);
        }
        records
    }

    /// Persists one pallet's manifest and stamps, collecting failures
    /// instead of propagating them.
    async fn process_pallet(&self, item: &PalletWorkItem) -> CompletionRecord {
        let payload = &item.payload;
        let mut errors: Vec<String> = Vec::new();
        let mut any_write_succeeded = false;

        match serde_json::to_string(&payload.items) {
            Ok(manifest) => {
                match self.store.write_manifest(&payload.pallet_id, &manifest).await {
                    Ok(()) => any_write_succeeded = true,
                    Err(e) => {
                        error!(
                            shipment_id = %item.shipment_id,
                            pallet_id = %payload.pallet_id,
                            error = %e,
                            "Manifest write failed"
                        );
                        errors.push(format!("manifest write failed: {}", e));
                    }
                }
            }
            Err(e) => {
                error!(pallet_id = %payload.pallet_id, error = %e, "Manifest serialization failed");
                errors.push(format!("manifest serialization failed: {}", e));
            }
        }

        for package_id in &payload.package_ids {
            match self.store.stamp_package(package_id, &payload.pallet_id).await {
                Ok(()) => any_write_succeeded = true,
                Err(e) => {
                    error!(
                        pallet_id = %payload.pallet_id,
                        package_id = %package_id,
                        error = %e,
                        "Package stamp failed"
                    );
                    errors.push(format!("package {} stamp failed: {}", package_id, e));
                }
            }
        }

        for content_id in &payload.content_ids {
            match self.store.stamp_content(content_id, &payload.pallet_id).await {
                Ok(()) => any_write_succeeded = true,
                Err(e) => {
                    error!(
                        pallet_id = %payload.pallet_id,
                        content_id = %content_id,
                        error = %e,
                        "Content stamp failed"
                    );
                    errors.push(format!("content {} stamp failed: {}", content_id, e));
                }
            }
        }

        let status = if errors.is_empty() {
            CompletionStatus::Succeeded
        } else if any_write_succeeded {
            CompletionStatus::PartiallyFailed(errors)
        } else {
            CompletionStatus::Failed(errors)
        };

        debug!(
            shipment_id = %item.shipment_id,
            pallet_id = %payload.pallet_id,
            sequence = item.sequence,
            expected_total = item.expected_total,
            status = ?status,
            "Pallet processed"
        );

        CompletionRecord {
            shipment_id: item.shipment_id.clone(),
            pallet_id: payload.pallet_id.clone(),
            expected_total: item.expected_total,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creator::PalletCreator;
    use crate::model::{PackageId, PackingUnit, RequestKind, ShipmentId, ShipmentRecord};
    use crate::payload::ShipmentPlan;
    use crate::store::InMemoryStore;
    use std::collections::HashMap;

    async fn planned_batch(store: &Arc<InMemoryStore>) -> AssignmentBatch {
        store.set_units_per_pallet("SKU-1", 20);
        store.set_vpn("SKU-1", "VPN-1");
        let mut shipment =
            ShipmentRecord::new("IF-1", "Order 1", "acme", RequestKind::PalletRouting);
        shipment.packages_created = true;
        store.add_shipment(shipment.clone());
        let sid = ShipmentId::new("IF-1");
        for i in 0..12 {
            store.add_packing_unit(
                &sid,
                PackingUnit::new("SKU-1", 2, format!("PKG-{}", i), format!("PC-{}", i)),
            );
        }
        let creator = PalletCreator::new(Arc::clone(store), "WH-1");
        let plan = creator.create_for_shipment(&shipment).await.unwrap();
        AssignmentBatch { jobs: vec![plan] }
    }

    #[tokio::test]
    async fn test_writes_manifests_and_stamps_everything() {
        let store = Arc::new(InMemoryStore::new());
        let batch = planned_batch(&store).await;
        let worker = AssignmentWorker::new(Arc::clone(&store));

        let records = worker.run(&batch).await;

        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.status == CompletionStatus::Succeeded));
        assert!(records.iter().all(|r| r.expected_total == 2));

        let pallets = store.pallets_for(&ShipmentId::new("IF-1"));
        assert!(pallets.iter().all(|p| p.is_populated()));

        // Manifest round-trips as item lines.
        let manifest: Vec<crate::payload::ItemLine> =
            serde_json::from_str(pallets[0].item_manifest.as_ref().unwrap()).unwrap();
        assert_eq!(manifest[0].vpn.as_deref(), Some("VPN-1"));

        // Every package got its pallet foreign key.
        for i in 0..12 {
            let package = store
                .package_snapshot(&PackageId::new(format!("PKG-{}", i)))
                .unwrap();
            assert!(package.pallet_id.is_some(), "PKG-{} not stamped", i);
        }
    }

    #[tokio::test]
    async fn test_missing_pallet_degrades_to_partial_failure() {
        let store = Arc::new(InMemoryStore::new());
        let mut batch = planned_batch(&store).await;
        // Point the first pallet at a record that was never created; the
        // stamps still succeed, so the pallet reports partial failure.
        batch.jobs[0].pallet_assignments[0].pallet_id = "PLT-ghost".into();
        let worker = AssignmentWorker::new(Arc::clone(&store));

        let records = worker.run(&batch).await;

        assert!(matches!(
            records[0].status,
            CompletionStatus::PartiallyFailed(_)
        ));
        assert_eq!(records[1].status, CompletionStatus::Succeeded);
        assert_eq!(records[0].status.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_everything_missing_reports_failed_but_still_emits() {
        let store = Arc::new(InMemoryStore::new());
        let plan = ShipmentPlan {
            shipment_id: ShipmentId::new("IF-ghost"),
            shipment_label: "Ghost".to_string(),
            pallet_assignments: vec![crate::payload::PalletAssignmentPayload {
                shipment_id: ShipmentId::new("IF-ghost"),
                shipment_label: "Ghost".to_string(),
                pallet_id: "PLT-ghost".into(),
                package_ids: vec!["PKG-ghost".into()],
                content_ids: vec!["PC-ghost".into()],
                items: Vec::new(),
                total_cartons: 1,
                pallet_number: 1,
                total_pallets: 1,
            }],
            item_vpn: HashMap::new(),
            total_pallets: 1,
            errors: Vec::new(),
        };
        let worker = AssignmentWorker::new(Arc::clone(&store));

        let records = worker.run(&AssignmentBatch { jobs: vec![plan] }).await;

        // The record is emitted regardless so the tracker has visibility.
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0].status, CompletionStatus::Failed(_)));
        assert_eq!(records[0].status.errors().len(), 3);
    }
}
