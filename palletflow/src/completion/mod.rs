//! Completion tracker: terminal accounting after each assignment job.
//!
//! Groups a job's completion records by shipment and compares the
//! shipment's populated-pallet count against the expected total carried on
//! the records. The populated count is read back from the pallet store, so
//! records for one shipment arriving across multiple disjoint worker jobs
//! accumulate correctly regardless of completion order.
//!
//! Marking a shipment complete is idempotent and never happens while
//! `populated < expected`; shortfalls surface only as appended notes for
//! operator follow-up. No retries happen here.

use crate::model::ShipmentId;
use crate::payload::{CompletionRecord, CompletionStatus};
use crate::store::{PalletStore, ShipmentStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reconciliation outcome for one shipment within one tracker pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShipmentReconciliation {
    /// The shipment.
    pub shipment_id: ShipmentId,
    /// Pallets populated so far (across all worker jobs).
    pub populated: u32,
    /// Expected pallet total.
    pub expected: u32,
    /// Records in this pass that reported write failures.
    pub failed_records: usize,
    /// Whether this pass marked the shipment complete.
    pub marked_complete: bool,
}

/// Reconciles completion records against expected pallet totals.
pub struct CompletionTracker<S> {
    store: Arc<S>,
}

impl<S> CompletionTracker<S>
where
    S: ShipmentStore + PalletStore,
{
    /// Creates a tracker over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Processes one worker job's completion records.
    pub async fn reconcile(&self, records: &[CompletionRecord]) -> Vec<ShipmentReconciliation> {
        let mut by_shipment: Vec<(ShipmentId, Vec<&CompletionRecord>)> = Vec::new();
        let mut index: HashMap<ShipmentId, usize> = HashMap::new();
        for record in records {
            match index.get(&record.shipment_id) {
                Some(&i) => by_shipment[i].1.push(record),
                None => {
                    index.insert(record.shipment_id.clone(), by_shipment.len());
                    by_shipment.push((record.shipment_id.clone(), vec![record]));
                }
            }
        }

        let mut outcomes = Vec::with_capacity(by_shipment.len());
        for (shipment_id, group) in by_shipment {
            outcomes.push(self.reconcile_shipment(shipment_id, &group).await);
        }
        outcomes
    }

    async fn reconcile_shipment(
        &self,
        shipment_id: ShipmentId,
        records: &[&CompletionRecord],
    ) -> ShipmentReconciliation {
        let expected = records[0].expected_total;
        let failed_records = records
            .iter()
            .filter(|r| r.status != CompletionStatus::Succeeded)
            .count();

        // Read back rather than count records: populated pallets accumulate
        // across disjoint worker jobs for the same shipment.
        let populated = match self.store.populated_count(&shipment_id).await {
            Ok(count) => count,
            Err(e) => {
                error!(shipment_id = %shipment_id, error = %e, "Populated-pallet count failed");
                0
            }
        };

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let mut marked_complete = false;

        if populated >= expected {
            let note = format!(
                "[{}] Pallet population complete: {}/{} pallets populated",
                timestamp, populated, expected
            );
            match self.store.mark_population_complete(&shipment_id).await {
                Ok(()) => {
                    marked_complete = true;
                    info!(shipment_id = %shipment_id, populated, expected, "Shipment complete");
                    self.append_note(&shipment_id, &note).await;
                }
                Err(e) => {
                    error!(shipment_id = %shipment_id, error = %e, "Failed to mark complete");
                }
            }
        } else {
            // Shortfall: notes only, no flag, no retry. Manual follow-up or
            // a later worker job finishes the shipment.
            warn!(
                shipment_id = %shipment_id,
                populated,
                expected,
                failed_records,
                "Pallet population incomplete"
            );
            let note = format!(
                "[{}] Pallet population partial: {}/{} pallets populated ({} record(s) reported write failures)",
                timestamp, populated, expected, failed_records
            );
            self.append_note(&shipment_id, &note).await;
        }

        ShipmentReconciliation {
            shipment_id,
            populated,
            expected,
            failed_records,
            marked_complete,
        }
    }

    async fn append_note(&self, shipment_id: &ShipmentId, note: &str) {
        if let Err(e) = self.store.append_note(shipment_id, note).await {
            error!(shipment_id = %shipment_id, error = %e, "Failed to append note");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PalletId, PalletRecord, RequestKind, ShipmentRecord};
    use crate::store::InMemoryStore;

    fn record(shipment: &str, pallet: &str, expected: u32) -> CompletionRecord {
        CompletionRecord {
            shipment_id: ShipmentId::new(shipment),
            pallet_id: PalletId::new(pallet),
            expected_total: expected,
            status: CompletionStatus::Succeeded,
        }
    }

    async fn seed(store: &InMemoryStore, shipment: &str, pallets: u32, populated: u32) {
        let mut s =
            ShipmentRecord::new(shipment, format!("Order {}", shipment), "acme", RequestKind::PalletRouting);
        s.packages_created = true;
        s.mark_dispatched();
        store.add_shipment(s);
        for i in 0..pallets {
            let id = format!("{}-P{}", shipment, i + 1);
            store
                .create_pallet(&PalletRecord::new(id.clone(), shipment, "WH-1", 1))
                .await
                .unwrap();
            if i < populated {
                store
                    .write_manifest(&PalletId::new(id), "[]")
                    .await
                    .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_marks_complete_when_populated_reaches_expected() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "IF-1", 3, 3).await;
        let tracker = CompletionTracker::new(Arc::clone(&store));

        let outcomes = tracker
            .reconcile(&[
                record("IF-1", "IF-1-P1", 3),
                record("IF-1", "IF-1-P2", 3),
                record("IF-1", "IF-1-P3", 3),
            ])
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].marked_complete);

        let snap = store.shipment_snapshot(&ShipmentId::new("IF-1")).unwrap();
        assert!(snap.population_complete);
        assert_eq!(snap.pallet_notes.len(), 1);
        assert!(snap.pallet_notes[0].contains("3/3"));
    }

    #[tokio::test]
    async fn test_shortfall_appends_note_without_flag() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "IF-1", 3, 2).await;
        let tracker = CompletionTracker::new(Arc::clone(&store));

        let outcomes = tracker
            .reconcile(&[record("IF-1", "IF-1-P1", 3), record("IF-1", "IF-1-P2", 3)])
            .await;

        assert!(!outcomes[0].marked_complete);
        assert_eq!(outcomes[0].populated, 2);

        let snap = store.shipment_snapshot(&ShipmentId::new("IF-1")).unwrap();
        assert!(!snap.population_complete);
        assert!(snap.pallet_notes[0].contains("partial: 2/3"));
    }

    #[tokio::test]
    async fn test_disjoint_worker_jobs_accumulate_in_either_order() {
        // Two worker jobs for the same shipment: one populated 2 pallets,
        // the other 1, expected total 3. Whichever reconciles last sees all
        // three populated and marks the shipment complete exactly once.
        for flipped in [false, true] {
            let store = Arc::new(InMemoryStore::new());
            seed(&store, "IF-1", 3, 0).await;
            let tracker = CompletionTracker::new(Arc::clone(&store));

            let job_a = vec![record("IF-1", "IF-1-P1", 3), record("IF-1", "IF-1-P2", 3)];
            let job_b = vec![record("IF-1", "IF-1-P3", 3)];
            let (first, second) = if flipped { (&job_b, &job_a) } else { (&job_a, &job_b) };

            // Each worker job populates its pallets before its tracker pass.
            for r in first {
                store.write_manifest(&r.pallet_id, "[]").await.unwrap();
            }
            let outcome1 = tracker.reconcile(first).await;
            assert!(!outcome1[0].marked_complete);

            for r in second {
                store.write_manifest(&r.pallet_id, "[]").await.unwrap();
            }
            let outcome2 = tracker.reconcile(second).await;
            assert!(outcome2[0].marked_complete);

            let snap = store.shipment_snapshot(&ShipmentId::new("IF-1")).unwrap();
            assert!(snap.population_complete);
            // One partial note plus one completion note.
            assert_eq!(snap.pallet_notes.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_reconcile_twice_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "IF-1", 2, 2).await;
        let tracker = CompletionTracker::new(Arc::clone(&store));
        let records = vec![record("IF-1", "IF-1-P1", 2), record("IF-1", "IF-1-P2", 2)];

        tracker.reconcile(&records).await;
        tracker.reconcile(&records).await;

        let snap = store.shipment_snapshot(&ShipmentId::new("IF-1")).unwrap();
        assert!(snap.population_complete);
    }

    #[tokio::test]
    async fn test_never_completes_below_expected() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "IF-1", 1, 1).await;
        let tracker = CompletionTracker::new(Arc::clone(&store));

        // Expected 5, only 1 populated: must never set the flag.
        let outcomes = tracker.reconcile(&[record("IF-1", "IF-1-P1", 5)]).await;
        assert!(!outcomes[0].marked_complete);
        assert!(!store
            .shipment_snapshot(&ShipmentId::new("IF-1"))
            .unwrap()
            .population_complete);
    }

    #[tokio::test]
    async fn test_failed_records_counted_in_note() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "IF-1", 2, 1).await;
        let tracker = CompletionTracker::new(Arc::clone(&store));

        let mut bad = record("IF-1", "IF-1-P2", 2);
        bad.status = CompletionStatus::Failed(vec!["manifest write failed".to_string()]);

        let outcomes = tracker
            .reconcile(&[record("IF-1", "IF-1-P1", 2), bad])
            .await;

        assert_eq!(outcomes[0].failed_records, 1);
        let snap = store.shipment_snapshot(&ShipmentId::new("IF-1")).unwrap();
        assert!(snap.pallet_notes[0].contains("1 record(s)"));
    }

    #[tokio::test]
    async fn test_groups_multiple_shipments_per_pass() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, "IF-1", 1, 1).await;
        seed(&store, "IF-2", 2, 1).await;
        let tracker = CompletionTracker::new(Arc::clone(&store));

        let outcomes = tracker
            .reconcile(&[record("IF-1", "IF-1-P1", 1), record("IF-2", "IF-2-P1", 2)])
            .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].marked_complete);
        assert!(!outcomes[1].marked_complete);
    }
}
