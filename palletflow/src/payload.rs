//! Typed payloads passed between pipeline stages.
//!
//! Every stage boundary crossed by the dispatch facility carries one of
//! these serde types, serialized to JSON at submission and parsed inside
//! the receiving worker slot. The fan-out from a merged batch into
//! individual per-pallet work items is an explicit step
//! ([`AssignmentBatch::flatten`]) so that each work item carries its parent
//! shipment, its sequence within that shipment, and the shipment's expected
//! pallet total.

use crate::model::{ContentId, ItemId, PackageId, PalletId, ShipmentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One item line on a pallet manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLine {
    /// Internal item id.
    pub item_id: ItemId,
    /// Total units of the item on the pallet.
    pub quantity: u32,
    /// Cartons of the item on the pallet.
    pub cartons: u32,
    /// Vendor part number, when the lookup produced one.
    pub vpn: Option<String>,
}

/// One physical pallet, ready for downstream assignment.
///
/// Created once by the pallet creator, enriched with the VPN lookup and its
/// sequence number during payload construction, and only ever appended-to
/// by downstream stamping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PalletAssignmentPayload {
    /// Parent shipment.
    pub shipment_id: ShipmentId,
    /// Human-readable shipment label.
    pub shipment_label: String,
    /// Persisted pallet this payload describes.
    pub pallet_id: PalletId,
    /// Packages assigned to the pallet.
    pub package_ids: Vec<PackageId>,
    /// Package-content lines assigned to the pallet.
    pub content_ids: Vec<ContentId>,
    /// Item manifest lines.
    pub items: Vec<ItemLine>,
    /// Total cartons on the pallet.
    pub total_cartons: u32,
    /// 1-based sequence of this pallet within its shipment.
    pub pallet_number: u32,
    /// Expected pallet total for the shipment.
    pub total_pallets: u32,
}

/// Pallet creator output for one shipment.
///
/// Partial failures are reported through `errors` rather than thrown;
/// callers must treat the plan as usable only when `errors` is empty.
/// Zero pallets with no errors is a valid no-op outcome (no packing units
/// found) and must skip downstream dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPlan {
    /// Planned shipment.
    pub shipment_id: ShipmentId,
    /// Human-readable shipment label.
    pub shipment_label: String,
    /// One payload per persisted pallet, in creation order.
    pub pallet_assignments: Vec<PalletAssignmentPayload>,
    /// VPN per item, from the batched item-master lookup.
    pub item_vpn: HashMap<ItemId, String>,
    /// Expected pallet total for the shipment.
    pub total_pallets: u32,
    /// Partial-failure descriptions accumulated during planning.
    pub errors: Vec<String>,
}

impl ShipmentPlan {
    /// Returns true when the plan produced pallets and no errors.
    pub fn is_dispatchable(&self) -> bool {
        self.errors.is_empty() && !self.pallet_assignments.is_empty()
    }
}

/// Scheduler-to-planner payload: the shipment ids of one chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkJob {
    /// Shipments to plan, at most the configured chunk size.
    pub shipment_ids: Vec<ShipmentId>,
}

/// Planner-to-worker payload: all surviving plans of one chunk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentBatch {
    /// Per-shipment plans merged into one dispatch.
    pub jobs: Vec<ShipmentPlan>,
}

impl AssignmentBatch {
    /// Flattens every shipment's pallet assignments into independent
    /// per-pallet work items, each tagged with its parent shipment and the
    /// shipment's expected pallet total.
    pub fn flatten(&self) -> Vec<PalletWorkItem> {
        self.jobs
            .iter()
            .flat_map(|plan| {
                plan.pallet_assignments
                    .iter()
                    .map(|assignment| PalletWorkItem {
                        shipment_id: plan.shipment_id.clone(),
                        expected_total: plan.total_pallets,
                        sequence: assignment.pallet_number,
                        payload: assignment.clone(),
                    })
            })
            .collect()
    }

    /// Total pallets across all shipments in the batch.
    pub fn total_pallets(&self) -> usize {
        self.jobs.iter().map(|p| p.pallet_assignments.len()).sum()
    }
}

/// One pallet's worth of assignment work.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PalletWorkItem {
    /// Parent shipment.
    pub shipment_id: ShipmentId,
    /// Expected pallet total for the shipment.
    pub expected_total: u32,
    /// 1-based sequence of this pallet within the shipment.
    pub sequence: u32,
    /// The pallet assignment to persist.
    pub payload: PalletAssignmentPayload,
}

/// Outcome of processing one pallet work item.
///
/// Partial write failures are carried here rather than collapsing into a
/// binary emit/no-emit, so the completion tracker sees attempted-vs-failed
/// state per pallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    /// Manifest write and all stamps succeeded.
    Succeeded,
    /// Some writes failed; the pallet is partially populated.
    PartiallyFailed(Vec<String>),
    /// Every write failed.
    Failed(Vec<String>),
}

impl CompletionStatus {
    /// Returns the failure descriptions, if any.
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Succeeded => &[],
            Self::PartiallyFailed(errors) | Self::Failed(errors) => errors,
        }
    }
}

/// Per-pallet completion signal, keyed by shipment.
///
/// Emitted by the assignment worker for every pallet regardless of partial
/// failure; consumed by the completion tracker to reconcile whether the
/// shipment's pallet population is fully done.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Parent shipment.
    pub shipment_id: ShipmentId,
    /// Pallet the work item targeted.
    pub pallet_id: PalletId,
    /// Expected pallet total carried for later reconciliation.
    pub expected_total: u32,
    /// Outcome of the pallet's writes.
    pub status: CompletionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(shipment: &str, number: u32, total: u32) -> PalletAssignmentPayload {
        PalletAssignmentPayload {
            shipment_id: ShipmentId::new(shipment),
            shipment_label: format!("Order {}", shipment),
            pallet_id: PalletId::new(format!("{}-P{}", shipment, number)),
            package_ids: vec![PackageId::new(format!("PKG-{}", number))],
            content_ids: vec![ContentId::new(format!("PC-{}", number))],
            items: vec![ItemLine {
                item_id: ItemId::new("SKU-1"),
                quantity: 10,
                cartons: 1,
                vpn: Some("VPN-1".to_string()),
            }],
            total_cartons: 1,
            pallet_number: number,
            total_pallets: total,
        }
    }

    fn plan(shipment: &str, pallets: u32) -> ShipmentPlan {
        ShipmentPlan {
            shipment_id: ShipmentId::new(shipment),
            shipment_label: format!("Order {}", shipment),
            pallet_assignments: (1..=pallets)
                .map(|n| assignment(shipment, n, pallets))
                .collect(),
            item_vpn: HashMap::new(),
            total_pallets: pallets,
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_flatten_tags_parent_sequence_and_total() {
        let batch = AssignmentBatch {
            jobs: vec![plan("IF-1", 2), plan("IF-2", 1)],
        };

        let items = batch.flatten();
        assert_eq!(items.len(), 3);
        assert_eq!(batch.total_pallets(), 3);

        assert_eq!(items[0].shipment_id, ShipmentId::new("IF-1"));
        assert_eq!(items[0].sequence, 1);
        assert_eq!(items[0].expected_total, 2);
        assert_eq!(items[1].sequence, 2);
        assert_eq!(items[2].shipment_id, ShipmentId::new("IF-2"));
        assert_eq!(items[2].expected_total, 1);
    }

    #[test]
    fn test_plan_dispatchable() {
        let mut p = plan("IF-1", 1);
        assert!(p.is_dispatchable());

        p.errors.push("capacity lookup failed".to_string());
        assert!(!p.is_dispatchable());

        let empty = ShipmentPlan {
            pallet_assignments: Vec::new(),
            total_pallets: 0,
            errors: Vec::new(),
            ..plan("IF-2", 0)
        };
        assert!(!empty.is_dispatchable());
    }

    #[test]
    fn test_completion_status_errors() {
        assert!(CompletionStatus::Succeeded.errors().is_empty());
        let partial = CompletionStatus::PartiallyFailed(vec!["stamp failed".to_string()]);
        assert_eq!(partial.errors().len(), 1);
    }

    #[test]
    fn test_batch_serde_round_trip() {
        let batch = AssignmentBatch {
            jobs: vec![plan("IF-1", 2)],
        };
        let json = serde_json::to_string(&batch).unwrap();
        let back: AssignmentBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, batch);
    }
}
