//! Pallet creator: single-shipment planning with persistence.
//!
//! For one shipment, loads its packing units and per-item capacities, runs
//! the pure [`crate::calculator`], persists one pallet record per resulting
//! assignment and returns a [`ShipmentPlan`] payload ready for downstream
//! dispatch.
//!
//! Partial failures (a capacity or VPN lookup, a single pallet create) are
//! recorded in the plan's `errors` list with best-effort defaults applied
//! where possible; only the inability to read the packing units at all is a
//! hard error. The creator never double-creates on its own — invoking it
//! once per shipment per planning cycle is enforced upstream by the
//! dispatch flag.

use crate::calculator::{plan_pallets, PalletAssignment};
use crate::model::{ItemCapacities, ItemId, PalletId, PalletRecord, ShipmentRecord};
use crate::payload::{ItemLine, PalletAssignmentPayload, ShipmentPlan};
use crate::store::{ItemMaster, PackingUnitSource, PalletStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Creates pallets for single shipments.
pub struct PalletCreator<S> {
    store: Arc<S>,
    entity_id: String,
}

impl<S> PalletCreator<S>
where
    S: PackingUnitSource + ItemMaster + PalletStore,
{
    /// Creates a pallet creator stamping the given warehouse entity onto
    /// new pallets.
    pub fn new(store: Arc<S>, entity_id: impl Into<String>) -> Self {
        Self {
            store,
            entity_id: entity_id.into(),
        }
    }

    /// Plans and persists pallets for one shipment.
    ///
    /// Returns a plan with zero pallets (and no errors) when the shipment
    /// has no packing units — a valid no-op the caller must not dispatch
    /// downstream. Returns `Err` only when the packing units cannot be read.
    pub async fn create_for_shipment(
        &self,
        shipment: &ShipmentRecord,
    ) -> Result<ShipmentPlan, StoreError> {
        let mut plan = ShipmentPlan {
            shipment_id: shipment.id.clone(),
            shipment_label: shipment.label.clone(),
            pallet_assignments: Vec::new(),
            item_vpn: HashMap::new(),
            total_pallets: 0,
            errors: Vec::new(),
        };

        let units = self.store.packing_units(&shipment.id).await?;
        if units.is_empty() {
            info!(shipment_id = %shipment.id, "No packing units found, skipping pallet creation");
            return Ok(plan);
        }

        let mut items: Vec<ItemId> = Vec::new();
        for unit in &units {
            if !items.contains(&unit.item_id) {
                items.push(unit.item_id.clone());
            }
        }

        // Best-effort batched lookups: a failed lookup is recorded and the
        // conservative defaults apply (capacity 1 carton/pallet, no VPN).
        let capacities: ItemCapacities = match self.store.units_per_pallet(&items).await {
            Ok(map) => map.into_iter().collect(),
            Err(e) => {
                error!(shipment_id = %shipment.id, error = %e, "Capacity lookup failed");
                plan.errors
                    .push(format!("capacity lookup failed: {}", e));
                ItemCapacities::new()
            }
        };

        plan.item_vpn = match self.store.vpn_for(&items).await {
            Ok(map) => map,
            Err(e) => {
                error!(shipment_id = %shipment.id, error = %e, "VPN lookup failed");
                plan.errors.push(format!("vpn lookup failed: {}", e));
                HashMap::new()
            }
        };

        let assignments = plan_pallets(&units, &capacities);
        let total_pallets = assignments.len() as u32;
        debug!(
            shipment_id = %shipment.id,
            cartons = units.len(),
            pallets = total_pallets,
            "Calculated pallet assignments"
        );

        for (index, assignment) in assignments.iter().enumerate() {
            let number = index as u32 + 1;
            let pallet_id = PalletId::new(format!("{}-P{}", shipment.id, number));
            let record = PalletRecord::new(
                pallet_id.clone(),
                shipment.id.clone(),
                self.entity_id.clone(),
                assignment.total_cartons(),
            );

            // A single create failure is recorded and does not abort the
            // sibling pallets.
            if let Err(e) = self.store.create_pallet(&record).await {
                error!(
                    shipment_id = %shipment.id,
                    pallet_id = %pallet_id,
                    error = %e,
                    "Failed to persist pallet"
                );
                plan.errors
                    .push(format!("pallet {} create failed: {}", pallet_id, e));
                continue;
            }

            plan.pallet_assignments.push(self.build_payload(
                shipment,
                assignment,
                pallet_id,
                number,
                total_pallets,
                &plan.item_vpn,
            ));
        }

        plan.total_pallets = plan.pallet_assignments.len() as u32;
        Ok(plan)
    }

    fn build_payload(
        &self,
        shipment: &ShipmentRecord,
        assignment: &PalletAssignment,
        pallet_id: PalletId,
        pallet_number: u32,
        total_pallets: u32,
        vpns: &HashMap<ItemId, String>,
    ) -> PalletAssignmentPayload {
        let mut items: Vec<ItemLine> = assignment
            .item_counts
            .iter()
            .map(|(item_id, &cartons)| ItemLine {
                item_id: item_id.clone(),
                quantity: assignment.item_quantity(item_id),
                cartons,
                vpn: vpns.get(item_id).cloned(),
            })
            .collect();
        items.sort_by(|a, b| a.item_id.cmp(&b.item_id));

        PalletAssignmentPayload {
            shipment_id: shipment.id.clone(),
            shipment_label: shipment.label.clone(),
            pallet_id,
            package_ids: assignment.packages.iter().map(|p| p.package_id.clone()).collect(),
            content_ids: assignment.packages.iter().map(|p| p.content_id.clone()).collect(),
            items,
            total_cartons: assignment.total_cartons(),
            pallet_number,
            total_pallets,
        }
    }
}
