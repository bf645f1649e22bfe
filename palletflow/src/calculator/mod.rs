//! Pallet capacity calculator.
//!
//! Pure, deterministic bin packing of cartons onto pallets. Given the
//! cartons of a shipment and the per-item units-per-pallet capacities, this
//! produces a minimal-count set of pallet assignments where cartons of
//! different items may share a pallet.
//!
//! # Algorithm
//!
//! First-fit decreasing with percentage-capacity accounting:
//!
//! 1. Group cartons by item. Each item gets a cached placement profile:
//!    `max_cartons_per_pallet = max(1, units_per_pallet / carton_qty)` and
//!    `percent_per_carton = 100 / max_cartons_per_pallet`.
//! 2. Sort items descending by total demanded percent (carton count times
//!    percent per carton) — hardest-to-place items go first, the classic
//!    decreasing-size heuristic that reduces fragmentation.
//! 3. For each carton, scan open pallets in creation order and place it on
//!    the first pallet where the item's per-pallet carton cap is not yet
//!    reached and the added percent keeps total usage within 100%. Open a
//!    new pallet when no existing one qualifies.
//!
//! Usage is tracked as a running percentage sum rather than a carton count,
//! so dissimilar items share a pallet proportionally to their individual
//! capacity limits. Each call builds its own local arena of pallet
//! builders; there is no shared state and no I/O.

use crate::model::{ItemCapacities, ItemId, PackingUnit, DEFAULT_CARTONS_PER_PALLET};
use std::collections::HashMap;
use tracing::warn;

/// A full pallet, as a percentage.
pub const FULL_PALLET_PERCENT: f64 = 100.0;

/// Tolerance for the floating-point usage sum.
pub const USAGE_EPSILON: f64 = 1e-6;

/// One calculated pallet.
///
/// Produced fresh on every calculation. Pallets are appended, never merged
/// after creation, and a carton belongs to exactly one pallet for the
/// lifetime of the calculation.
#[derive(Clone, Debug, PartialEq)]
pub struct PalletAssignment {
    /// Cartons assigned to this pallet, in placement order.
    pub packages: Vec<PackingUnit>,

    /// Cartons per item on this pallet.
    pub item_counts: HashMap<ItemId, u32>,

    /// Final capacity usage (0.0 - 100.0, within float tolerance).
    pub usage_percent: f64,
}

impl PalletAssignment {
    /// Total cartons on this pallet.
    pub fn total_cartons(&self) -> u32 {
        self.packages.len() as u32
    }

    /// Total units of an item on this pallet.
    pub fn item_quantity(&self, item_id: &ItemId) -> u32 {
        self.packages
            .iter()
            .filter(|p| &p.item_id == item_id)
            .map(|p| p.quantity)
            .sum()
    }
}

/// Cached per-item placement profile, computed once per item.
#[derive(Clone, Copy, Debug)]
struct ItemPlacement {
    max_cartons_per_pallet: u32,
    percent_per_carton: f64,
}

impl ItemPlacement {
    /// Derives the profile from the declared capacity and carton quantity.
    ///
    /// No declared capacity (absent or zero) falls back to one carton per
    /// pallet. A zero carton quantity would divide by zero and is guarded
    /// by the same fallback; such cartons are dropped before placement.
    fn derive(units_per_pallet: Option<u32>, carton_quantity: u32) -> Self {
        let max_cartons_per_pallet = match units_per_pallet {
            Some(cap) if cap > 0 && carton_quantity > 0 => {
                (cap / carton_quantity).max(DEFAULT_CARTONS_PER_PALLET)
            }
            _ => DEFAULT_CARTONS_PER_PALLET,
        };
        Self {
            max_cartons_per_pallet,
            percent_per_carton: FULL_PALLET_PERCENT / max_cartons_per_pallet as f64,
        }
    }
}

/// In-progress pallet inside the calculation's local arena.
#[derive(Debug, Default)]
struct PalletBuilder {
    packages: Vec<PackingUnit>,
    item_counts: HashMap<ItemId, u32>,
    used_percent: f64,
}

impl PalletBuilder {
    /// Returns true if one more carton of the item fits on this pallet:
    /// the item's carton cap is not reached and the usage stays within 100%.
    fn accepts(&self, item_id: &ItemId, placement: &ItemPlacement) -> bool {
        let cartons = self.item_counts.get(item_id).copied().unwrap_or(0);
        cartons < placement.max_cartons_per_pallet
            && self.used_percent + placement.percent_per_carton
                <= FULL_PALLET_PERCENT + USAGE_EPSILON
    }

    fn place(&mut self, unit: &PackingUnit, placement: &ItemPlacement) {
        *self.item_counts.entry(unit.item_id.clone()).or_insert(0) += 1;
        self.used_percent += placement.percent_per_carton;
        self.packages.push(unit.clone());
    }

    fn finish(self) -> PalletAssignment {
        PalletAssignment {
            packages: self.packages,
            item_counts: self.item_counts,
            usage_percent: self.used_percent.min(FULL_PALLET_PERCENT),
        }
    }
}

/// Calculates pallet assignments for the given cartons.
///
/// Deterministic: identical input produces an identical partition and
/// ordering on repeated runs. Zero-quantity cartons are dropped with a
/// warning; an empty input yields an empty output.
pub fn plan_pallets(units: &[PackingUnit], capacities: &ItemCapacities) -> Vec<PalletAssignment> {
    // Group cartons by item, preserving input order within each group.
    let mut groups: Vec<(ItemId, Vec<&PackingUnit>)> = Vec::new();
    let mut group_index: HashMap<ItemId, usize> = HashMap::new();
    for unit in units {
        if unit.quantity == 0 {
            warn!(
                item_id = %unit.item_id,
                package_id = %unit.package_id,
                "Dropping zero-quantity carton"
            );
            continue;
        }
        match group_index.get(&unit.item_id) {
            Some(&idx) => groups[idx].1.push(unit),
            None => {
                group_index.insert(unit.item_id.clone(), groups.len());
                groups.push((unit.item_id.clone(), vec![unit]));
            }
        }
    }

    // Placement profile computed once per item, from the item's first
    // carton (upstream packing produces uniform carton quantities per item).
    let placements: HashMap<ItemId, ItemPlacement> = groups
        .iter()
        .map(|(item_id, cartons)| {
            let placement = ItemPlacement::derive(
                capacities.units_per_pallet(item_id),
                cartons[0].quantity,
            );
            (item_id.clone(), placement)
        })
        .collect();

    // Hardest-to-place items first; tie-break on item id for determinism.
    groups.sort_by(|(a_id, a_cartons), (b_id, b_cartons)| {
        let a_demand = a_cartons.len() as f64 * placements[a_id].percent_per_carton;
        let b_demand = b_cartons.len() as f64 * placements[b_id].percent_per_carton;
        b_demand
            .partial_cmp(&a_demand)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a_id.cmp(b_id))
    });

    // First-fit scan over the local pallet arena, in creation order.
    let mut arena: Vec<PalletBuilder> = Vec::new();
    for (item_id, cartons) in &groups {
        let placement = &placements[item_id];
        for unit in cartons {
            let slot = arena.iter().position(|p| p.accepts(item_id, placement));
            match slot {
                Some(idx) => arena[idx].place(unit, placement),
                None => {
                    let mut pallet = PalletBuilder::default();
                    pallet.place(unit, placement);
                    arena.push(pallet);
                }
            }
        }
    }

    arena.into_iter().map(PalletBuilder::finish).collect()
}
