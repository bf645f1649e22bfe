//! Per-item pallet capacity data.

use super::ids::ItemId;
use std::collections::HashMap;

/// Conservative fallback when an item declares no pallet capacity:
/// one carton fills a pallet.
pub const DEFAULT_CARTONS_PER_PALLET: u32 = 1;

/// Mapping of item id to declared units-per-pallet.
///
/// Sourced from item master data via a batched lookup. An entry of `0`, or a
/// missing entry, means "no declared capacity" and is treated by the
/// calculator as one carton per pallet — a deliberate conservative default,
/// not an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemCapacities {
    units_per_pallet: HashMap<ItemId, u32>,
}

impl ItemCapacities {
    /// Creates an empty capacity map (every item falls back to the default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the declared units-per-pallet for an item.
    pub fn set(&mut self, item_id: impl Into<ItemId>, units_per_pallet: u32) {
        self.units_per_pallet
            .insert(item_id.into(), units_per_pallet);
    }

    /// Returns the declared units-per-pallet for an item, if any.
    ///
    /// `Some(0)` and `None` are equivalent to callers: no usable capacity.
    pub fn units_per_pallet(&self, item_id: &ItemId) -> Option<u32> {
        self.units_per_pallet.get(item_id).copied()
    }

    /// Number of items with a declared capacity.
    pub fn len(&self) -> usize {
        self.units_per_pallet.len()
    }

    /// Returns true if no item has a declared capacity.
    pub fn is_empty(&self) -> bool {
        self.units_per_pallet.is_empty()
    }
}

impl FromIterator<(ItemId, u32)> for ItemCapacities {
    fn from_iter<I: IntoIterator<Item = (ItemId, u32)>>(iter: I) -> Self {
        Self {
            units_per_pallet: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut caps = ItemCapacities::new();
        caps.set("SKU-1", 40);
        assert_eq!(caps.units_per_pallet(&ItemId::new("SKU-1")), Some(40));
        assert_eq!(caps.units_per_pallet(&ItemId::new("SKU-2")), None);
    }

    #[test]
    fn test_from_iter() {
        let caps: ItemCapacities = [(ItemId::new("A"), 10), (ItemId::new("B"), 5)]
            .into_iter()
            .collect();
        assert_eq!(caps.len(), 2);
        assert!(!caps.is_empty());
    }
}
