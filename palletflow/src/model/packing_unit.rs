//! Packing unit (carton) model.

use super::ids::{ContentId, ItemId, PackageId};
use serde::{Deserialize, Serialize};

/// One physical carton produced by the upstream carton-packing step.
///
/// A packing unit holds `quantity` units of a single item and points back at
/// the persisted package record and its content line. Packing units are read
/// from the upstream carton source and never mutated by this pipeline; the
/// only downstream change is the pallet foreign key stamped onto the
/// referenced package/content records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingUnit {
    /// Item contained in this carton.
    pub item_id: ItemId,

    /// Units of the item inside the carton.
    pub quantity: u32,

    /// Persisted package record this carton corresponds to.
    pub package_id: PackageId,

    /// Persisted package-content line for the item.
    pub content_id: ContentId,
}

impl PackingUnit {
    /// Creates a packing unit.
    pub fn new(
        item_id: impl Into<ItemId>,
        quantity: u32,
        package_id: impl Into<PackageId>,
        content_id: impl Into<ContentId>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            package_id: package_id.into(),
            content_id: content_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing_unit_new() {
        let unit = PackingUnit::new("SKU-1", 12, "PKG-1", "PC-1");
        assert_eq!(unit.item_id.as_str(), "SKU-1");
        assert_eq!(unit.quantity, 12);
        assert_eq!(unit.package_id.as_str(), "PKG-1");
        assert_eq!(unit.content_id.as_str(), "PC-1");
    }
}
