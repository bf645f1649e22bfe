//! Persisted pallet, package and package-content records.

use super::ids::{ContentId, PackageId, PalletId, ShipmentId};

/// A persisted pallet entity.
///
/// Created by the pallet creator (one record per calculated assignment) and
/// later enriched by the package-assignment worker with the item manifest.
/// Never deleted by this pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PalletRecord {
    /// Pallet identifier.
    pub id: PalletId,

    /// Parent shipment.
    pub shipment_id: ShipmentId,

    /// Warehouse entity (site) the pallet is built at.
    pub entity_id: String,

    /// Item manifest JSON (item / quantity / cartons / VPN lines),
    /// written by the assignment worker. `None` until populated.
    pub item_manifest: Option<String>,

    /// Total cartons assigned to this pallet.
    pub total_cartons: u32,
}

impl PalletRecord {
    /// Creates an unpopulated pallet record.
    pub fn new(
        id: impl Into<PalletId>,
        shipment_id: impl Into<ShipmentId>,
        entity_id: impl Into<String>,
        total_cartons: u32,
    ) -> Self {
        Self {
            id: id.into(),
            shipment_id: shipment_id.into(),
            entity_id: entity_id.into(),
            item_manifest: None,
            total_cartons,
        }
    }

    /// Returns true once the assignment worker has written the manifest.
    pub fn is_populated(&self) -> bool {
        self.item_manifest.is_some()
    }
}

/// A persisted package record, owned by the upstream packing subsystem.
///
/// This pipeline only ever stamps `pallet_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageRecord {
    /// Package identifier.
    pub id: PackageId,
    /// Parent shipment.
    pub shipment_id: ShipmentId,
    /// Assigned pallet, stamped by the assignment worker.
    pub pallet_id: Option<PalletId>,
}

/// A persisted package-content line, owned by the upstream packing
/// subsystem. This pipeline only ever stamps `pallet_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageContentRecord {
    /// Content line identifier.
    pub id: ContentId,
    /// Owning package.
    pub package_id: PackageId,
    /// Assigned pallet, stamped by the assignment worker.
    pub pallet_id: Option<PalletId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pallet_record_populated() {
        let mut pallet = PalletRecord::new("PLT-1", "IF-1", "WH-EAST", 8);
        assert!(!pallet.is_populated());

        pallet.item_manifest = Some("[]".to_string());
        assert!(pallet.is_populated());
    }
}
