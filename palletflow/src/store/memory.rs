//! In-memory implementation of the collaborator seams.
//!
//! Backs the integration tests and the CLI demo. State lives behind one
//! `std::sync::Mutex` with short critical sections; async trait methods
//! never hold the lock across an await point.

use super::{
    ItemMaster, PackageStore, PackingUnitSource, PalletStore, ShipmentStore, StoreError,
    TenantDirectory,
};
use crate::model::{
    ContentId, ItemId, PackageContentRecord, PackageId, PackageRecord, PackingUnit, PalletId,
    PalletRecord, ShipmentId, ShipmentRecord, TenantRecord,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    tenants: Vec<TenantRecord>,
    shipments: HashMap<ShipmentId, ShipmentRecord>,
    // Discovery must be deterministic; search walks this insertion order.
    shipment_order: Vec<ShipmentId>,
    packing_units: HashMap<ShipmentId, Vec<PackingUnit>>,
    units_per_pallet: HashMap<ItemId, u32>,
    vpns: HashMap<ItemId, String>,
    pallets: HashMap<PalletId, PalletRecord>,
    packages: HashMap<PackageId, PackageRecord>,
    contents: HashMap<ContentId, PackageContentRecord>,
}

/// Shared in-memory store.
///
/// Cloning is cheap and all clones observe the same state, mirroring how
/// every worker slot sees the same persisted records.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    /// Registers a tenant.
    pub fn add_tenant(&self, id: impl Into<String>, auto_pallet_enabled: bool) {
        self.lock().tenants.push(TenantRecord {
            id: id.into(),
            auto_pallet_enabled,
        });
    }

    /// Inserts a shipment record.
    pub fn add_shipment(&self, shipment: ShipmentRecord) {
        let mut inner = self.lock();
        inner.shipment_order.push(shipment.id.clone());
        inner.shipments.insert(shipment.id.clone(), shipment);
    }

    /// Adds a packing unit to a shipment, along with its package and
    /// content records (as the upstream packing step would have created).
    pub fn add_packing_unit(&self, shipment_id: &ShipmentId, unit: PackingUnit) {
        let mut inner = self.lock();
        inner.packages.insert(
            unit.package_id.clone(),
            PackageRecord {
                id: unit.package_id.clone(),
                shipment_id: shipment_id.clone(),
                pallet_id: None,
            },
        );
        inner.contents.insert(
            unit.content_id.clone(),
            PackageContentRecord {
                id: unit.content_id.clone(),
                package_id: unit.package_id.clone(),
                pallet_id: None,
            },
        );
        inner
            .packing_units
            .entry(shipment_id.clone())
            .or_default()
            .push(unit);
    }

    /// Declares an item's units-per-pallet capacity.
    pub fn set_units_per_pallet(&self, item_id: impl Into<ItemId>, capacity: u32) {
        self.lock().units_per_pallet.insert(item_id.into(), capacity);
    }

    /// Declares an item's vendor part number.
    pub fn set_vpn(&self, item_id: impl Into<ItemId>, vpn: impl Into<String>) {
        self.lock().vpns.insert(item_id.into(), vpn.into());
    }

    // ------------------------------------------------------------------
    // Inspection (tests, CLI demo)
    // ------------------------------------------------------------------

    /// Returns a snapshot of a shipment, if present.
    pub fn shipment_snapshot(&self, id: &ShipmentId) -> Option<ShipmentRecord> {
        self.lock().shipments.get(id).cloned()
    }

    /// Returns snapshots of all shipments, in insertion order.
    pub fn all_shipments(&self) -> Vec<ShipmentRecord> {
        let inner = self.lock();
        inner
            .shipment_order
            .iter()
            .filter_map(|id| inner.shipments.get(id).cloned())
            .collect()
    }

    /// Returns a shipment's pallets, ordered by pallet id.
    pub fn pallets_for(&self, shipment_id: &ShipmentId) -> Vec<PalletRecord> {
        let inner = self.lock();
        let mut pallets: Vec<_> = inner
            .pallets
            .values()
            .filter(|p| &p.shipment_id == shipment_id)
            .cloned()
            .collect();
        pallets.sort_by(|a, b| a.id.cmp(&b.id));
        pallets
    }

    /// Returns a package snapshot, if present.
    pub fn package_snapshot(&self, id: &PackageId) -> Option<PackageRecord> {
        self.lock().packages.get(id).cloned()
    }

    /// Returns a content-line snapshot, if present.
    pub fn content_snapshot(&self, id: &ContentId) -> Option<PackageContentRecord> {
        self.lock().contents.get(id).cloned()
    }
}

impl TenantDirectory for InMemoryStore {
    fn auto_pallet_tenants(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send {
        let tenants = self
            .lock()
            .tenants
            .iter()
            .filter(|t| t.auto_pallet_enabled)
            .map(|t| t.id.clone())
            .collect();
        async move { Ok(tenants) }
    }
}

impl ShipmentStore for InMemoryStore {
    fn search_plannable(
        &self,
        tenants: &[String],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ShipmentRecord>, StoreError>> + Send {
        let inner = self.lock();
        let hits = inner
            .shipment_order
            .iter()
            .filter_map(|id| inner.shipments.get(id))
            .filter(|s| tenants.contains(&s.tenant) && s.is_plannable())
            .take(limit)
            .cloned()
            .collect();
        drop(inner);
        async move { Ok(hits) }
    }

    fn shipment(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<ShipmentRecord, StoreError>> + Send {
        let result = self
            .lock()
            .shipments
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("shipment", id));
        async move { result }
    }

    fn mark_dispatched(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let result = self.update_shipment(id, |s| s.mark_dispatched());
        async move { result }
    }

    fn mark_planning_failed(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let result = self.update_shipment(id, |s| s.mark_planning_failed());
        async move { result }
    }

    fn mark_population_complete(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let result = self.update_shipment(id, |s| s.mark_population_complete());
        async move { result }
    }

    fn append_note(
        &self,
        id: &ShipmentId,
        note: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let note = note.to_string();
        let result = self.update_shipment(id, move |s| s.append_note(note));
        async move { result }
    }
}

impl InMemoryStore {
    fn update_shipment(
        &self,
        id: &ShipmentId,
        update: impl FnOnce(&mut ShipmentRecord),
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.shipments.get_mut(id) {
            Some(shipment) => {
                update(shipment);
                Ok(())
            }
            None => Err(StoreError::not_found("shipment", id)),
        }
    }
}

impl PackingUnitSource for InMemoryStore {
    fn packing_units(
        &self,
        shipment_id: &ShipmentId,
    ) -> impl Future<Output = Result<Vec<PackingUnit>, StoreError>> + Send {
        let units = self
            .lock()
            .packing_units
            .get(shipment_id)
            .cloned()
            .unwrap_or_default();
        async move { Ok(units) }
    }
}

impl ItemMaster for InMemoryStore {
    fn units_per_pallet(
        &self,
        items: &[ItemId],
    ) -> impl Future<Output = Result<HashMap<ItemId, u32>, StoreError>> + Send {
        let inner = self.lock();
        let hits = items
            .iter()
            .filter_map(|id| inner.units_per_pallet.get(id).map(|c| (id.clone(), *c)))
            .collect();
        drop(inner);
        async move { Ok(hits) }
    }

    fn vpn_for(
        &self,
        items: &[ItemId],
    ) -> impl Future<Output = Result<HashMap<ItemId, String>, StoreError>> + Send {
        let inner = self.lock();
        let hits = items
            .iter()
            .filter_map(|id| inner.vpns.get(id).map(|v| (id.clone(), v.clone())))
            .collect();
        drop(inner);
        async move { Ok(hits) }
    }
}

impl PalletStore for InMemoryStore {
    fn create_pallet(
        &self,
        pallet: &PalletRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.lock()
            .pallets
            .insert(pallet.id.clone(), pallet.clone());
        async move { Ok(()) }
    }

    fn write_manifest(
        &self,
        pallet_id: &PalletId,
        manifest_json: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let mut inner = self.lock();
        let result = match inner.pallets.get_mut(pallet_id) {
            Some(pallet) => {
                pallet.item_manifest = Some(manifest_json.to_string());
                Ok(())
            }
            None => Err(StoreError::not_found("pallet", pallet_id)),
        };
        drop(inner);
        async move { result }
    }

    fn populated_count(
        &self,
        shipment_id: &ShipmentId,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send {
        let count = self
            .lock()
            .pallets
            .values()
            .filter(|p| &p.shipment_id == shipment_id && p.is_populated())
            .count() as u32;
        async move { Ok(count) }
    }
}

impl PackageStore for InMemoryStore {
    fn stamp_package(
        &self,
        package_id: &PackageId,
        pallet_id: &PalletId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let mut inner = self.lock();
        let result = match inner.packages.get_mut(package_id) {
            Some(package) => {
                package.pallet_id = Some(pallet_id.clone());
                Ok(())
            }
            None => Err(StoreError::not_found("package", package_id)),
        };
        drop(inner);
        async move { result }
    }

    fn stamp_content(
        &self,
        content_id: &ContentId,
        pallet_id: &PalletId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let mut inner = self.lock();
        let result = match inner.contents.get_mut(content_id) {
            Some(content) => {
                content.pallet_id = Some(pallet_id.clone());
                Ok(())
            }
            None => Err(StoreError::not_found("content", content_id)),
        };
        drop(inner);
        async move { result }
    }
}
