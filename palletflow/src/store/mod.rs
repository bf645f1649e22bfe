//! External collaborator seams.
//!
//! This pipeline's only durable storage interface is the host ERP's record
//! store; item master data, the upstream carton source and the tenant
//! directory are read-only lookups. Each collaborator is abstracted behind
//! a focused async trait so components stay testable against small stubs
//! and the full pipeline runs against [`memory::InMemoryStore`].
//!
//! All trait methods return `impl Future` (no boxing) and the traits are
//! used through generic bounds, never trait objects.

pub mod memory;

use crate::model::{
    ItemId, PackingUnit, PalletRecord, ShipmentId, ShipmentRecord, ContentId, PackageId, PalletId,
};
use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;

pub use memory::InMemoryStore;

/// Errors from any of the collaborator seams.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A record the pipeline expected to exist was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind, for the log line.
        kind: &'static str,
        /// The missing id.
        id: String,
    },

    /// The backing store rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Convenience constructor for missing records.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Resolves which tenants have opted into automatic pallet creation.
pub trait TenantDirectory: Send + Sync + 'static {
    /// Returns the ids of tenants with auto pallet creation enabled.
    fn auto_pallet_tenants(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// Shipment record access: discovery search plus the per-shipment
/// state-flag and notes writes.
pub trait ShipmentStore: Send + Sync + 'static {
    /// Keyword-style search for plannable shipments: owned by one of the
    /// given tenants, pallet routing requested, upstream packing complete,
    /// not yet dispatched. The result set is capped at `limit`.
    fn search_plannable(
        &self,
        tenants: &[String],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ShipmentRecord>, StoreError>> + Send;

    /// Loads the current persisted state of a shipment.
    fn shipment(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<ShipmentRecord, StoreError>> + Send;

    /// Marks the shipment as handed off to a planning chunk.
    fn mark_dispatched(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Records a post-dispatch planning failure.
    fn mark_planning_failed(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets the population-complete flag. Idempotent; never unset.
    fn mark_population_complete(
        &self,
        id: &ShipmentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends an operator-facing note to the shipment.
    fn append_note(
        &self,
        id: &ShipmentId,
        note: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Upstream carton source: the packing units produced by the (excluded)
/// carton-packing subsystem, consumed read-only.
pub trait PackingUnitSource: Send + Sync + 'static {
    /// Returns the shipment's packing units. An empty list is a valid
    /// outcome, not an error.
    fn packing_units(
        &self,
        shipment_id: &ShipmentId,
    ) -> impl Future<Output = Result<Vec<PackingUnit>, StoreError>> + Send;
}

/// Item master data: batched units-per-pallet and VPN lookups.
pub trait ItemMaster: Send + Sync + 'static {
    /// Returns declared units-per-pallet for the given items. Items with no
    /// declared capacity are absent from the result.
    fn units_per_pallet(
        &self,
        items: &[ItemId],
    ) -> impl Future<Output = Result<HashMap<ItemId, u32>, StoreError>> + Send;

    /// Returns vendor part numbers for the given items. Items without a VPN
    /// are absent from the result.
    fn vpn_for(
        &self,
        items: &[ItemId],
    ) -> impl Future<Output = Result<HashMap<ItemId, String>, StoreError>> + Send;
}

/// Pallet entity persistence.
pub trait PalletStore: Send + Sync + 'static {
    /// Creates a pallet record.
    fn create_pallet(
        &self,
        pallet: &PalletRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Writes the item-manifest JSON onto an existing pallet.
    fn write_manifest(
        &self,
        pallet_id: &PalletId,
        manifest_json: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Counts the shipment's pallets whose manifest has been populated.
    ///
    /// Read by the completion tracker so that populated counts accumulate
    /// across disjoint worker jobs touching the same shipment.
    fn populated_count(
        &self,
        shipment_id: &ShipmentId,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send;
}

/// Package and package-content stamping. These records are owned by the
/// upstream packing subsystem; this pipeline only sets the pallet foreign
/// key and never creates or deletes them.
pub trait PackageStore: Send + Sync + 'static {
    /// Stamps the assigned pallet onto a package record.
    fn stamp_package(
        &self,
        package_id: &PackageId,
        pallet_id: &PalletId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stamps the assigned pallet onto a package-content record.
    fn stamp_content(
        &self,
        content_id: &ContentId,
        pallet_id: &PalletId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Everything the full pipeline needs from one backing store.
pub trait WarehouseStore:
    TenantDirectory + ShipmentStore + PackingUnitSource + ItemMaster + PalletStore + PackageStore
{
}

impl<T> WarehouseStore for T where
    T: TenantDirectory + ShipmentStore + PackingUnitSource + ItemMaster + PalletStore + PackageStore
{
}
