//! Domain model for outbound pallet planning.
//!
//! Pure data types only — behavior lives in the pipeline components.
//! Persisted entities (`ShipmentRecord`, `PalletRecord`, `PackageRecord`,
//! `PackageContentRecord`) are owned by the record store behind the
//! [`crate::store`] traits; the in-memory types here mirror the fields the
//! pipeline reads and writes.

mod capacity;
mod ids;
mod packing_unit;
mod pallet;
mod shipment;

pub use capacity::{ItemCapacities, DEFAULT_CARTONS_PER_PALLET};
pub use ids::{ContentId, ItemId, PackageId, PalletId, ShipmentId};
pub use packing_unit::PackingUnit;
pub use pallet::{PackageContentRecord, PackageRecord, PalletRecord};
pub use shipment::{DispatchState, RequestKind, ShipmentRecord, TenantRecord};
