//! Shipment and tenant records.

use super::ids::ShipmentId;
use serde::{Deserialize, Serialize};

/// Routing request type carried on a shipment.
///
/// Only shipments requesting pallet routing are eligible for automatic
/// pallet planning; parcel shipments flow through a different (excluded)
/// fulfillment path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Ship on pallets — eligible for this pipeline.
    PalletRouting,
    /// Parcel shipping — never planned here.
    Parcel,
}

/// Dispatch lifecycle of a shipment within the planning pipeline.
///
/// The flag-before-async-completion pattern is made explicit as a small
/// state machine. Transitions are forward-only:
///
/// ```text
/// Undispatched ──> Dispatched ──> PopulationComplete
///                      │
///                      └──> PlanningFailed   (eligible for manual follow-up)
/// ```
///
/// A shipment stuck in `Dispatched` or `PlanningFailed` has no automatic
/// re-drive; operators follow up via the notes field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchState {
    /// Not yet picked up by the batch scheduler.
    #[default]
    Undispatched,
    /// Handed off to a planning chunk; gates re-discovery.
    Dispatched,
    /// Pallet creation failed after dispatch; excluded from its batch.
    PlanningFailed,
    /// Every expected pallet has been populated.
    PopulationComplete,
}

/// A customer (tenant) of the back office.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantRecord {
    /// Tenant identifier.
    pub id: String,
    /// Whether the tenant has opted into automatic pallet creation.
    pub auto_pallet_enabled: bool,
}

/// One outbound shipment as seen by this pipeline.
///
/// Only the fields the pipeline reads or writes are modeled; the host
/// record store owns the full entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShipmentRecord {
    /// Shipment identifier.
    pub id: ShipmentId,

    /// Human-readable shipment label used in payloads and notes.
    pub label: String,

    /// Owning tenant.
    pub tenant: String,

    /// Routing request type.
    pub request_kind: RequestKind,

    /// Marker set by the upstream carton-packing step once packages exist.
    pub packages_created: bool,

    /// Dispatch lifecycle state.
    pub dispatch_state: DispatchState,

    /// Set exactly once, when populated pallets reach the expected total.
    /// Never reset by this pipeline.
    pub population_complete: bool,

    /// Operator-facing notes, appended per planning/reconciliation pass.
    pub pallet_notes: Vec<String>,
}

impl ShipmentRecord {
    /// Creates a new shipment in the undispatched state.
    pub fn new(
        id: impl Into<ShipmentId>,
        label: impl Into<String>,
        tenant: impl Into<String>,
        request_kind: RequestKind,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            tenant: tenant.into(),
            request_kind,
            packages_created: false,
            dispatch_state: DispatchState::default(),
            population_complete: false,
            pallet_notes: Vec::new(),
        }
    }

    /// Returns true if the scheduler may enqueue this shipment:
    /// pallet routing requested, cartons packed, not yet dispatched.
    pub fn is_plannable(&self) -> bool {
        self.request_kind == RequestKind::PalletRouting
            && self.packages_created
            && self.dispatch_state == DispatchState::Undispatched
    }

    /// Marks the shipment as handed off to a planning chunk.
    pub fn mark_dispatched(&mut self) {
        if self.dispatch_state == DispatchState::Undispatched {
            self.dispatch_state = DispatchState::Dispatched;
        }
    }

    /// Records a pallet-creation failure after dispatch.
    pub fn mark_planning_failed(&mut self) {
        if self.dispatch_state == DispatchState::Dispatched {
            self.dispatch_state = DispatchState::PlanningFailed;
        }
    }

    /// Marks pallet population complete. Idempotent; the flag is never
    /// cleared again by this pipeline.
    pub fn mark_population_complete(&mut self) {
        self.population_complete = true;
        self.dispatch_state = DispatchState::PopulationComplete;
    }

    /// Appends an operator-facing note.
    pub fn append_note(&mut self, note: impl Into<String>) {
        self.pallet_notes.push(note.into());
    }
}
