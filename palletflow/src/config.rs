//! Pipeline configuration.

use crate::dispatch::{DEFAULT_ASSIGNMENT_SLOTS, DEFAULT_PLANNER_SLOTS};

/// Hard cap on shipments handled per scheduler run.
///
/// Keeps each run's resource usage predictable regardless of backlog size;
/// anything beyond the cap is picked up by the next periodic cycle.
pub const DEFAULT_MAX_SHIPMENTS_PER_RUN: usize = 50;

/// Shipments per planning chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// Configuration for one pallet pipeline instance.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Hard cap on shipments discovered per scheduler run.
    pub max_shipments_per_run: usize,

    /// Shipments per planning chunk.
    pub chunk_size: usize,

    /// Size of the pallet-planning slot pool. A hard ceiling matching the
    /// platform's concurrent-worker limit, not an elastic value.
    pub planner_slots: usize,

    /// First planner slot used by the scheduler; chunk `i` targets slot
    /// `(planner_slot_base + i) % planner_slots`.
    pub planner_slot_base: usize,

    /// Size of the package-assignment slot pool, disjoint from the planner
    /// pool so planners never contend with their own downstream dispatch.
    pub assignment_slots: usize,

    /// Warehouse entity stamped onto created pallets.
    pub entity_id: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_shipments_per_run: DEFAULT_MAX_SHIPMENTS_PER_RUN,
            chunk_size: DEFAULT_CHUNK_SIZE,
            planner_slots: DEFAULT_PLANNER_SLOTS,
            planner_slot_base: 0,
            assignment_slots: DEFAULT_ASSIGNMENT_SLOTS,
            entity_id: "WH-1".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Sets the per-run shipment cap.
    pub fn with_max_shipments_per_run(mut self, max: usize) -> Self {
        self.max_shipments_per_run = max;
        self
    }

    /// Sets the chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Sets the planner pool size.
    pub fn with_planner_slots(mut self, slots: usize) -> Self {
        self.planner_slots = slots;
        self
    }

    /// Sets the assignment pool size.
    pub fn with_assignment_slots(mut self, slots: usize) -> Self {
        self.assignment_slots = slots;
        self
    }

    /// Sets the warehouse entity id stamped onto pallets.
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = entity_id.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }
        if self.planner_slots == 0 || self.assignment_slots == 0 {
            return Err("slot pools must have at least one slot".to_string());
        }
        if self.max_shipments_per_run == 0 {
            return Err("max_shipments_per_run must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_shipments_per_run, 50);
        assert_eq!(config.chunk_size, 5);
        assert_eq!(config.planner_slots, 10);
        assert_eq!(config.assignment_slots, 10);
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::default()
            .with_max_shipments_per_run(20)
            .with_chunk_size(4)
            .with_planner_slots(2)
            .with_assignment_slots(3)
            .with_entity_id("WH-EAST");
        assert_eq!(config.max_shipments_per_run, 20);
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.planner_slots, 2);
        assert_eq!(config.assignment_slots, 3);
        assert_eq!(config.entity_id, "WH-EAST");
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        assert!(PipelineConfig::default().with_chunk_size(0).validate().is_err());
        assert!(PipelineConfig::default()
            .with_planner_slots(0)
            .validate()
            .is_err());
        assert!(PipelineConfig::default()
            .with_max_shipments_per_run(0)
            .validate()
            .is_err());
    }
}
