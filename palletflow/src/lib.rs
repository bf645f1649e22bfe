//! PalletFlow - Automated outbound pallet planning
//!
//! This library plans outbound warehouse shipments onto pallets and drives
//! the plans through a multi-stage, concurrency-bounded batch pipeline:
//!
//! ```text
//! scheduler ──chunks──> planner slots ──batches──> assignment slots
//!   (discover)            (plan + create)            (populate + track)
//! ```
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use palletflow::config::PipelineConfig;
//! use palletflow::service::PalletPipeline;
//! use std::sync::Arc;
//!
//! let pipeline = Arc::new(PalletPipeline::new(store, PipelineConfig::default()));
//! let report = pipeline.run_cycle().await?;
//! pipeline.quiesce().await;
//! ```
//!
//! The bin-packing arithmetic itself is pure and usable standalone through
//! [`calculator::plan_pallets`].

pub mod calculator;
pub mod completion;
pub mod config;
pub mod creator;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod payload;
pub mod planner;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod worker;

/// Version of the PalletFlow library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
