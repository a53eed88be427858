//! Cloud resource cleanup pipeline
//!
//! This crate provides the core functionality for:
//! - Region reachability probing
//! - Inventory collection with cost, utilization and risk enrichment
//! - Operator selection of cleanup targets
//! - Rate-limited deletion with an audit summary
//! - Metrics and structured audit logging

pub mod config;
pub mod cost;
pub mod deletion;
pub mod error;
pub mod inventory;
pub mod models;
pub mod observability;
pub mod provider;
pub mod region;
pub mod risk;
pub mod selection;
pub mod usage;

pub use config::PipelineConfig;
pub use cost::CostModel;
pub use deletion::{DeletionConfig, DeletionExecutor, DeletionObserver, DeletionReport};
pub use error::{ProviderError, SweepError};
pub use inventory::{Inventory, InventoryCollector, RegionScanFailure};
pub use models::*;
pub use observability::{AuditLogger, SweepMetrics};
pub use provider::{CloudProvider, DeleteOptions, Session, SnapshotProvider};
pub use region::{ProbeReport, RegionObservation, RegionProbe};
pub use risk::RiskClassifier;
pub use selection::{SelectionEngine, SelectionResult, SelectionSet, SelectionSummary};
pub use usage::UsageMetricsProbe;
