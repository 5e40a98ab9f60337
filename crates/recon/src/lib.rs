//! `meterlink-recon`: daily meter communication SLA reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded source tables, returns the joined
//! master, the projected reports, status classification and aggregates.
//! No CLI or file-format dependencies.

pub mod ageing;
pub mod aggregate;
pub mod classify;
pub mod coalesce;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod projection;
pub mod summary;
pub mod table;

pub use config::PipelineConfig;
pub use engine::{run, summarize_final, PartitionInputs, PartitionReport, RunContext};
pub use error::ReconError;
pub use model::{CommStatus, PartitionSummary, StatusCounts};
pub use table::{Cell, Table};
