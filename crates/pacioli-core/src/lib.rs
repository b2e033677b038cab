//! Core types and cost aggregation for pacioli
//!
//! This crate holds the domain types, error handling, the cumulative and
//! change calculations, itemized breakdowns, and the fetcher seam that the
//! AWS, Slack and CLI crates build on.

pub mod change;
pub mod cumulative;
pub mod error;
pub mod fetcher;
pub mod itemized;
pub mod manager;
pub mod mapping;
pub mod period;
pub mod report;
pub mod series;
pub mod tax;
pub mod timezone;
pub mod types;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{PacioliError, Result};
pub use fetcher::{CostFetcher, PagedCostSource, Paginated};
pub use manager::CostManager;
pub use mapping::DisplayNameMapping;
pub use period::{PeriodBoundaries, compute_period_boundaries};
pub use report::ReportManager;
pub use types::{CostChangeResult, CostRecordPeriod, EntityId, ItemizedEntityCost};
