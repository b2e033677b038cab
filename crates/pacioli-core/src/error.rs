//! Error types for pacioli
//!
//! This module defines the error types used throughout the pacioli crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! Missing billing data is never an error here: gaps in the daily records
//! degrade to zero-valued results inside the aggregators. Errors are reserved
//! for structurally malformed input and failing collaborators.
//!
//! # Example
//!
//! ```
//! use pacioli_core::error::{PacioliError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to PacioliError
//!     let _file = std::fs::read_to_string("nonexistent.txt")?;
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for pacioli operations
#[derive(Error, Debug)]
pub enum PacioliError {
    /// Reading a mapping file or writing a chart failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid timezone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A cost query that the billing API would reject
    #[error("Invalid cost query: {0}")]
    InvalidQuery(String),

    /// A cost group carried a different number of keys than its grouping requires
    #[error("Malformed cost group on {date}: expected {expected} grouping key(s), found {found}")]
    GroupArity {
        /// Number of keys the grouping requires
        expected: usize,
        /// Number of keys actually present
        found: usize,
        /// Start date of the offending period
        date: NaiveDate,
    },

    /// The same entity appeared twice within one period
    #[error("Duplicate entry for '{entity}' on {date}")]
    DuplicateEntry {
        /// Raw entity id
        entity: String,
        /// Start date of the offending period
        date: NaiveDate,
    },

    /// Billing API failure
    #[error("Cost fetch failed: {0}")]
    Fetch(String),

    /// Object storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Slack API responded with `ok: false`
    #[error("Slack API error: {0}")]
    Slack(String),

    /// Slack channel name could not be resolved
    #[error("Slack channel \"{0}\" not found")]
    ChannelNotFound(String),

    /// Chart drawing or image encoding failed
    #[error("Chart rendering failed: {0}")]
    Chart(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in pacioli
///
/// # Example
///
/// ```
/// use pacioli_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, PacioliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PacioliError::ChannelNotFound("cost_management".to_string());
        assert_eq!(error.to_string(), "Slack channel \"cost_management\" not found");
    }

    #[test]
    fn test_group_arity_display() {
        let error = PacioliError::GroupArity {
            expected: 2,
            found: 1,
            date: NaiveDate::from_ymd_opt(2022, 11, 7).unwrap(),
        };
        assert_eq!(
            error.to_string(),
            "Malformed cost group on 2022-11-07: expected 2 grouping key(s), found 1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let pacioli_error: PacioliError = io_error.into();
        assert!(matches!(pacioli_error, PacioliError::Io(_)));
    }
}
