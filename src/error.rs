//! Error types for pacioli
//!
//! The binary shares one error enum with the library crates so that fetch,
//! storage and Slack failures propagate with `?` unchanged.
//!
//! # Example
//!
//! ```
//! use pacioli::error::{PacioliError, Result};
//!
//! fn require_token(token: Option<&str>) -> Result<&str> {
//!     token.ok_or_else(|| PacioliError::Config("missing Slack token".to_string()))
//! }
//!
//! assert!(require_token(None).is_err());
//! ```

pub use pacioli_core::error::{PacioliError, Result};
