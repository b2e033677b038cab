//! pacioli - AWS cost change reports per account and project, posted to Slack
//!
//! This crate wires the pieces together:
//! - Period boundaries and cumulative cost changes from `pacioli-core`
//! - Cost Explorer and S3 access from `pacioli-aws`
//! - Block Kit messages and posting from `pacioli-slack`
//! - The daily cost chart, rendered to PNG
//! - Terminal table and JSON output for the read-only commands
//!
//! # Examples
//!
//! ```no_run
//! use pacioli::config::Settings;
//! use pacioli::cli::Cli;
//! use pacioli_aws::{CostExplorerSource, load_sdk_config};
//! use pacioli_core::{CostManager, DisplayNameMapping, ReportManager};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> pacioli::Result<()> {
//!     let settings = Settings::from_cli(&Cli::parse_from(["pacioli", "accounts"]))?;
//!     let sdk = load_sdk_config(&settings.region).await;
//!     let costs = CostManager::new(
//!         CostExplorerSource::from_config(&sdk).into_fetcher(),
//!         settings.tag_name.clone(),
//!     );
//!     let reports = ReportManager::new(
//!         costs,
//!         settings.boundaries(),
//!         DisplayNameMapping::default(),
//!         DisplayNameMapping::default(),
//!     );
//!     let accounts = reports.generate_accounts_report().await?;
//!     println!("{} accounts", accounts.len());
//!     Ok(())
//! }
//! ```

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod post;

// Re-export commonly used types
pub use error::{PacioliError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
