//! AWS collaborators for pacioli
//!
//! Cost Explorer backs the [`pacioli_core::PagedCostSource`] seam, and S3
//! holds the project display-name mapping.

pub mod cost_explorer;
pub mod s3;

pub use cost_explorer::CostExplorerSource;
pub use s3::{S3MappingLoader, parse_s3_uri};

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// Load shared AWS configuration for `region` from the default credential chain
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}
