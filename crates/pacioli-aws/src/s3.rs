//! Display mapping stored in S3

use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use pacioli_core::error::{PacioliError, Result};
use pacioli_core::mapping::DisplayNameMapping;
use tracing::{info, warn};

/// Split `s3://bucket/key` into bucket and key
///
/// # Examples
/// ```
/// use pacioli_aws::parse_s3_uri;
///
/// let (bucket, key) = parse_s3_uri("s3://billing/mappings/projects.json").unwrap();
/// assert_eq!(bucket, "billing");
/// assert_eq!(key, "mappings/projects.json");
/// ```
pub fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| PacioliError::InvalidArgument(format!("not an s3:// uri: '{uri}'")))?;
    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((bucket.to_string(), key.to_string()))
        }
        _ => Err(PacioliError::InvalidArgument(format!(
            "expected s3://<bucket>/<key>, got '{uri}'"
        ))),
    }
}

/// Reads display-name mappings from S3
#[derive(Debug, Clone)]
pub struct S3MappingLoader {
    client: Client,
}

impl S3MappingLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client, optionally against a custom endpoint (path-style)
    pub fn from_config(config: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }

    /// Download the raw object at `uri`
    pub async fn fetch_object(&self, uri: &str) -> Result<Vec<u8>> {
        let (bucket, key) = parse_s3_uri(uri)?;
        let output = self
            .client
            .get_object()
            .bucket(&bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| PacioliError::Storage(DisplayErrorContext(&e).to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| PacioliError::Storage(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }

    /// Load the mapping at `uri`, or an empty mapping if it cannot be read
    pub async fn load_or_empty(&self, uri: &str) -> DisplayNameMapping {
        info!("Loading display mapping from {}", uri);
        match self.fetch_object(uri).await {
            Ok(bytes) => DisplayNameMapping::from_slice_or_empty(&bytes, uri),
            Err(e) => {
                warn!("Could not load display mapping {}: {}", uri, e);
                DisplayNameMapping::default()
            }
        }
    }
}
