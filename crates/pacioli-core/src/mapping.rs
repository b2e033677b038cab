//! Display-name mapping
//!
//! Maps account ids and project tag values to human readable names. The
//! mapping is a flat JSON object (`{"<id>": "<name>"}`), loaded once per run.
//! Loading is best effort: a missing or undecodable mapping only costs the
//! names, so it degrades to an empty mapping with a warning.

use crate::error::Result;
use crate::types::UNDEFINED_NAME;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Read-only id to display-name lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayNameMapping {
    names: HashMap<String, String>,
}

impl DisplayNameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of id to name
    ///
    /// # Examples
    /// ```
    /// use pacioli_core::mapping::DisplayNameMapping;
    ///
    /// let mapping = DisplayNameMapping::from_json_str(r#"{"000000000001": "production"}"#).unwrap();
    /// assert_eq!(mapping.name_for("000000000001"), "production");
    /// assert_eq!(mapping.name_for("000000000002"), "UNDEFINED");
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse raw bytes, falling back to an empty mapping on decode errors
    pub fn from_slice_or_empty(bytes: &[u8], source: &str) -> Self {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(mapping) => {
                debug!("Loaded {} display names from {}", mapping.len(), source);
                mapping
            }
            Err(e) => {
                warn!("Could not decode display mapping {}: {}", source, e);
                Self::default()
            }
        }
    }

    /// Load a local JSON file
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load a local JSON file, falling back to an empty mapping
    pub async fn load_file_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_file(path).await {
            Ok(mapping) => {
                debug!("Loaded {} display names from {}", mapping.len(), path.display());
                mapping
            }
            Err(e) => {
                warn!("Could not load display mapping {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Display name for `id`, or `UNDEFINED`
    pub fn name_for(&self, id: &str) -> String {
        self.get(id).unwrap_or(UNDEFINED_NAME).to_string()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    /// All `(id, name)` entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(id, name)| (id.as_str(), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<I, N> FromIterator<(I, N)> for DisplayNameMapping
where
    I: Into<String>,
    N: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (I, N)>>(iter: T) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(id, name)| (id.into(), name.into()))
                .collect(),
        }
    }
}
