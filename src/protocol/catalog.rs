//! Configured catalog: which streams a sync should read.

use serde::{Deserialize, Serialize};

/// A stream requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    /// Stream name.
    pub name: String,
    /// Optional namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ConfiguredStream {
    /// Request a stream by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}

/// The ordered list of streams to sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    /// Requested streams, in the order discovery should start.
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    /// Build a catalog from stream names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            streams: names.into_iter().map(ConfiguredStream::new).collect(),
        }
    }

    /// Parse a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))
    }
}
