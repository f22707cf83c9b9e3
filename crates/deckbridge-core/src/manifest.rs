//! Plugin manifest.
//!
//! Only the parts the runtime reads are modelled; schema validation is the
//! packaging tool's job. Keys are PascalCase on disk.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Declarative description of a plugin and the action types it provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "UUID", default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "SDKVersion", default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_path: Option<String>,
    #[serde(default)]
    pub actions: Vec<ManifestAction>,
}

/// One declared action type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManifestAction {
    #[serde(rename = "UUID")]
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// `Keypad`, `Encoder`, or both. Empty means keypad only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controllers: Vec<String>,
}

impl Manifest {
    /// File name the host expects inside a plugin bundle.
    pub const FILE_NAME: &'static str = "manifest.json";

    /// Read and decode a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    /// Whether an action type with this id is declared.
    pub fn declares_action(&self, uuid: &str) -> bool {
        self.actions.iter().any(|a| a.uuid == uuid)
    }

    pub fn action(&self, uuid: &str) -> Option<&ManifestAction> {
        self.actions.iter().find(|a| a.uuid == uuid)
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Error loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),
}
