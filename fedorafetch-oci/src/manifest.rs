use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{OciError, Result};

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// A content address of the form `<algorithm>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    pub algorithm: String,
    pub hex: String,
}

impl FromStr for Digest {
    type Err = OciError;

    fn from_str(raw: &str) -> Result<Self> {
        let (algorithm, hex) = raw
            .split_once(':')
            .ok_or_else(|| OciError::Digest(format!("missing algorithm in '{}'", raw)))?;

        if algorithm.is_empty() || hex.is_empty() {
            return Err(OciError::Digest(format!("empty component in '{}'", raw)));
        }
        // Both halves become path components of the blob store.
        if !is_path_safe(algorithm) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(OciError::Digest(format!("unsafe characters in '{}'", raw)));
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

fn is_path_safe(component: &str) -> bool {
    component
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_'))
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// A content-addressable descriptor used in both manifests and image indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "mediaType", default)]
    pub media_type: String,

    pub digest: String,

    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Parse the descriptor's digest string.
    pub fn parsed_digest(&self) -> Result<Digest> {
        self.digest.parse()
    }
}

// ---------------------------------------------------------------------------
// OCI Image Manifest
// ---------------------------------------------------------------------------

/// An OCI image manifest as stored in a layout's blob store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciManifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,

    #[serde(rename = "mediaType", default)]
    pub media_type: String,

    #[serde(default)]
    pub config: Option<Descriptor>,

    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

impl OciManifest {
    /// The first layer of the image. Any further layers are ignored; the
    /// images this tool consumes are single-layer.
    pub fn first_layer(&self) -> Result<&Descriptor> {
        self.layers
            .first()
            .ok_or_else(|| OciError::Manifest("manifest lists no layers".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Image Index
// ---------------------------------------------------------------------------

/// The `index.json` at the root of an OCI image layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageIndex {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,

    #[serde(default)]
    pub manifests: Vec<Descriptor>,
}

impl ImageIndex {
    /// The first manifest listed in the index. Further entries are ignored.
    pub fn first_manifest(&self) -> Result<&Descriptor> {
        self.manifests
            .first()
            .ok_or_else(|| OciError::Manifest("index lists no manifests".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
