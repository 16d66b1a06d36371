use crate::error::{OciError, Result};
use crate::layer::IsolatedLayer;
use crate::manifest::{Digest, ImageIndex, OciManifest};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the layout's top-level index.
pub const INDEX_FILE: &str = "index.json";
/// Marker file written by OCI layout producers.
pub const LAYOUT_MARKER_FILE: &str = "oci-layout";
/// Docker-archive manifest that some producers emit next to the OCI files.
pub const DOCKER_MANIFEST_FILE: &str = "manifest.json";
/// Blob store directory name.
pub const BLOBS_DIR: &str = "blobs";

/// An extracted OCI image layout rooted at a directory:
/// `<root>/index.json`, `<root>/oci-layout`, `<root>/blobs/<alg>/<hex>`.
#[derive(Debug, Clone)]
pub struct ImageLayout {
    root: PathBuf,
}

impl ImageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns `true` when `dir` holds an `index.json`.
    pub fn is_layout(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Return the expected path for a blob with the given digest.
    pub fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join(BLOBS_DIR)
            .join(&digest.algorithm)
            .join(&digest.hex)
    }

    pub fn read_index(&self) -> Result<ImageIndex> {
        let path = self.index_path();
        let bytes = fs::read(&path)
            .map_err(|e| OciError::Layout(format!("read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn read_manifest(&self, digest: &Digest) -> Result<OciManifest> {
        let path = self.existing_blob(digest)?;
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Follow index → first manifest → first layer and copy that layer blob
    /// to `<root>/<output_name>`.
    pub fn isolate_first_layer(&self, output_name: &str) -> Result<IsolatedLayer> {
        let index = self.read_index()?;
        let manifest_digest = index.first_manifest()?.parsed_digest()?;
        if index.manifests.len() > 1 {
            debug!(
                count = index.manifests.len(),
                "index lists several manifests; using the first",
            );
        }

        let manifest = self.read_manifest(&manifest_digest)?;
        let layer_digest = manifest.first_layer()?.parsed_digest()?;
        if manifest.layers.len() > 1 {
            debug!(
                count = manifest.layers.len(),
                "manifest lists several layers; using the first",
            );
        }

        let layer_blob = self.existing_blob(&layer_digest)?;
        let output = self.root.join(output_name);
        fs::copy(&layer_blob, &output)?;
        info!(
            digest = %layer_digest,
            path = %output.display(),
            "isolated layer",
        );
        Ok(IsolatedLayer {
            digest: layer_digest,
            path: output,
            file_name: output_name.to_string(),
        })
    }

    /// Remove the blob store and the layout metadata files, keeping
    /// everything else in the directory.
    pub fn remove_housekeeping(&self) -> Result<()> {
        let blobs = self.root.join(BLOBS_DIR);
        if blobs.exists() {
            fs::remove_dir_all(&blobs)?;
        }
        for name in [INDEX_FILE, LAYOUT_MARKER_FILE, DOCKER_MANIFEST_FILE] {
            let path = self.root.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(root = %self.root.display(), "removed layout housekeeping files");
        Ok(())
    }

    fn existing_blob(&self, digest: &Digest) -> Result<PathBuf> {
        let path = self.blob_path(digest);
        if path.is_file() {
            Ok(path)
        } else {
            Err(OciError::NotFound(format!(
                "blob {} ({})",
                digest,
                path.display()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
