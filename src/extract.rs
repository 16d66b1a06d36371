//! Turn a downloaded artifact into a layer tarball and a build file.

use std::fs;
use std::path::{Path, PathBuf};

use fedorafetch_oci::unpack::is_compressed_archive;
use tracing::info;

use crate::date::DateStamp;
use crate::render::{BuildTemplate, BUILD_FILE_NAME};
use crate::version::VersionLabel;
use crate::{Error, Result};

/// Product name used for the isolated layer file.
pub const LAYER_PRODUCT: &str = "fedora";

/// Durable output of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArtifact {
    pub layer: PathBuf,
    pub build_file: PathBuf,
}

/// `fedora-<YYYYMMDD>.tar`.
pub fn layer_file_name(date: DateStamp) -> String {
    format!("{}-{}.tar", LAYER_PRODUCT, date)
}

/// Settings shared by every extraction in a run.
#[derive(Debug, Clone)]
pub struct Extractor {
    pub version: VersionLabel,
    pub run_date: DateStamp,
    pub template: BuildTemplate,
}

impl Extractor {
    pub fn new(version: VersionLabel, run_date: DateStamp, template: BuildTemplate) -> Self {
        Self {
            version,
            run_date,
            template,
        }
    }

    /// Unpack `artifact`, copy out its first layer, write the build file
    /// next to it and remove everything else the layout brought along.
    /// Blocking; run it off the async executor.
    pub fn extract(&self, artifact: &Path) -> Result<ExtractedArtifact> {
        if !is_compressed_archive(artifact) {
            return Err(Error::Config(format!(
                "{} is not a compressed archive",
                artifact.display()
            )));
        }

        let layer_name = layer_file_name(self.run_date);
        let (layout, layer) = fedorafetch_oci::extract_first_layer(artifact, &layer_name)?;

        let build_file = layout.root().join(BUILD_FILE_NAME);
        fs::write(&build_file, self.template.render(&self.version, &layer.file_name))?;
        info!(path = %build_file.display(), "rendered build file");

        layout.remove_housekeeping()?;

        Ok(ExtractedArtifact {
            layer: layer.path,
            build_file,
        })
    }
}
