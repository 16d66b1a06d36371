//! Build file (Dockerfile) rendering.

use std::path::Path;

use crate::version::VersionLabel;
use crate::{Error, Result};

/// File name of the rendered build file.
pub const BUILD_FILE_NAME: &str = "Dockerfile";

const VERSION_PLACEHOLDER: &str = "{{ version }}";
const LAYER_PLACEHOLDER: &str = "{{ tar_name }}";

const BUILTIN_TEMPLATE: &str = include_str!("../templates/Dockerfile");

/// A build file template with `{{ version }}` and `{{ tar_name }}`
/// substitution points.
#[derive(Debug, Clone)]
pub struct BuildTemplate {
    text: String,
}

impl BuildTemplate {
    /// The Fedora container Dockerfile shipped with the crate.
    pub fn builtin() -> Self {
        Self {
            text: BUILTIN_TEMPLATE.to_string(),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !text.contains(LAYER_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "build file template never references the layer ({})",
                LAYER_PLACEHOLDER
            )));
        }
        Ok(Self { text })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("read template {}: {}", path.display(), e))
        })?;
        Self::from_text(text)
    }

    pub fn render(&self, version: &VersionLabel, layer_file_name: &str) -> String {
        self.text
            .replace(VERSION_PLACEHOLDER, &version.normalized())
            .replace(LAYER_PLACEHOLDER, layer_file_name)
    }
}

impl Default for BuildTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Render the built-in template.
pub fn render(version: &VersionLabel, layer_file_name: &str) -> String {
    BuildTemplate::builtin().render(version, layer_file_name)
}
