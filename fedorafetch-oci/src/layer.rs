use crate::manifest::Digest;
use std::path::PathBuf;

/// A layer blob copied out of an image layout under its final name.
#[derive(Debug, Clone)]
pub struct IsolatedLayer {
    /// Digest of the blob the layer was copied from.
    pub digest: Digest,
    /// Absolute path of the copied layer tarball.
    pub path: PathBuf,
    /// File name of `path`, as referenced from the build file.
    pub file_name: String,
}
