//! On-disk OCI image layout handling for downloaded base-image artifacts:
//! unwrap compressed (and possibly nested) archives, then copy the single
//! filesystem layer out of the layout.

pub mod error;
pub mod layer;
pub mod layout;
pub mod manifest;
pub mod unpack;

pub use error::{OciError, Result};
pub use layer::IsolatedLayer;
pub use layout::ImageLayout;
pub use manifest::Digest;

use std::path::Path;
use tracing::info;

/// Unwrap `artifact` into its directory and copy the first layer of the
/// first manifest to `<layout root>/<output_name>`.
///
/// The layout's housekeeping files are left in place; call
/// [`ImageLayout::remove_housekeeping`] once the layer has been consumed.
pub fn extract_first_layer(
    artifact: &Path,
    output_name: &str,
) -> Result<(ImageLayout, IsolatedLayer)> {
    let layout = unpack::unpack_artifact(artifact)?;
    info!(root = %layout.root().display(), "image layout ready");
    let layer = layout.isolate_first_layer(output_name)?;
    Ok((layout, layer))
}
