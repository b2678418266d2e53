pub mod archive;
pub mod docker;
pub mod registry;
pub mod source;

pub use archive::ArchiveSource;
pub use docker::DockerSource;
pub use registry::RegistrySource;
pub use source::Source;

use anyhow::{Context, Result};
use oci_spec::image::ImageConfiguration;

use crate::provenance::Labels;

/// Reads the labels out of an OCI image configuration document.
fn labels_from_config(config: &[u8]) -> Result<Labels> {
    let config: ImageConfiguration =
        serde_json::from_slice(config).context("Failed to parse image configuration")?;
    Ok(config
        .config()
        .as_ref()
        .and_then(|c| c.labels().clone())
        .unwrap_or_default())
}
