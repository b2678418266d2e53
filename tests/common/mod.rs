//! Common utilities for integration tests

use git2::{Oid, Repository};
use imagediff::cloner::SshKey;
use imagediff::error::TransportError;
use imagediff::provenance::{Labels, OCI_REVISION, OCI_SOURCE};
use imagediff::{Git2Transport, Notifier, Source, Transport};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use imagediff::fixture::FixtureRepo;

/// Upstream repository the images claim to be built from.
pub const UPSTREAM: &str = "https://github.com/acme/widget";

/// Serves fixed label sets per image name.
#[derive(Default)]
pub struct StaticSource {
    images: HashMap<String, Labels>,
}

impl StaticSource {
    pub fn with_image(mut self, image: &str, labels: &[(&str, &str)]) -> Self {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.images.insert(image.to_string(), labels);
        self
    }

    /// An image labelled with the OCI source and revision keys.
    pub fn with_build(self, image: &str, url: &str, revision: &str) -> Self {
        self.with_image(image, &[(OCI_SOURCE, url), (OCI_REVISION, revision)])
    }
}

impl Source for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn image_labels(&self, image: &str, _notifier: &Notifier) -> anyhow::Result<Labels> {
        self.images
            .get(image)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("image not found: {}", image))
    }
}

/// Clones every URL from a local upstream, recording the URLs asked for.
pub struct MirrorTransport {
    pub upstream: PathBuf,
    pub requested: std::cell::RefCell<Vec<String>>,
}

impl MirrorTransport {
    pub fn new(upstream: &Path) -> Self {
        Self {
            upstream: upstream.to_path_buf(),
            requested: Default::default(),
        }
    }
}

impl Transport for &MirrorTransport {
    fn fetch(
        &self,
        url: &str,
        key: Option<&SshKey>,
        into: &Path,
    ) -> Result<Repository, TransportError> {
        self.requested.borrow_mut().push(url.to_string());
        Git2Transport.fetch(self.upstream.to_str().unwrap(), key, into)
    }
}

pub fn short(id: Oid) -> String {
    id.to_string()[..7].to_string()
}
