use anyhow::Result;

use crate::notifier::Notifier;
use crate::provenance::Labels;

/// Source trait for reading image labels from different container sources
pub trait Source {
    /// Returns the name of the source for identification purposes
    fn name(&self) -> &str;

    /// Returns the labels of `image`, fetching the image first if the source needs to.
    /// The image parameter is an image reference for daemon and registry sources,
    /// or a filesystem path for archive sources.
    fn image_labels(&self, image: &str, notifier: &Notifier) -> Result<Labels>;
}

impl<S: Source + ?Sized> Source for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn image_labels(&self, image: &str, notifier: &Notifier) -> Result<Labels> {
        (**self).image_labels(image, notifier)
    }
}
