//! End-to-end "two images → changelog" pipeline orchestrator.
//!
//! [`ImageComparer`] runs the comparison as a straight sequence of stages:
//! read the labels of both images from a [`Source`], extract their
//! [`Provenance`], locate the repository each one names, check that both name
//! the same one, clone it once, resolve each image's revision, and compute the
//! changelog between the two commits. The first failing stage ends the run
//! with its error; nothing is retried except the HTTPS to SSH fallback inside
//! the clone.

use crate::changelog::changelog;
use crate::cloner::{Cloner, Transport};
use crate::commit::Change;
use crate::config::Options;
use crate::error::{CompareError, ValidationError};
use crate::notifier::Notifier;
use crate::provenance::Provenance;
use crate::repository::RepositoryIdentity;
use crate::resolver::resolve_commit;
use crate::sources::Source;

/// An image whose labels name a repository and a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageProvenance {
    pub image: String,
    pub repository: RepositoryIdentity,
    pub revision: String,
}

impl ImageProvenance {
    /// Checks that the labels name both a repository and a revision, then
    /// parses the repository URL.
    pub fn locate(image: &str, provenance: Provenance) -> Result<Self, CompareError> {
        let vcs_url = provenance
            .vcs_url
            .ok_or_else(|| ValidationError::MissingRepository {
                image: image.to_string(),
            })?;
        let revision = provenance
            .revision
            .ok_or_else(|| ValidationError::MissingRevision {
                image: image.to_string(),
            })?;

        Ok(Self {
            image: image.to_string(),
            repository: RepositoryIdentity::parse(&vcs_url)?,
            revision,
        })
    }
}

/// Orchestrates the comparison of two images for a concrete [`Source`] and
/// [`Transport`].
pub struct ImageComparer<S: Source, T: Transport> {
    source: S,
    cloner: Cloner<T>,
    notifier: Notifier,
}

impl<S: Source, T: Transport> ImageComparer<S, T> {
    pub fn new(source: S, transport: T, options: &Options, notifier: Notifier) -> Self {
        Self {
            source,
            cloner: Cloner::new(transport, options),
            notifier,
        }
    }

    /// Lists the commits that went into `y` since `x`, most recent first.
    ///
    /// # Errors
    /// - [`CompareError::Source`] when the labels of an image cannot be read.
    /// - [`CompareError::Validation`] when an image lacks a repository or
    ///   revision label, or the two images come from different repositories.
    /// - [`CompareError::Parse`] when a repository label is not a VCS URL.
    /// - [`CompareError::Clone`] when the repository cannot be cloned.
    /// - [`CompareError::NotFound`] when a revision is missing from the
    ///   repository's history, or `x` is not an ancestor of `y`.
    pub fn compare(&self, x: &str, y: &str) -> Result<Vec<Change>, CompareError> {
        let result = self.run(x, y);
        self.notifier.finish();
        result
    }

    fn run(&self, x: &str, y: &str) -> Result<Vec<Change>, CompareError> {
        self.notifier.info(&format!(
            "Comparing {} and {} with {} source",
            x,
            y,
            self.source.name()
        ));

        let x = self.provenance(x)?;
        let y = self.provenance(y)?;

        if x.repository != y.repository {
            return Err(ValidationError::RepositoryMismatch {
                x: x.repository,
                y: y.repository,
            }
            .into());
        }

        self.notifier
            .info(&format!("Cloning repository {}...", x.repository));
        let cloned = self.cloner.clone_repository(&x.repository)?;
        self.notifier.debug(&format!("Cloned from {}", cloned.url()));

        self.notifier.info("Resolving revisions...");
        let repo = cloned.repository();
        let from = resolve_commit(repo, &x.revision)?;
        let to = resolve_commit(repo, &y.revision)?;
        self.notifier.debug(&format!(
            "{} is {} ({}), {} is {} ({})",
            x.image,
            from.hash(),
            from.summary(),
            y.image,
            to.hash(),
            to.summary()
        ));
        if from.id() == to.id() {
            self.notifier.warn(&format!(
                "{} and {} were built from the same revision {}",
                x.image,
                y.image,
                from.short_hash()
            ));
        }

        self.notifier.info("Computing changelog...");
        Ok(changelog(repo, &from, &to)?)
    }

    fn provenance(&self, image: &str) -> Result<ImageProvenance, CompareError> {
        self.notifier
            .info(&format!("Reading labels of {}...", image));
        let labels = self
            .source
            .image_labels(image, &self.notifier)
            .map_err(|source| CompareError::Source {
                image: image.to_string(),
                source,
            })?;
        self.notifier
            .trace(&format!("Labels of {}: {:?}", image, labels));

        ImageProvenance::locate(image, Provenance::from_labels(&labels))
    }
}
