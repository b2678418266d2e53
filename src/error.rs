//! Error kinds raised while comparing two images.
//!
//! Each stage of the comparison reports its own typed error so callers can tell
//! a malformed label apart from a failed clone or a commit that is missing from
//! the cloned history. [`CompareError`] wraps all of them for the end-to-end run.

use std::path::PathBuf;

use thiserror::Error;

use crate::repository::RepositoryIdentity;

/// A VCS URL matched neither the HTTPS nor the SSH form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse URL: [{input}]")]
pub struct ParseError {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no repository for {image}")]
    MissingRepository { image: String },

    #[error("no commit hash for {image}")]
    MissingRevision { image: String },

    #[error("source code repositories do not match: {x} != {y}")]
    RepositoryMismatch {
        x: RepositoryIdentity,
        y: RepositoryIdentity,
    },
}

/// Failure reported by a [`crate::cloner::Transport`].
///
/// Authentication failures are classified from the libgit2 error code so the
/// HTTPS to SSH fallback never depends on message text.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("authentication required: {0}")]
    AuthenticationRequired(#[source] git2::Error),

    #[error(transparent)]
    Git(git2::Error),
}

impl TransportError {
    pub fn is_authentication_required(&self) -> bool {
        matches!(self, TransportError::AuthenticationRequired(_))
    }
}

impl From<git2::Error> for TransportError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::Auth => TransportError::AuthenticationRequired(err),
            _ => TransportError::Git(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("failed to clone {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to load SSH private key {}: {reason}", path.display())]
    PrivateKey { path: PathBuf, reason: String },

    #[error("failed to prepare clone directory: {0}")]
    Io(#[from] std::io::Error),
}

impl CloneError {
    pub fn is_authentication_required(&self) -> bool {
        match self {
            CloneError::Transport { source, .. } => source.is_authentication_required(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("commit with short hash [{reference}] could not be found")]
    Revision {
        reference: String,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("commit with hash [{hash}] could not be found")]
    Boundary {
        hash: String,
        #[source]
        source: Option<git2::Error>,
    },
}

impl NotFoundError {
    pub(crate) fn revision(reference: &str) -> Self {
        NotFoundError::Revision {
            reference: reference.to_string(),
            source: None,
        }
    }

    pub(crate) fn boundary(hash: &str) -> Self {
        NotFoundError::Boundary {
            hash: hash.to_string(),
            source: None,
        }
    }
}

/// Terminal error of an image comparison: the first failure of any stage.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to read image metadata for {image}: {source:#}")]
    Source {
        image: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Clone(#[from] CloneError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}
