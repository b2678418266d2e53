//! Cloning the repository an image was built from.
//!
//! [`Cloner`] clones a [`RepositoryIdentity`] into a temporary bare repository
//! that lives as long as the returned [`ClonedRepository`]. Anonymous HTTPS is
//! tried first; when the server asks for authentication, the clone is retried
//! once over SSH with the operator's private key. The network side sits behind
//! the [`Transport`] trait, with [`Git2Transport`] as the libgit2 implementation.

use git2::build::RepoBuilder;
use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{CloneProtocol, Options};
use crate::error::{CloneError, TransportError};
use crate::repository::RepositoryIdentity;

const SSH_USER: &str = "git";

/// A private key that has been read and checked to look like one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKey {
    path: PathBuf,
}

impl SshKey {
    /// Loads an unencrypted PEM or OpenSSH private key.
    pub fn load(path: &Path) -> Result<Self, CloneError> {
        let invalid = |reason: String| CloneError::PrivateKey {
            path: path.to_path_buf(),
            reason,
        };

        let contents = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let armored = contents.trim_start().starts_with("-----BEGIN")
            && contents.contains("PRIVATE KEY-----");
        if !armored {
            return Err(invalid("not a PEM or OpenSSH private key".to_string()));
        }
        if contents.contains("ENCRYPTED") {
            return Err(invalid(
                "passphrase protected keys are not supported".to_string(),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Fetches a repository from a URL into a directory.
pub trait Transport {
    /// Clones `url` as a bare repository into `into`, authenticating with
    /// `key` when one is given.
    fn fetch(
        &self,
        url: &str,
        key: Option<&SshKey>,
        into: &Path,
    ) -> Result<Repository, TransportError>;
}

/// libgit2-backed transport supporting HTTPS, SSH and local paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Transport;

impl Transport for Git2Transport {
    fn fetch(
        &self,
        url: &str,
        key: Option<&SshKey>,
        into: &Path,
    ) -> Result<Repository, TransportError> {
        let mut callbacks = RemoteCallbacks::new();
        if let Some(key) = key {
            let mut credentials = KeyCredentials::new(key);
            callbacks.credentials(move |_url, username, allowed| {
                credentials.answer(username, allowed)
            });
        }

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let repo = RepoBuilder::new()
            .bare(true)
            .fetch_options(fetch_options)
            .clone(url, into)?;
        Ok(repo)
    }
}

/// Answers libgit2 credential requests with a single SSH key.
///
/// libgit2 keeps asking as long as it gets an answer, so the key is offered
/// once and any later request fails as an authentication error.
struct KeyCredentials<'a> {
    key: &'a SshKey,
    offered: bool,
}

impl<'a> KeyCredentials<'a> {
    fn new(key: &'a SshKey) -> Self {
        Self {
            key,
            offered: false,
        }
    }

    fn answer(
        &mut self,
        username: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        let username = username.unwrap_or(SSH_USER);
        if allowed.contains(CredentialType::SSH_KEY) && !self.offered {
            self.offered = true;
            return Cred::ssh_key(username, None, self.key.path(), None);
        }
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username);
        }
        Err(git2::Error::new(
            git2::ErrorCode::Auth,
            git2::ErrorClass::Ssh,
            format!("SSH key {} was rejected", self.key.path().display()),
        ))
    }
}

/// A bare clone in a temporary directory, removed on drop.
pub struct ClonedRepository {
    repo: Repository,
    url: String,
    _dir: TempDir,
}

impl ClonedRepository {
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// The endpoint the clone succeeded from.
    pub fn url(&self) -> &str {
        &self.url
    }
}

pub struct Cloner<T: Transport> {
    transport: T,
    protocol: CloneProtocol,
    ssh_private_key_path: Option<PathBuf>,
}

impl<T: Transport> Cloner<T> {
    pub fn new(transport: T, options: &Options) -> Self {
        Self {
            transport,
            protocol: options.protocol,
            ssh_private_key_path: options.ssh_private_key_path(),
        }
    }

    pub fn clone_repository(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<ClonedRepository, CloneError> {
        if self.protocol == CloneProtocol::Ssh {
            return self.clone_over_ssh(identity);
        }

        info!("Cloning {} via HTTPS", identity);
        match self.clone_from(&identity.https_url(), None) {
            Err(err) if err.is_authentication_required() => {
                info!("Cloning via HTTPS failed ({}), now retrying via SSH", err);
                self.clone_over_ssh(identity)
            }
            result => result,
        }
    }

    fn clone_over_ssh(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<ClonedRepository, CloneError> {
        let key = self.private_key()?;
        debug!("Using SSH private key {}", key.path().display());
        info!("Cloning {} via SSH", identity);
        self.clone_from(&identity.ssh_url(), Some(&key))
    }

    fn private_key(&self) -> Result<SshKey, CloneError> {
        let path = self
            .ssh_private_key_path
            .as_deref()
            .ok_or_else(|| CloneError::PrivateKey {
                path: PathBuf::from("~/.ssh/id_rsa"),
                reason: "home directory could not be determined".to_string(),
            })?;
        SshKey::load(path)
    }

    fn clone_from(
        &self,
        url: &str,
        key: Option<&SshKey>,
    ) -> Result<ClonedRepository, CloneError> {
        let dir = TempDir::new()?;
        let repo = self
            .transport
            .fetch(url, key, dir.path())
            .map_err(|source| CloneError::Transport {
                url: url.to_string(),
                source,
            })?;

        Ok(ClonedRepository {
            repo,
            url: url.to_string(),
            _dir: dir,
        })
    }
}
