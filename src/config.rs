use std::path::{Path, PathBuf};

/// How the cloner reaches the repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloneProtocol {
    /// Anonymous HTTPS first, SSH only when HTTPS asks for authentication.
    #[default]
    Auto,
    /// SSH only, for repositories that have no anonymous HTTPS access.
    Ssh,
}

/// Operator-supplied settings, fixed for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Docker `config.json` holding registry credentials.
    pub docker_config_path: Option<PathBuf>,
    /// Private key used for SSH clones.
    pub ssh_private_key_path: Option<PathBuf>,
    pub protocol: CloneProtocol,
}

impl Options {
    /// The configured SSH key, or the current user's `~/.ssh/id_rsa`.
    pub fn ssh_private_key_path(&self) -> Option<PathBuf> {
        self.ssh_private_key_path
            .as_deref()
            .map(expand_home)
            .or_else(default_ssh_private_key_path)
    }

    pub fn docker_config_path(&self) -> Option<PathBuf> {
        self.docker_config_path.as_deref().map(expand_home)
    }
}

pub fn default_ssh_private_key_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("id_rsa"))
}

pub fn default_docker_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".docker").join("config.json"))
}

/// Expands a leading `~` to the current user's home directory.
///
/// The path is returned unchanged if it has no `~` prefix or the home
/// directory is unknown.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
