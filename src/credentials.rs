//! Registry credentials from Docker's `config.json`, or from the terminal.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::config::default_docker_config_path;

pub const DOCKER_HUB: &str = "docker.io";

/// Username and password for a registry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One entry of the `auths` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthEntry {
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl AuthEntry {
    /// Decodes the base64 `auth` field, or falls back to explicit fields.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(auth) = self.auth.as_deref().filter(|a| !a.is_empty()) {
            let decoded = STANDARD
                .decode(auth.trim())
                .context("Invalid base64 in auth field")?;
            let decoded = String::from_utf8(decoded).context("auth field is not UTF-8")?;
            let (username, password) = decoded
                .split_once(':')
                .ok_or_else(|| anyhow!("auth field is not in username:password form"))?;
            return Ok(Credentials {
                username: username.to_string(),
                password: password.trim_end_matches(['\n', '\0']).to_string(),
            });
        }

        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(anyhow!("auth entry has neither auth nor username/password")),
        }
    }
}

/// Authentication entries keyed by registry, as found in `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthConfigs {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

impl AuthConfigs {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read Docker config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse Docker config {}", path.display()))
    }

    /// Looks up a registry, matching keys written as bare hosts or URLs.
    pub fn get(&self, registry: &str) -> Option<&AuthEntry> {
        let wanted = normalize_registry(registry);
        self.auths
            .get(registry)
            .or_else(|| {
                self.auths
                    .iter()
                    .find(|(key, _)| normalize_registry(key) == wanted)
                    .map(|(_, entry)| entry)
            })
    }

    pub fn len(&self) -> usize {
        self.auths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }
}

/// Registry host of an image reference, `docker.io` when none is given.
pub fn registry_host(image: &str) -> String {
    match image.split_once('/') {
        Some((first, _))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            normalize_registry(first)
        }
        _ => DOCKER_HUB.to_string(),
    }
}

fn normalize_registry(registry: &str) -> String {
    let host = registry
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = host.split('/').next().unwrap_or(host);
    match host {
        "index.docker.io" | "registry-1.docker.io" => DOCKER_HUB.to_string(),
        other => other.to_string(),
    }
}

/// Asks the operator for credentials when none are stored.
pub trait Prompt {
    fn ask(&self, registry: &str) -> Result<Credentials>;
}

/// Reads the username from stdin, prompting on stderr, and the password from
/// the terminal with echo turned off.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, registry: &str) -> Result<Credentials> {
        read_credentials(registry, &mut io::stdin().lock(), &mut io::stderr(), || {
            rpassword::prompt_password("Enter your password: ")
        })
    }
}

/// Reads a username line from `input`; the password comes from
/// `read_password` so it never passes through the echoed stream.
fn read_credentials<R, W, P>(
    registry: &str,
    input: &mut R,
    output: &mut W,
    read_password: P,
) -> Result<Credentials>
where
    R: BufRead,
    W: Write,
    P: FnOnce() -> io::Result<String>,
{
    write!(output, "Enter your username for {}: ", registry)?;
    output.flush()?;
    let mut username = String::new();
    input.read_line(&mut username)?;

    let password = read_password().context("Failed to read password from the terminal")?;

    Ok(Credentials {
        username: username.trim().to_string(),
        password,
    })
}

/// Finds credentials for the registry hosting `image`: the configured Docker
/// config first, then the user's default one, then the prompt.
pub fn resolve_credentials(
    image: &str,
    configured: Option<&Path>,
    prompt: &dyn Prompt,
) -> Result<Credentials> {
    let registry = registry_host(image);
    let default = default_docker_config_path();
    let candidates = configured.into_iter().chain(default.as_deref());

    for path in candidates {
        info!("Reading Docker credentials for {} from {}", registry, path.display());
        match lookup(path, &registry) {
            Ok(credentials) => return Ok(credentials),
            Err(err) => debug!("No usable credentials in {}: {:#}", path.display(), err),
        }
    }

    prompt.ask(&registry)
}

fn lookup(path: &Path, registry: &str) -> Result<Credentials> {
    let configs = AuthConfigs::read(path)?;
    if configs.is_empty() {
        return Err(anyhow!("no registries listed"));
    }
    debug!("{} lists {} registries", path.display(), configs.len());

    configs
        .get(registry)
        .ok_or_else(|| anyhow!("no entry for {}", registry))?
        .credentials()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "auths": {
            "https://index.docker.io/v1/": {
                "auth": "Zm9vOmJhego="
            },
            "quay.io": {
                "auth": "Zm9vOmJhcgo="
            },
            "registry.example.com": {
                "username": "robot",
                "password": "s3cret"
            }
        },
        "HttpHeaders": {
            "User-Agent": "Docker-Client/18.03.1-ce (linux)"
        }
    }"#;

    fn sample_config() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), SAMPLE).unwrap();
        file
    }

    struct FixedPrompt;

    impl Prompt for FixedPrompt {
        fn ask(&self, registry: &str) -> Result<Credentials> {
            Ok(Credentials {
                username: format!("user@{}", registry),
                password: "typed".to_string(),
            })
        }
    }

    #[test]
    fn test_read_auth_configs() {
        let file = sample_config();
        let configs = AuthConfigs::read(file.path()).unwrap();
        assert_eq!(configs.len(), 3);
        assert_eq!(
            configs.get("quay.io"),
            Some(&AuthEntry {
                auth: Some("Zm9vOmJhcgo=".to_string()),
                ..AuthEntry::default()
            })
        );
        assert_eq!(configs.get("non-existing-registry"), None);
    }

    #[test]
    fn test_docker_hub_aliases() {
        let file = sample_config();
        let configs = AuthConfigs::read(file.path()).unwrap();
        assert!(configs.get("docker.io").is_some());
        assert!(configs.get("index.docker.io").is_some());
    }

    #[test]
    fn test_decode_auth_field() {
        let entry = AuthEntry {
            auth: Some("Zm9vOmJhcgo=".to_string()),
            ..AuthEntry::default()
        };
        assert_eq!(
            entry.credentials().unwrap(),
            Credentials {
                username: "foo".to_string(),
                password: "bar".to_string(),
            }
        );
    }

    #[test]
    fn test_explicit_username_and_password() {
        let file = sample_config();
        let configs = AuthConfigs::read(file.path()).unwrap();
        let credentials = configs
            .get("registry.example.com")
            .unwrap()
            .credentials()
            .unwrap();
        assert_eq!(credentials.username, "robot");
        assert_eq!(credentials.password, "s3cret");
    }

    #[test]
    fn test_empty_entry_has_no_credentials() {
        assert!(AuthEntry::default().credentials().is_err());
    }

    #[test]
    fn test_registry_host() {
        assert_eq!(registry_host("owner/image:tag"), "docker.io");
        assert_eq!(registry_host("ubuntu"), "docker.io");
        assert_eq!(registry_host("quay.io/owner/image:tag"), "quay.io");
        assert_eq!(registry_host("localhost:5000/app:v1"), "localhost:5000");
        assert_eq!(registry_host("localhost/app"), "localhost");
        assert_eq!(registry_host("index.docker.io/library/alpine"), "docker.io");
    }

    #[test]
    fn test_resolve_from_configured_file() {
        let file = sample_config();
        let credentials =
            resolve_credentials("quay.io/owner/image:tag", Some(file.path()), &FixedPrompt)
                .unwrap();
        assert_eq!(credentials.username, "foo");
    }

    #[test]
    fn test_debug_hides_password() {
        let credentials = Credentials {
            username: "foo".to_string(),
            password: "bar".to_string(),
        };
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("foo"));
        assert!(!rendered.contains("bar"));
    }

    #[test]
    fn test_resolve_falls_back_to_prompt() {
        let file = sample_config();
        let credentials = resolve_credentials(
            "registry.invalid:5000/owner/image",
            Some(file.path()),
            &FixedPrompt,
        )
        .unwrap();
        assert_eq!(credentials.username, "user@registry.invalid:5000");
        assert_eq!(credentials.password, "typed");
    }

    #[test]
    fn test_config_without_registries_falls_back_to_prompt() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"auths": {}}"#).unwrap();
        assert!(AuthConfigs::read(file.path()).unwrap().is_empty());

        let credentials = resolve_credentials(
            "registry.invalid:5000/owner/image",
            Some(file.path()),
            &FixedPrompt,
        )
        .unwrap();
        assert_eq!(credentials.password, "typed");
    }

    #[test]
    fn test_password_is_not_read_from_the_username_stream() {
        let mut input = io::Cursor::new("alice\nleaked\n");
        let mut output = Vec::new();

        let creds = read_credentials("quay.io", &mut input, &mut output, || {
            Ok("hunter2".to_string())
        })
        .unwrap();

        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "hunter2");
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Enter your username for quay.io: "
        );
    }
}
