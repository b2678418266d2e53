use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use super::Source;
use crate::notifier::Notifier;
use crate::provenance::Labels;

/// Docker implementation of the Source trait, driving the `docker` CLI.
///
/// Images missing from the local daemon are pulled first. Registry
/// authentication is left to the CLI, pointed at the configured Docker
/// config directory when one is given.
pub struct DockerSource {
    config_dir: Option<PathBuf>,
    _staged: Option<TempDir>,
}

impl DockerSource {
    pub fn new(docker_config_path: Option<&Path>) -> Result<Self> {
        let output = Command::new("docker")
            .arg("--version")
            .output()
            .context("Failed to execute docker command. Is Docker installed and running?")?;

        if !output.status.success() {
            return Err(anyhow!("Docker is not available"));
        }

        Self::with_config_file(docker_config_path)
    }

    /// `docker --config` takes the directory holding `config.json`, so a
    /// credentials file under any other name is copied into a scratch
    /// directory as `config.json`.
    fn with_config_file(docker_config_path: Option<&Path>) -> Result<Self> {
        let Some(path) = docker_config_path else {
            return Ok(Self {
                config_dir: None,
                _staged: None,
            });
        };

        if path.file_name().is_some_and(|name| name == "config.json") {
            return Ok(Self {
                config_dir: Some(path.parent().unwrap_or(path).to_path_buf()),
                _staged: None,
            });
        }

        let staged = TempDir::new().context("Failed to create Docker config directory")?;
        fs::copy(path, staged.path().join("config.json"))
            .with_context(|| format!("Failed to read Docker config file: {}", path.display()))?;
        Ok(Self {
            config_dir: Some(staged.path().to_path_buf()),
            _staged: Some(staged),
        })
    }

    fn command_args<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(dir) = self.config_dir.as_deref().and_then(Path::to_str) {
            full.extend(["--config", dir]);
        }
        full.extend_from_slice(args);
        full
    }

    fn run_command(&self, args: &[&str]) -> Result<String> {
        let args = self.command_args(args);
        let output = Command::new("docker")
            .args(&args)
            .output()
            .context(format!("Failed to execute docker command: {:?}", args))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Docker command failed: {}", error.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(stdout)
    }

    fn exists_locally(&self, image: &str) -> Result<bool> {
        let filter = format!("reference={}", image);
        let ids = self.run_command(&["image", "ls", "--quiet", "--filter", &filter])?;
        Ok(!ids.trim().is_empty())
    }
}

impl Source for DockerSource {
    fn name(&self) -> &str {
        "docker"
    }

    fn image_labels(&self, image: &str, notifier: &Notifier) -> Result<Labels> {
        // Pulling is slow even for images already present, so look first.
        if self.exists_locally(image)? {
            notifier.debug(&format!("Image {} already exists locally, nothing to pull", image));
        } else {
            notifier.info(&format!("Pulling image {}...", image));
            self.run_command(&["pull", "--quiet", image])
                .context(format!("Failed to pull image {}", image))?;
        }

        let output =
            self.run_command(&["image", "inspect", "--format", "{{json .Config.Labels}}", image])?;
        parse_labels(&output).context(format!("Failed to read labels of image {}", image))
    }
}

fn parse_labels(output: &str) -> Result<Labels> {
    let labels: Option<Labels> = serde_json::from_str(output.trim())?;
    Ok(labels.unwrap_or_default())
}
