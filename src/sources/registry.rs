use anyhow::{Context, Result};
use oci_client::errors::OciDistributionError;
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference};
use std::path::PathBuf;

use super::{labels_from_config, Source};
use crate::credentials::{self, Prompt, TerminalPrompt};
use crate::notifier::Notifier;
use crate::provenance::Labels;

/// OCI Registry implementation of the Source trait.
///
/// Only the manifest and the image configuration are downloaded; labels live
/// in the configuration, so layers are never pulled. Anonymous access is
/// tried first and stored or prompted credentials are used when the registry
/// refuses it.
pub struct RegistrySource {
    client: Client,
    docker_config_path: Option<PathBuf>,
    prompt: Box<dyn Prompt>,
}

impl RegistrySource {
    pub fn new(docker_config_path: Option<PathBuf>) -> Result<Self> {
        Ok(Self::with_prompt(docker_config_path, Box::new(TerminalPrompt)))
    }

    pub fn with_prompt(docker_config_path: Option<PathBuf>, prompt: Box<dyn Prompt>) -> Self {
        Self {
            client: Client::default(),
            docker_config_path,
            prompt,
        }
    }

    async fn pull_config(
        &self,
        image_ref: &Reference,
        auth: &RegistryAuth,
    ) -> Result<String, OciDistributionError> {
        let (_manifest, _digest, config) = self
            .client
            .pull_manifest_and_config(image_ref, auth)
            .await?;
        Ok(config)
    }

    async fn pull_config_with_fallback(
        &self,
        image: &str,
        image_ref: &Reference,
        notifier: &Notifier,
    ) -> Result<String> {
        match self.pull_config(image_ref, &RegistryAuth::Anonymous).await {
            Err(err) if is_unauthorized(&err) => {
                notifier.debug(&format!("Anonymous pull of {} refused: {}", image_ref, err));
                let creds = credentials::resolve_credentials(
                    image,
                    self.docker_config_path.as_deref(),
                    self.prompt.as_ref(),
                )?;
                let auth = RegistryAuth::Basic(creds.username, creds.password);
                self.pull_config(image_ref, &auth)
                    .await
                    .context("Failed to pull image configuration with credentials")
            }
            result => result.context("Failed to pull image configuration from registry"),
        }
    }
}

fn is_unauthorized(err: &OciDistributionError) -> bool {
    matches!(
        err,
        OciDistributionError::AuthenticationFailure(_)
            | OciDistributionError::UnauthorizedError { .. }
    )
}

impl Source for RegistrySource {
    fn name(&self) -> &str {
        "registry"
    }

    fn image_labels(&self, image: &str, notifier: &Notifier) -> Result<Labels> {
        let image_ref = Reference::try_from(image)
            .context(format!("Failed to parse image reference: {}", image))?;

        notifier.info(&format!("Fetching configuration of {}...", image_ref));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create async runtime")?;

        let config = rt.block_on(self.pull_config_with_fallback(image, &image_ref, notifier))?;
        labels_from_config(config.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_errors_trigger_credentials() {
        assert!(is_unauthorized(&OciDistributionError::UnauthorizedError {
            url: "https://quay.io/v2/".to_string(),
        }));
        assert!(is_unauthorized(&OciDistributionError::AuthenticationFailure(
            "denied".to_string()
        )));
        assert!(!is_unauthorized(&OciDistributionError::GenericError(Some(
            "boom".to_string()
        ))));
    }

    #[test]
    fn test_invalid_reference() {
        let source = RegistrySource::new(None).unwrap();
        let notifier = Notifier::new(0);
        assert!(source.image_labels("Not A Valid Ref!", &notifier).is_err());
    }

    #[cfg(feature = "network")]
    #[test]
    fn test_public_image_labels() {
        let source = RegistrySource::new(None).unwrap();
        let notifier = Notifier::new(0);
        let labels = source
            .image_labels("ghcr.io/fluxcd/flux-cli:v2.3.0", &notifier)
            .unwrap();
        assert!(labels.contains_key("org.opencontainers.image.revision"));
    }
}
