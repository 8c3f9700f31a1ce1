//! The image trust validation engine.
//!
//! Orchestrates the allow-list, reference parsing, trust authority lookup
//! and registry digest fetch into a single verdict per image. The trust
//! lookup runs first on purpose: a cheap "no trust data" failure
//! short-circuits before the more expensive registry round trip.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use subtle::ConstantTimeEq;

use podgate_core::config::ServiceConfig;
use podgate_core::error::{GateError, Result};

use crate::oci::{
    CredentialMap, ImageReference, ManifestTransport, RegistryDigestFetcher, RegistryDigests,
};
use crate::trust::{classify_trust_error, TrustRepoFactory};

/// Validates a single container image reference.
#[async_trait]
pub trait ImageValidator: Send + Sync {
    /// Succeeds iff the image is allow-listed or its registry digest matches
    /// the digest the trust authority recorded for it.
    async fn validate(&self, image: &str, credentials: &CredentialMap) -> Result<()>;
}

/// Notary-backed image validator.
pub struct NotaryValidator {
    config: ServiceConfig,
    repo_factory: Arc<dyn TrustRepoFactory>,
    fetcher: RegistryDigestFetcher,
}

impl NotaryValidator {
    pub fn new(
        config: ServiceConfig,
        repo_factory: Arc<dyn TrustRepoFactory>,
        transport: Arc<dyn ManifestTransport>,
    ) -> Self {
        Self {
            config,
            repo_factory,
            fetcher: RegistryDigestFetcher::new(transport),
        }
    }

    /// Prefix match against the configured allow-list; first match wins.
    fn is_image_allowed(&self, image: &str) -> bool {
        self.config
            .allowed_registries
            .iter()
            .any(|allowed| image.starts_with(allowed.as_str()))
    }

    /// The digest the trust authority recorded for this reference.
    ///
    /// Exactly one recorded hash is accepted. Zero or several cannot be
    /// disambiguated here and fail validation.
    async fn expected_trust_digest(&self, reference: &ImageReference) -> Result<Vec<u8>> {
        let started = Instant::now();
        let result = self.trust_digest_inner(reference).await;
        tracing::debug!(
            image = %reference,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request to notary finished"
        );
        result
    }

    async fn trust_digest_inner(&self, reference: &ImageReference) -> Result<Vec<u8>> {
        let client = self
            .repo_factory
            .new_repo_client(&reference.name(), &self.config.notary)
            .await
            .map_err(|e| GateError::UnknownResult(format!("create trust repo client: {e}")))?;

        let target = client
            .get_target_by_name(reference.identifier())
            .await
            .map_err(|e| classify_trust_error(&e))?;

        if target.hashes.is_empty() {
            return Err(GateError::ValidationFailed(
                "image hash is missing".to_string(),
            ));
        }
        if target.hashes.len() > 1 {
            return Err(GateError::ValidationFailed(
                "more than one hash for image".to_string(),
            ));
        }

        Ok(target.hashes.into_values().next().unwrap_or_default())
    }

    async fn registry_digests(
        &self,
        reference: &ImageReference,
        credentials: &CredentialMap,
    ) -> Result<RegistryDigests> {
        let started = Instant::now();
        let credential = credentials.get(&reference.registry);
        let result = self.fetcher.fetch(reference, credential).await;
        tracing::debug!(
            image = %reference,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request to image registry finished"
        );
        result
    }
}

#[async_trait]
impl ImageValidator for NotaryValidator {
    async fn validate(&self, image: &str, credentials: &CredentialMap) -> Result<()> {
        if self.is_image_allowed(image) {
            tracing::info!(image, "image validation skipped, registry is allow-listed");
            return Ok(());
        }

        let reference = ImageReference::parse(image)?;

        let expected = self.expected_trust_digest(&reference).await?;
        let digests = self.registry_digests(&reference, credentials).await?;

        if bool::from(digests.image.as_slice().ct_eq(expected.as_slice())) {
            return Ok(());
        }

        if let Some(manifest_config) = &digests.manifest_config {
            if bool::from(manifest_config.as_slice().ct_eq(expected.as_slice())) {
                tracing::warn!(image, "deprecated: manifest hash was used for verification");
                return Ok(());
            }
        }

        Err(GateError::ValidationFailed(
            "unexpected image hash value".to_string(),
        ))
    }
}
