//! Registry digest retrieval.
//!
//! `RegistryDigestFetcher` turns an image reference plus an optional
//! credential record into the registry's content digest(s). The wire
//! protocol sits behind the `ManifestTransport` trait;
//! `DistributionTransport` is the production implementation over the
//! `oci-distribution` client.

use std::sync::Arc;

use async_trait::async_trait;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol};
use oci_distribution::manifest::OciManifest;
use oci_distribution::secrets::RegistryAuth as OciRegistryAuth;
use oci_distribution::Reference;
use thiserror::Error;

use podgate_core::error::{GateError, Result};

use super::credentials::{RegistryAuth, RegistryCredentials};
use super::reference::ImageReference;

/// Opaque transport-level failure. Classification into validation-failed
/// versus unknown-result happens in the fetcher, at the point of knowledge.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// A manifest descriptor as observed at the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedManifest {
    /// Single image: its digest plus the digest of its config blob.
    Image {
        digest: String,
        config_digest: String,
    },
    /// Multi-architecture index: the index digest.
    Index { digest: String },
    /// Any other media type.
    Other { media_type: String },
}

/// Anonymous or authenticated manifest fetch by reference.
#[async_trait]
pub trait ManifestTransport: Send + Sync {
    async fn fetch_manifest(
        &self,
        reference: &ImageReference,
        auth: &RegistryAuth,
    ) -> std::result::Result<FetchedManifest, TransportError>;
}

/// Digests retrieved for one image reference, hex-decoded to raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDigests {
    /// Content digest of the image or index.
    pub image: Vec<u8>,
    /// Digest of the image's config blob. Kept only for verification of
    /// images signed under the old scheme; absent for indexes.
    pub manifest_config: Option<Vec<u8>>,
}

/// Fetches registry digests with cluster-like anonymous-first semantics.
pub struct RegistryDigestFetcher {
    transport: Arc<dyn ManifestTransport>,
}

impl RegistryDigestFetcher {
    pub fn new(transport: Arc<dyn ManifestTransport>) -> Self {
        Self { transport }
    }

    /// Retrieve the digests for `reference`.
    ///
    /// The first fetch is always anonymous, mirroring the cluster's pull
    /// path: many public registries allow anonymous reads even when a pull
    /// secret exists. A failed anonymous fetch with no credential for this
    /// registry is indeterminate (the registry may be down or the image may
    /// not exist) and is reported as an unknown result, never as an invalid
    /// image.
    pub async fn fetch(
        &self,
        reference: &ImageReference,
        credential: Option<&RegistryCredentials>,
    ) -> Result<RegistryDigests> {
        let manifest = match self
            .transport
            .fetch_manifest(reference, &RegistryAuth::Anonymous)
            .await
        {
            Ok(manifest) => manifest,
            Err(anonymous_err) => match credential {
                None => {
                    return Err(GateError::UnknownResult(format!(
                        "get image descriptor anonymously: {anonymous_err}"
                    )));
                }
                Some(credential) => {
                    let auth = credential.resolve()?;
                    self.transport
                        .fetch_manifest(reference, &auth)
                        .await
                        .map_err(|e| {
                            GateError::UnknownResult(format!("get image descriptor: {e}"))
                        })?
                }
            },
        };

        match manifest {
            FetchedManifest::Index { digest } => Ok(RegistryDigests {
                image: decode_digest(&digest)?,
                manifest_config: None,
            }),
            FetchedManifest::Image {
                digest,
                config_digest,
            } => Ok(RegistryDigests {
                image: decode_digest(&digest)?,
                manifest_config: Some(decode_digest(&config_digest)?),
            }),
            FetchedManifest::Other { media_type } => Err(GateError::ValidationFailed(format!(
                "not an image or image list: {media_type}"
            ))),
        }
    }
}

/// Hex-decode the part after the algorithm prefix of "algorithm:hex".
///
/// A decode failure here is transport/format corruption from a source that
/// was otherwise answering, not a trust violation.
fn decode_digest(digest: &str) -> Result<Vec<u8>> {
    let hex_part = digest.split_once(':').map(|(_, hex)| hex).unwrap_or(digest);
    hex::decode(hex_part)
        .map_err(|e| GateError::UnknownResult(format!("checksum error for '{digest}': {e}")))
}

/// Production transport over the `oci-distribution` client.
pub struct DistributionTransport {
    client: Client,
}

impl DistributionTransport {
    pub fn new() -> Self {
        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            ..Default::default()
        };
        Self {
            client: Client::new(config),
        }
    }
}

impl Default for DistributionTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestTransport for DistributionTransport {
    async fn fetch_manifest(
        &self,
        reference: &ImageReference,
        auth: &RegistryAuth,
    ) -> std::result::Result<FetchedManifest, TransportError> {
        let oci_ref: Reference = reference
            .full_reference()
            .parse()
            .map_err(|e| TransportError(format!("invalid reference '{reference}': {e}")))?;

        tracing::debug!(reference = %reference, "fetching manifest from registry");

        let (manifest, digest) = self
            .client
            .pull_manifest(&oci_ref, &to_oci_auth(auth))
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(match manifest {
            OciManifest::Image(image) => FetchedManifest::Image {
                digest,
                config_digest: image.config.digest,
            },
            OciManifest::ImageIndex(_) => FetchedManifest::Index { digest },
        })
    }
}

/// Registry tokens ride basic auth with the conventional token username;
/// the distribution client's auth type has no bearer variant.
fn to_oci_auth(auth: &RegistryAuth) -> OciRegistryAuth {
    match auth {
        RegistryAuth::Anonymous => OciRegistryAuth::Anonymous,
        RegistryAuth::Basic(username, password) => {
            OciRegistryAuth::Basic(username.clone(), password.clone())
        }
        RegistryAuth::Bearer(token) => {
            OciRegistryAuth::Basic("<token>".to_string(), token.clone())
        }
    }
}
