//! Thin HTTP adapter for a notary-style trust authority.
//!
//! Fetches the repository's TUF targets document and extracts the named
//! target's recorded hashes. This is boundary plumbing only; everything
//! that matters for the verdict (hash count checks, error classification)
//! lives in the engine and the `trust` module.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use podgate_core::config::NotaryConfig;

use crate::trust::{TrustClientError, TrustRepoClient, TrustRepoFactory, TrustTarget};

/// TUF targets document, reduced to the fields the lookup needs.
#[derive(Debug, Deserialize)]
struct TargetsDocument {
    signed: SignedTargets,
}

#[derive(Debug, Deserialize)]
struct SignedTargets {
    #[serde(default)]
    targets: HashMap<String, TargetEntry>,
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    /// Algorithm name to base64-encoded hash.
    #[serde(default)]
    hashes: HashMap<String, String>,
}

/// Factory producing per-repository notary clients.
#[derive(Debug, Default)]
pub struct NotaryRepoFactory;

impl NotaryRepoFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TrustRepoFactory for NotaryRepoFactory {
    async fn new_repo_client(
        &self,
        repository: &str,
        config: &NotaryConfig,
    ) -> std::result::Result<Box<dyn TrustRepoClient>, TrustClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TrustClientError(format!("build notary client: {e}")))?;

        Ok(Box::new(NotaryRepoClient {
            http,
            targets_url: format!(
                "{}/v2/{}/_trust/tuf/targets.json",
                config.url.trim_end_matches('/'),
                repository
            ),
        }))
    }
}

struct NotaryRepoClient {
    http: reqwest::Client,
    targets_url: String,
}

#[async_trait]
impl TrustRepoClient for NotaryRepoClient {
    async fn get_target_by_name(
        &self,
        identifier: &str,
    ) -> std::result::Result<TrustTarget, TrustClientError> {
        let response = self
            .http
            .get(&self.targets_url)
            .send()
            .await
            .map_err(|e| TrustClientError(format!("notary request: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TrustClientError(format!("notary response: {e}")))?;

        if !status.is_success() {
            // The server's own phrasing is preserved so classification of
            // "no trust data" answers keeps working.
            return Err(TrustClientError(format!(
                "notary returned {status}: {}",
                body.trim()
            )));
        }

        let document: TargetsDocument = serde_json::from_str(&body)
            .map_err(|e| TrustClientError(format!("parse targets document: {e}")))?;

        let entry = document.signed.targets.get(identifier).ok_or_else(|| {
            TrustClientError(format!(
                "{} does not have trust data for {identifier}",
                self.targets_url
            ))
        })?;

        let mut hashes = HashMap::new();
        for (algorithm, encoded) in &entry.hashes {
            let bytes = BASE64
                .decode(encoded.as_bytes())
                .map_err(|e| TrustClientError(format!("decode {algorithm} hash: {e}")))?;
            hashes.insert(algorithm.clone(), bytes);
        }

        Ok(TrustTarget { hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::classify_trust_error;

    #[test]
    fn test_targets_document_parses() {
        let body = r#"{
            "signed": {
                "targets": {
                    "v1": {"hashes": {"sha256": "AP8="}, "length": 2}
                }
            },
            "signatures": []
        }"#;
        let document: TargetsDocument = serde_json::from_str(body).unwrap();
        let entry = document.signed.targets.get("v1").unwrap();
        assert_eq!(
            BASE64.decode(entry.hashes["sha256"].as_bytes()).unwrap(),
            vec![0x00, 0xff]
        );
    }

    #[test]
    fn test_missing_target_message_classifies_as_validation_failure() {
        // The message produced for an absent target must match the
        // "no trust data" phrasing contract.
        let err = TrustClientError(format!(
            "{} does not have trust data for {}",
            "https://notary.example.com/v2/ghcr.io/team/app/_trust/tuf/targets.json", "v1"
        ));
        assert!(classify_trust_error(&err).is_validation_failed());
    }
}
