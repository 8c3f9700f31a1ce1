//! Trust authority (notary) interfaces and error classification.
//!
//! The network client is an external collaborator; this module only fixes
//! its contract and decides what its failures mean for the verdict.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use podgate_core::config::NotaryConfig;
use podgate_core::error::GateError;

/// Transport-level failure from the trust authority client.
///
/// Carries the remote message verbatim; `classify_trust_error` decides what
/// it means for the validation verdict.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TrustClientError(pub String);

/// A signed target as recorded by the trust authority.
#[derive(Debug, Clone, Default)]
pub struct TrustTarget {
    /// Recorded hashes keyed by algorithm name, raw bytes.
    pub hashes: HashMap<String, Vec<u8>>,
}

/// Creates trust clients scoped to one repository.
#[async_trait]
pub trait TrustRepoFactory: Send + Sync {
    async fn new_repo_client(
        &self,
        repository: &str,
        config: &NotaryConfig,
    ) -> std::result::Result<Box<dyn TrustRepoClient>, TrustClientError>;
}

/// Looks up recorded targets within one repository.
#[async_trait]
pub trait TrustRepoClient: Send + Sync {
    async fn get_target_by_name(
        &self,
        identifier: &str,
    ) -> std::result::Result<TrustTarget, TrustClientError>;
}

/// Phrasings the trust authority uses to say a repository has no trust
/// data. Compatibility contract with the deployed server; keep the exact
/// substrings until the collaborator grows a typed error channel.
const NO_TRUST_DATA_MARKERS: [&str; 2] =
    ["does not have trust data for", "No valid trust data for"];

/// Classify a trust-authority lookup failure.
///
/// "No trust data" means the image is simply unsigned, a validation
/// failure. Anything else is an infrastructure fault.
pub fn classify_trust_error(err: &TrustClientError) -> GateError {
    let message = err.to_string();
    if NO_TRUST_DATA_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        GateError::ValidationFailed(message)
    } else {
        GateError::UnknownResult(message)
    }
}
