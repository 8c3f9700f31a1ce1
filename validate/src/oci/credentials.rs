//! Registry credential records and authenticator resolution.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use podgate_core::error::{GateError, Result};

/// Pull credentials keyed by registry host. The map does not necessarily
/// contain an entry for the image's registry.
pub type CredentialMap = HashMap<String, RegistryCredentials>;

/// One registry credential record, shaped like a docker config `auths`
/// entry. Any of the fields may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
    /// Pre-issued bearer token for the registry.
    #[serde(rename = "registrytoken")]
    pub registry_token: String,
    /// base64-encoded "username:password".
    pub auth: String,
}

/// Concrete authenticator produced by credential resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryAuth {
    /// No credentials; anonymous pull.
    Anonymous,
    /// HTTP basic authentication.
    Basic(String, String),
    /// Bearer token authentication.
    Bearer(String),
}

impl RegistryCredentials {
    /// Resolve this record into a concrete authenticator.
    ///
    /// Precedence: username+password, then registry token, then the opaque
    /// base64 "username:password" field. Purely a classification/decoding
    /// function; a record matching none of the forms is malformed caller
    /// input, a validation failure.
    pub fn resolve(&self) -> Result<RegistryAuth> {
        if !self.username.is_empty() && !self.password.is_empty() {
            return Ok(RegistryAuth::Basic(
                self.username.clone(),
                self.password.clone(),
            ));
        }

        if !self.registry_token.is_empty() {
            return Ok(RegistryAuth::Bearer(self.registry_token.clone()));
        }

        if !self.auth.is_empty() {
            let decoded = BASE64.decode(self.auth.as_bytes()).map_err(|e| {
                GateError::ValidationFailed(format!("cannot decode base64 encoded auth: {e}"))
            })?;
            let decoded = String::from_utf8(decoded).map_err(|e| {
                GateError::ValidationFailed(format!("cannot decode base64 encoded auth: {e}"))
            })?;

            let pair: Vec<&str> = decoded.split(':').collect();
            if pair.len() != 2 {
                return Err(GateError::ValidationFailed(
                    "invalid auth format, expected username:password form".to_string(),
                ));
            }
            return Ok(RegistryAuth::Basic(pair[0].to_string(), pair[1].to_string()));
        }

        Err(GateError::ValidationFailed(
            "unknown auth secret format".to_string(),
        ))
    }
}
