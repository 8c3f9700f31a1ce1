//! Service configuration.
//!
//! Configuration is constructed once at process start and never mutated.
//! Every component receives its configuration through its constructor; no
//! component reads ambient process state, so tests can run several
//! differently-configured stacks in one process.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{GateError, Result};

fn default_notary_timeout_secs() -> u64 {
    30
}

fn default_webhook_timeout_secs() -> u64 {
    2
}

fn default_bind() -> String {
    "0.0.0.0:8443".to_string()
}

/// Trust authority (notary) connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotaryConfig {
    /// Base URL of the notary server.
    pub url: String,

    /// Request timeout for notary calls, in seconds.
    #[serde(default = "default_notary_timeout_secs")]
    pub timeout_secs: u64,
}

impl NotaryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_notary_timeout_secs(),
        }
    }
}

/// Image validation service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Trust authority connection parameters.
    pub notary: NotaryConfig,

    /// Registry/repository prefixes exempted from trust verification.
    /// An image is allowed iff its full reference starts with one of these;
    /// first match wins.
    #[serde(default)]
    pub allowed_registries: Vec<String>,
}

/// Admission webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Address the admission endpoint binds on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Hard per-request deadline, in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

/// Top-level process configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl GateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| GateError::ConfigError(format!("read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&data)
            .map_err(|e| GateError::ConfigError(format!("parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.webhook.bind, "0.0.0.0:8443");
        assert_eq!(config.webhook.timeout(), Duration::from_secs(2));
        assert_eq!(config.service.notary.timeout(), Duration::from_secs(30));
        assert!(config.service.allowed_registries.is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("podgate.yaml");
        std::fs::write(
            &path,
            r#"
service:
  notary:
    url: https://notary.example.com
    timeout_secs: 10
  allowed_registries:
    - registry.internal.example.com/
    - docker.io/library/
webhook:
  bind: 127.0.0.1:9443
  timeout_secs: 5
"#,
        )
        .unwrap();

        let config = GateConfig::from_file(&path).unwrap();
        assert_eq!(config.service.notary.url, "https://notary.example.com");
        assert_eq!(config.service.notary.timeout(), Duration::from_secs(10));
        assert_eq!(config.service.allowed_registries.len(), 2);
        assert_eq!(config.webhook.bind, "127.0.0.1:9443");
        assert_eq!(config.webhook.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_file_partial_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("podgate.yaml");
        std::fs::write(&path, "service:\n  notary:\n    url: https://n\n").unwrap();

        let config = GateConfig::from_file(&path).unwrap();
        assert_eq!(config.service.notary.url, "https://n");
        assert_eq!(config.service.notary.timeout_secs, 30);
        assert_eq!(config.webhook.timeout_secs, 2);
    }

    #[test]
    fn test_from_file_missing() {
        let result = GateConfig::from_file(Path::new("/nonexistent/podgate.yaml"));
        assert!(matches!(result, Err(GateError::ConfigError(_))));
    }

    #[test]
    fn test_from_file_malformed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("podgate.yaml");
        std::fs::write(&path, "service: [not a mapping").unwrap();
        let result = GateConfig::from_file(&path);
        assert!(matches!(result, Err(GateError::ConfigError(_))));
    }
}
