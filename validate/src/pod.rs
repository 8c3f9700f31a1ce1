//! Per-pod validation contract.

use std::sync::Arc;

use async_trait::async_trait;

use podgate_core::error::Result;
use podgate_core::k8s::{Namespace, Pod};

use crate::engine::ImageValidator;
use crate::oci::CredentialMap;

/// Outcome of validating one pod (or one container image).
///
/// The variants are declared in dominance order so that `max()` picks the
/// worst result: `Invalid` dominates `ServiceUnavailable`, which dominates
/// `Valid`, which dominates `NoAction`. Callers aggregating per-container
/// results must honor this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationResult {
    /// Validation is not applicable.
    NoAction,
    /// Every checked image is trusted.
    Valid,
    /// Trust status could not be determined (infrastructure fault).
    ServiceUnavailable,
    /// At least one image is untrusted.
    Invalid,
}

impl ValidationResult {
    /// Aggregate results per the dominance order.
    pub fn worst_of(results: impl IntoIterator<Item = ValidationResult>) -> ValidationResult {
        results
            .into_iter()
            .max()
            .unwrap_or(ValidationResult::NoAction)
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAction => write!(f, "no-action"),
            Self::Valid => write!(f, "valid"),
            Self::ServiceUnavailable => write!(f, "service-unavailable"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// Per-pod validation, invoked once per admission request.
#[async_trait]
pub trait PodValidator: Send + Sync {
    async fn validate_pod(&self, pod: &Pod, namespace: &Namespace) -> Result<ValidationResult>;
}

/// Minimal pod validator: every container image is checked by the engine
/// and the worst per-image outcome wins.
///
/// Namespace-level enablement policy is a separate concern and not
/// consulted here; a policy-aware implementation slots in behind the same
/// trait. The namespace argument is threaded through for that purpose.
pub struct ContainerImageValidator {
    validator: Arc<dyn ImageValidator>,
    credentials: CredentialMap,
}

impl ContainerImageValidator {
    pub fn new(validator: Arc<dyn ImageValidator>, credentials: CredentialMap) -> Self {
        Self {
            validator,
            credentials,
        }
    }
}

#[async_trait]
impl PodValidator for ContainerImageValidator {
    async fn validate_pod(&self, pod: &Pod, _namespace: &Namespace) -> Result<ValidationResult> {
        let images = pod.images();
        if images.is_empty() {
            return Ok(ValidationResult::NoAction);
        }

        let mut results = Vec::with_capacity(images.len());
        for image in images {
            let result = match self.validator.validate(image, &self.credentials).await {
                Ok(()) => ValidationResult::Valid,
                Err(e) if e.is_validation_failed() => {
                    tracing::warn!(image, error = %e, "image failed trust validation");
                    ValidationResult::Invalid
                }
                Err(e) => {
                    tracing::warn!(image, error = %e, "image trust validation inconclusive");
                    ValidationResult::ServiceUnavailable
                }
            };
            results.push(result);
        }

        Ok(ValidationResult::worst_of(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podgate_core::error::GateError;
    use podgate_core::k8s::{Container, PodSpec};
    use std::collections::HashMap;

    #[test]
    fn test_dominance_order() {
        assert!(ValidationResult::Invalid > ValidationResult::ServiceUnavailable);
        assert!(ValidationResult::ServiceUnavailable > ValidationResult::Valid);
        assert!(ValidationResult::Valid > ValidationResult::NoAction);
    }

    #[test]
    fn test_worst_of() {
        assert_eq!(
            ValidationResult::worst_of(vec![
                ValidationResult::Valid,
                ValidationResult::Invalid,
                ValidationResult::ServiceUnavailable,
            ]),
            ValidationResult::Invalid
        );
        assert_eq!(
            ValidationResult::worst_of(vec![
                ValidationResult::Valid,
                ValidationResult::ServiceUnavailable,
            ]),
            ValidationResult::ServiceUnavailable
        );
        assert_eq!(
            ValidationResult::worst_of(vec![]),
            ValidationResult::NoAction
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ValidationResult::Invalid.to_string(), "invalid");
        assert_eq!(
            ValidationResult::ServiceUnavailable.to_string(),
            "service-unavailable"
        );
    }

    /// Image validator answering from a fixed per-image table.
    struct TableValidator {
        outcomes: HashMap<String, std::result::Result<(), GateError>>,
    }

    #[async_trait]
    impl ImageValidator for TableValidator {
        async fn validate(&self, image: &str, _credentials: &CredentialMap) -> Result<()> {
            match self.outcomes.get(image) {
                Some(Ok(())) => Ok(()),
                Some(Err(GateError::ValidationFailed(m))) => {
                    Err(GateError::ValidationFailed(m.clone()))
                }
                Some(Err(GateError::UnknownResult(m))) => Err(GateError::UnknownResult(m.clone())),
                _ => Err(GateError::UnknownResult(format!("no outcome for {image}"))),
            }
        }
    }

    fn pod(images: &[&str]) -> Pod {
        Pod {
            spec: PodSpec {
                containers: images
                    .iter()
                    .map(|image| Container {
                        name: "c".to_string(),
                        image: image.to_string(),
                    })
                    .collect(),
                init_containers: vec![],
            },
            ..Default::default()
        }
    }

    fn table(
        entries: Vec<(&str, std::result::Result<(), GateError>)>,
    ) -> ContainerImageValidator {
        ContainerImageValidator::new(
            Arc::new(TableValidator {
                outcomes: entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            }),
            CredentialMap::new(),
        )
    }

    #[tokio::test]
    async fn test_all_valid() {
        let v = table(vec![("ghcr.io/a:v1", Ok(())), ("ghcr.io/b:v1", Ok(()))]);
        let result = v
            .validate_pod(&pod(&["ghcr.io/a:v1", "ghcr.io/b:v1"]), &Namespace::default())
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::Valid);
    }

    #[tokio::test]
    async fn test_invalid_dominates() {
        let v = table(vec![
            ("ghcr.io/a:v1", Ok(())),
            (
                "ghcr.io/b:v1",
                Err(GateError::UnknownResult("registry down".to_string())),
            ),
            (
                "ghcr.io/c:v1",
                Err(GateError::ValidationFailed("bad hash".to_string())),
            ),
        ]);
        let result = v
            .validate_pod(
                &pod(&["ghcr.io/a:v1", "ghcr.io/b:v1", "ghcr.io/c:v1"]),
                &Namespace::default(),
            )
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::Invalid);
    }

    #[tokio::test]
    async fn test_unknown_result_maps_to_service_unavailable() {
        let v = table(vec![(
            "ghcr.io/a:v1",
            Err(GateError::UnknownResult("registry down".to_string())),
        )]);
        let result = v
            .validate_pod(&pod(&["ghcr.io/a:v1"]), &Namespace::default())
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_empty_pod_is_no_action() {
        let v = table(vec![]);
        let result = v
            .validate_pod(&pod(&[]), &Namespace::default())
            .await
            .unwrap();
        assert_eq!(result, ValidationResult::NoAction);
    }
}
