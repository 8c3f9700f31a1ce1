//! The bounded-time admission decision pipeline.
//!
//! Four explicit layers, each a plain method taking and returning the same
//! request/response shapes: request-scoped logging context, wall-clock
//! timing, the deadline race, and decode/dispatch. Explicit composition
//! keeps each layer independently testable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;
use serde_json::Value;
use tracing::Instrument;

use podgate_core::error::{GateError, Result};
use podgate_core::k8s::{Namespace, Pod};
use podgate_core::labels::{
    POD_VALIDATION_LABEL, VALIDATION_STATUS_PENDING, VALIDATION_STATUS_REJECT,
    VALIDATION_STATUS_SUCCESS,
};
use podgate_validate::pod::{PodValidator, ValidationResult};

use crate::cluster::ClusterClient;
use crate::review::{AdmissionRequest, AdmissionResponse};

/// The only object kind this webhook mutates.
pub const POD_KIND: &str = "Pod";

/// Mutating admission webhook for pod image trust.
pub struct DefaultingWebhook {
    validator: Arc<dyn PodValidator>,
    cluster: Arc<dyn ClusterClient>,
    timeout: Duration,
}

impl DefaultingWebhook {
    pub fn new(
        validator: Arc<dyn PodValidator>,
        cluster: Arc<dyn ClusterClient>,
        timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            validator,
            cluster,
            timeout,
        })
    }

    /// Entry point for one admission request.
    pub async fn handle(self: &Arc<Self>, request: AdmissionRequest) -> AdmissionResponse {
        let uid = request.uid.clone();
        self.handle_with_logger(request).await.with_uid(uid)
    }

    /// Layer 1: request-scoped logging context.
    async fn handle_with_logger(self: &Arc<Self>, request: AdmissionRequest) -> AdmissionResponse {
        let span = tracing::info_span!("admission", req_id = %request.uid);
        self.handle_with_time_measure(request).instrument(span).await
    }

    /// Layer 2: wall-clock timing, logged regardless of outcome.
    async fn handle_with_time_measure(
        self: &Arc<Self>,
        request: AdmissionRequest,
    ) -> AdmissionResponse {
        tracing::debug!("request handling started");
        let started = Instant::now();
        let response = self.handle_with_timeout(request).await;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request handling finished"
        );
        response
    }

    /// Layer 3: the deadline race.
    ///
    /// The inner handling runs on its own task. If the deadline fires first
    /// the task is abandoned, not cancelled: in-flight registry and trust
    /// authority calls keep running in the background and their result is
    /// discarded.
    async fn handle_with_timeout(
        self: &Arc<Self>,
        request: AdmissionRequest,
    ) -> AdmissionResponse {
        let this = Arc::clone(self);
        let span = tracing::Span::current();
        let mut inner =
            tokio::spawn(async move { this.handle_inner(request).await }.instrument(span));

        tokio::select! {
            finished = &mut inner => finished.unwrap_or_else(|e| {
                AdmissionResponse::errored(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("admission handling task failed: {e}"),
                )
            }),
            _ = tokio::time::sleep(self.timeout) => {
                tracing::info!(
                    timeout = ?self.timeout,
                    "request exceeded desired timeout"
                );
                let err = GateError::Timeout(format!(
                    "request exceeded desired timeout: {:?}",
                    self.timeout
                ));
                AdmissionResponse::errored(StatusCode::REQUEST_TIMEOUT, err.to_string())
            }
        }
    }

    /// Layer 4: decode and dispatch.
    async fn handle_inner(&self, request: AdmissionRequest) -> AdmissionResponse {
        if request.kind.kind != POD_KIND {
            return AdmissionResponse::errored(
                StatusCode::BAD_REQUEST,
                format!(
                    "invalid request kind: {}, expected: {}",
                    request.kind.kind, POD_KIND
                ),
            );
        }

        let pod: Pod = match serde_json::from_value(request.object.clone()) {
            Ok(pod) => pod,
            Err(e) => {
                return AdmissionResponse::errored(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("decode pod object: {e}"),
                );
            }
        };

        let namespace_name = if pod.metadata.namespace.is_empty() {
            request.namespace.clone()
        } else {
            pod.metadata.namespace.clone()
        };
        let namespace: Namespace = match self.cluster.get_namespace(&namespace_name).await {
            Ok(namespace) => namespace,
            Err(e) => {
                return AdmissionResponse::errored(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("get namespace {namespace_name}: {e}"),
                );
            }
        };

        let result = match self.validator.validate_pod(&pod, &namespace).await {
            Ok(result) => result,
            Err(e) => {
                return AdmissionResponse::errored(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    e.to_string(),
                );
            }
        };

        if result == ValidationResult::NoAction {
            return AdmissionResponse::allowed("validation is not enabled for pod");
        }

        match label_pod_response(&request.object, result) {
            Ok(response) => {
                tracing::info!(
                    result = %result,
                    pod = %pod.metadata.name,
                    namespace = %namespace_name,
                    "pod was validated"
                );
                response
            }
            Err(e) => {
                AdmissionResponse::errored(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

/// Label value for a validation result. `NoAction` maps to no label at all;
/// `ServiceUnavailable` maps to pending: indeterminate is flagged, never
/// rejected.
pub fn label_for_result(result: ValidationResult) -> &'static str {
    match result {
        ValidationResult::NoAction => "",
        ValidationResult::Valid => VALIDATION_STATUS_SUCCESS,
        ValidationResult::Invalid => VALIDATION_STATUS_REJECT,
        ValidationResult::ServiceUnavailable => VALIDATION_STATUS_PENDING,
    }
}

/// Clone the raw object, set the validation label, answer with the diff.
///
/// Working on the raw value keeps every field the typed views do not model,
/// so the resulting patch contains exactly the label change.
fn label_pod_response(original: &Value, result: ValidationResult) -> Result<AdmissionResponse> {
    let label = label_for_result(result);
    if label.is_empty() {
        return Ok(AdmissionResponse::allowed(
            "validation is not enabled for pod",
        ));
    }

    let mut labeled = original.clone();
    let metadata = labeled
        .as_object_mut()
        .ok_or_else(|| GateError::SerializationError("pod object is not a JSON object".to_string()))?
        .entry("metadata")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    let labels = metadata
        .as_object_mut()
        .ok_or_else(|| {
            GateError::SerializationError("pod metadata is not a JSON object".to_string())
        })?
        .entry("labels")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    labels
        .as_object_mut()
        .ok_or_else(|| GateError::SerializationError("pod labels are not a JSON object".to_string()))?
        .insert(
            POD_VALIDATION_LABEL.to_string(),
            Value::String(label.to_string()),
        );

    tracing::info!(label, "pod was labeled");
    AdmissionResponse::patched(original, &labeled)
}
