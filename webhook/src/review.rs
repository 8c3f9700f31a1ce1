//! Kubernetes admission/v1 review envelope and response builders.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use podgate_core::error::Result;

pub const ADMISSION_REVIEW_API_VERSION: &str = "admission.k8s.io/v1";
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// Group/version/kind of the object under review.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

/// One admission request as delivered by the API server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    /// Raw object under review.
    pub object: Value,
    pub namespace: String,
    pub operation: String,
}

/// Status carried by an admission response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub message: String,
    pub code: u16,
}

/// The webhook's answer for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// base64-encoded JSON patch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

/// Review envelope; requests and responses share it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionReview {
    pub api_version: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

impl AdmissionResponse {
    /// Allow the request unmodified, with an explanatory message.
    pub fn allowed(message: impl Into<String>) -> Self {
        Self {
            allowed: true,
            status: Some(Status {
                message: message.into(),
                code: StatusCode::OK.as_u16(),
            }),
            ..Default::default()
        }
    }

    /// Deny-by-error with an HTTP status code. The platform's default
    /// convention turns this into a denial of the request.
    pub fn errored(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            allowed: false,
            status: Some(Status {
                message: message.into(),
                code: code.as_u16(),
            }),
            ..Default::default()
        }
    }

    /// Build a JSONPatch response as the diff between the original raw
    /// object and its mutated serialization.
    pub fn patched(original: &Value, mutated: &Value) -> Result<Self> {
        let patch = json_patch::diff(original, mutated);
        let patch_json = serde_json::to_vec(&patch)?;
        Ok(Self {
            allowed: true,
            patch: Some(BASE64.encode(&patch_json)),
            patch_type: Some("JSONPatch".to_string()),
            ..Default::default()
        })
    }

    /// Echo the request UID, as the envelope contract requires.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// The decoded patch operations, for consumers and tests.
    pub fn patch_operations(&self) -> Result<Option<Value>> {
        match &self.patch {
            None => Ok(None),
            Some(encoded) => {
                let bytes = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                    podgate_core::error::GateError::SerializationError(format!(
                        "decode patch: {e}"
                    ))
                })?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
        }
    }
}

impl AdmissionReview {
    /// Wrap a response in a v1 review envelope.
    pub fn from_response(response: AdmissionResponse) -> Self {
        Self {
            api_version: ADMISSION_REVIEW_API_VERSION.to_string(),
            kind: ADMISSION_REVIEW_KIND.to_string(),
            request: None,
            response: Some(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_decodes_from_review_payload() {
        let payload = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "namespace": "team-a",
                "operation": "CREATE",
                "object": {"metadata": {"name": "web"}}
            }
        });

        let review: AdmissionReview = serde_json::from_value(payload).unwrap();
        let request = review.request.unwrap();
        assert_eq!(request.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(request.kind.kind, "Pod");
        assert_eq!(request.namespace, "team-a");
        assert_eq!(request.object["metadata"]["name"], "web");
    }

    #[test]
    fn test_errored_carries_code_and_message() {
        let response = AdmissionResponse::errored(StatusCode::REQUEST_TIMEOUT, "too slow");
        assert!(!response.allowed);
        let status = response.status.unwrap();
        assert_eq!(status.code, 408);
        assert_eq!(status.message, "too slow");
    }

    #[test]
    fn test_allowed_has_no_patch() {
        let response = AdmissionResponse::allowed("validation is not enabled for pod");
        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert!(response.patch_type.is_none());
    }

    #[test]
    fn test_patched_diff_is_only_the_label_change() {
        // The original carries fields no typed view models; they must not
        // leak into the patch.
        let original = json!({
            "metadata": {"name": "web", "annotations": {"x": "y"}},
            "spec": {"containers": [{"name": "c", "image": "ghcr.io/a:v1"}], "nodeName": "n1"},
            "status": {"phase": "Pending"}
        });
        let mut mutated = original.clone();
        mutated["metadata"]["labels"] = json!({"pods.podgate.dev/validate": "success"});

        let response = AdmissionResponse::patched(&original, &mutated).unwrap();
        assert!(response.allowed);
        assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));

        let operations = response.patch_operations().unwrap().unwrap();
        let operations = operations.as_array().unwrap();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0]["op"], "add");
        assert_eq!(operations[0]["path"], "/metadata/labels");
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let review = AdmissionReview::from_response(
            AdmissionResponse::patched(&json!({"a": 1}), &json!({"a": 2}))
                .unwrap()
                .with_uid("uid-1"),
        );
        let encoded = serde_json::to_string(&review).unwrap();
        assert!(encoded.contains("\"apiVersion\":\"admission.k8s.io/v1\""));
        assert!(encoded.contains("\"patchType\":\"JSONPatch\""));
        assert!(encoded.contains("\"uid\":\"uid-1\""));
        // No request on outgoing envelopes.
        assert!(!encoded.contains("\"request\""));
    }
}
