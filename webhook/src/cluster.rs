//! Kubernetes API read seam.
//!
//! The webhook only ever reads: the Namespace of the pod under review and,
//! for the reconciler, ImagePolicy objects. `ApiServerClient` is a thin
//! in-cluster adapter; tests substitute their own `ClusterClient`.

use async_trait::async_trait;

use podgate_core::error::{GateError, Result};
use podgate_core::k8s::{ImagePolicy, Namespace};

/// Read access to the cluster objects podgate needs.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_namespace(&self, name: &str) -> Result<Namespace>;

    async fn get_image_policy(&self, namespace: &str, name: &str) -> Result<ImagePolicy>;
}

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// In-cluster API server client using the mounted service account.
pub struct ApiServerClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiServerClient {
    /// Build a client for the in-cluster API server endpoint, trusting the
    /// cluster CA and authenticating with the service account token.
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            GateError::ClusterError(
                "KUBERNETES_SERVICE_HOST is not set; not running in a cluster".to_string(),
            )
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());

        let token = std::fs::read_to_string(format!("{SERVICE_ACCOUNT_DIR}/token"))
            .map_err(|e| GateError::ClusterError(format!("read service account token: {e}")))?;
        let ca = std::fs::read(format!("{SERVICE_ACCOUNT_DIR}/ca.crt"))
            .map_err(|e| GateError::ClusterError(format!("read cluster ca certificate: {e}")))?;
        let certificate = reqwest::Certificate::from_pem(&ca)
            .map_err(|e| GateError::ClusterError(format!("parse cluster ca certificate: {e}")))?;
        let http = reqwest::Client::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|e| GateError::ClusterError(format!("build api server client: {e}")))?;

        Ok(Self {
            http,
            base_url: format!("https://{host}:{port}"),
            token: token.trim().to_string(),
        })
    }

    /// Build a client against an explicit endpoint (development use).
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GateError::ClusterError(format!("api server request {path}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GateError::ClusterError(format!(
                "api server returned {status} for {path}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GateError::ClusterError(format!("decode api server response {path}: {e}")))
    }
}

#[async_trait]
impl ClusterClient for ApiServerClient {
    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        self.get_json(&format!("/api/v1/namespaces/{name}")).await
    }

    async fn get_image_policy(&self, namespace: &str, name: &str) -> Result<ImagePolicy> {
        self.get_json(&format!(
            "/apis/policy.podgate.dev/v1alpha1/namespaces/{namespace}/imagepolicies/{name}"
        ))
        .await
    }
}
