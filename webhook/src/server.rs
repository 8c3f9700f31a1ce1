//! HTTP bootstrap for the admission endpoint.
//!
//! Plain HTTP; TLS termination is the platform's concern (the webhook runs
//! behind a serving-certificate proxy or sidecar). A well-formed review
//! envelope always gets a 200 answer carrying the admission response; only
//! an unparsable body is rejected at the HTTP level.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};

use crate::handler::DefaultingWebhook;
use crate::review::{AdmissionResponse, AdmissionReview};

/// Path served by the mutating webhook.
pub const ADMISSION_PATH: &str = "/admission/pods";

/// Admission webhook HTTP server.
pub struct WebhookServer {
    bind: SocketAddr,
    webhook: Arc<DefaultingWebhook>,
}

impl WebhookServer {
    pub fn new(bind: SocketAddr, webhook: Arc<DefaultingWebhook>) -> Self {
        Self { bind, webhook }
    }

    /// Start serving admission reviews.
    pub async fn serve(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let webhook = Arc::clone(&self.webhook);
        let make_service = make_service_fn(move |_conn| {
            let webhook = Arc::clone(&webhook);
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    let webhook = Arc::clone(&webhook);
                    async move { Ok::<_, Infallible>(route(webhook, request).await) }
                }))
            }
        });

        tracing::info!(
            bind = %self.bind,
            path = ADMISSION_PATH,
            "admission webhook listening"
        );

        Server::bind(&self.bind).serve(make_service).await?;
        Ok(())
    }
}

pub(crate) async fn route(
    webhook: Arc<DefaultingWebhook>,
    request: Request<Body>,
) -> Response<Body> {
    if request.method() != Method::POST || request.uri().path() != ADMISSION_PATH {
        return plain_response(StatusCode::NOT_FOUND, "not found");
    }

    let body = match hyper::body::to_bytes(request.into_body()).await {
        Ok(body) => body,
        Err(e) => return plain_response(StatusCode::BAD_REQUEST, &format!("read body: {e}")),
    };

    let review: AdmissionReview = match serde_json::from_slice(&body) {
        Ok(review) => review,
        Err(e) => {
            return plain_response(
                StatusCode::BAD_REQUEST,
                &format!("decode admission review: {e}"),
            );
        }
    };

    let Some(admission_request) = review.request else {
        return plain_response(StatusCode::BAD_REQUEST, "admission review carries no request");
    };

    let response = webhook.handle(admission_request).await;
    review_response(response)
}

fn review_response(response: AdmissionResponse) -> Response<Body> {
    let envelope = AdmissionReview::from_response(response);
    match serde_json::to_vec(&envelope) {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap_or_else(|_| Response::new(Body::empty())),
        Err(e) => plain_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("encode admission review: {e}"),
        ),
    }
}

fn plain_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(message.to_string()))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::POD_KIND;
    use async_trait::async_trait;
    use podgate_core::error::Result as GateResult;
    use podgate_core::k8s::{ImagePolicy, Namespace, Pod};
    use podgate_validate::pod::{PodValidator, ValidationResult};
    use serde_json::json;
    use std::time::Duration;

    struct AlwaysValid;

    #[async_trait]
    impl PodValidator for AlwaysValid {
        async fn validate_pod(
            &self,
            _pod: &Pod,
            _namespace: &Namespace,
        ) -> GateResult<ValidationResult> {
            Ok(ValidationResult::Valid)
        }
    }

    struct StubCluster;

    #[async_trait]
    impl crate::cluster::ClusterClient for StubCluster {
        async fn get_namespace(&self, name: &str) -> GateResult<Namespace> {
            Ok(serde_json::from_value(json!({"metadata": {"name": name}})).unwrap())
        }

        async fn get_image_policy(&self, _ns: &str, _name: &str) -> GateResult<ImagePolicy> {
            Ok(ImagePolicy::default())
        }
    }

    fn test_webhook() -> Arc<DefaultingWebhook> {
        DefaultingWebhook::new(
            Arc::new(AlwaysValid),
            Arc::new(StubCluster),
            Duration::from_secs(5),
        )
    }

    fn review_body() -> String {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "u1",
                "kind": {"group": "", "version": "v1", "kind": POD_KIND},
                "namespace": "team-a",
                "operation": "CREATE",
                "object": {
                    "metadata": {"name": "web", "namespace": "team-a"},
                    "spec": {"containers": [{"name": "c", "image": "ghcr.io/team/app:v1"}]}
                }
            }
        })
        .to_string()
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_route_answers_review_envelope() {
        let request = Request::builder()
            .method(Method::POST)
            .uri(ADMISSION_PATH)
            .body(Body::from(review_body()))
            .unwrap();
        let response = route(test_webhook(), request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let envelope = body_json(response).await;
        assert_eq!(envelope["kind"], "AdmissionReview");
        assert_eq!(envelope["response"]["uid"], "u1");
        assert_eq!(envelope["response"]["allowed"], true);
        assert_eq!(envelope["response"]["patchType"], "JSONPatch");
    }

    #[tokio::test]
    async fn test_route_rejects_unknown_path() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/other")
            .body(Body::from(review_body()))
            .unwrap();
        let response = route(test_webhook(), request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_route_rejects_get() {
        let request = Request::builder()
            .method(Method::GET)
            .uri(ADMISSION_PATH)
            .body(Body::empty())
            .unwrap();
        let response = route(test_webhook(), request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_route_rejects_unparsable_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri(ADMISSION_PATH)
            .body(Body::from("{ nope"))
            .unwrap();
        let response = route(test_webhook(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_route_rejects_missing_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri(ADMISSION_PATH)
            .body(Body::from(
                json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"})
                    .to_string(),
            ))
            .unwrap();
        let response = route(test_webhook(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
