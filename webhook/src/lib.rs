//! Podgate admission webhook.
//!
//! Exposes a single mutating-webhook endpoint that validates the container
//! images of incoming Pods against a trust authority and annotates each Pod
//! with a validation-status label. The decision runs under a hard
//! per-request deadline and never blocks scheduling: a non-compliant Pod is
//! labeled, not rejected, so a downstream enforcement stage can act.

pub mod cluster;
pub mod controller;
pub mod handler;
pub mod review;
pub mod server;

// Re-export commonly used types
pub use cluster::{ApiServerClient, ClusterClient};
pub use handler::{label_for_result, DefaultingWebhook, POD_KIND};
pub use review::{AdmissionRequest, AdmissionResponse, AdmissionReview};
pub use server::{WebhookServer, ADMISSION_PATH};
