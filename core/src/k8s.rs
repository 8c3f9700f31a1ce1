//! Lightweight read-views of the Kubernetes objects the webhook touches.
//!
//! These are deliberately partial: the webhook only reads names, labels and
//! container images. Any mutation happens on the raw `serde_json::Value`
//! carried by the admission request, so fields outside these views survive
//! the round-trip untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard object metadata, reduced to the fields podgate reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
}

/// A single container entry of a pod spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Container {
    pub name: String,
    pub image: String,
}

/// Pod spec, reduced to its container lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    pub containers: Vec<Container>,
    pub init_containers: Vec<Container>,
}

/// Pod view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Pod {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

impl Pod {
    /// Every container image the pod names, init containers first.
    pub fn images(&self) -> Vec<&str> {
        self.spec
            .init_containers
            .iter()
            .chain(self.spec.containers.iter())
            .map(|c| c.image.as_str())
            .collect()
    }
}

/// Namespace view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Namespace {
    pub metadata: ObjectMeta,
}

/// ImagePolicy custom resource, consumed by the reconciler stub.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePolicy {
    pub metadata: ObjectMeta,
    pub spec: serde_json::Value,
}
