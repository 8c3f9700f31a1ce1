//! Reconciliation stub for the ImagePolicy resource.

use std::sync::Arc;

use podgate_core::error::Result;

use crate::cluster::ClusterClient;

/// Reconciles ImagePolicy objects.
///
/// Currently a pass-through that only fetches the object; policy
/// synchronization lands behind this entry point.
pub struct ImagePolicyReconciler {
    cluster: Arc<dyn ClusterClient>,
}

impl ImagePolicyReconciler {
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    /// Reconcile one named ImagePolicy.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<()> {
        let policy = self.cluster.get_image_policy(namespace, name).await?;
        tracing::debug!(namespace, name = %policy.metadata.name, "fetched image policy");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use podgate_core::error::GateError;
    use podgate_core::k8s::{ImagePolicy, Namespace};

    struct StubCluster {
        fail: bool,
    }

    #[async_trait]
    impl ClusterClient for StubCluster {
        async fn get_namespace(&self, _name: &str) -> Result<Namespace> {
            Ok(Namespace::default())
        }

        async fn get_image_policy(&self, namespace: &str, name: &str) -> Result<ImagePolicy> {
            if self.fail {
                return Err(GateError::ClusterError("not found".to_string()));
            }
            Ok(serde_json::from_value(serde_json::json!({
                "metadata": {"name": name, "namespace": namespace}
            }))
            .unwrap())
        }
    }

    #[tokio::test]
    async fn test_reconcile_fetches_and_returns() {
        let reconciler = ImagePolicyReconciler::new(Arc::new(StubCluster { fail: false }));
        reconciler.reconcile("team-a", "default-policy").await.unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_propagates_fetch_failure() {
        let reconciler = ImagePolicyReconciler::new(Arc::new(StubCluster { fail: true }));
        let err = reconciler
            .reconcile("team-a", "default-policy")
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::ClusterError(_)));
    }
}
