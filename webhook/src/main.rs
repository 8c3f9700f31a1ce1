//! Podgate admission webhook binary.
//!
//! Wires configuration, the registry and trust-authority transports, the
//! validation engine and the admission pipeline, then serves the mutating
//! webhook endpoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use podgate_core::config::{GateConfig, NotaryConfig, ServiceConfig, WebhookConfig};
use podgate_validate::engine::NotaryValidator;
use podgate_validate::oci::{CredentialMap, DistributionTransport};
use podgate_validate::pod::ContainerImageValidator;
use podgate_validate::trust_http::NotaryRepoFactory;

use podgate_webhook::cluster::{ApiServerClient, ClusterClient};
use podgate_webhook::handler::DefaultingWebhook;
use podgate_webhook::server::WebhookServer;

/// Podgate admission webhook
#[derive(Parser, Debug)]
#[command(name = "podgate-webhook", about = "Admission-time image trust validation")]
struct Args {
    /// Address to bind the admission endpoint on.
    #[arg(long, default_value = "0.0.0.0:8443")]
    bind: SocketAddr,

    /// Base URL of the notary server.
    #[arg(long, default_value = "")]
    notary_url: String,

    /// Registry/repository prefixes exempt from trust validation.
    #[arg(long, value_delimiter = ',')]
    allowed_registries: Vec<String>,

    /// Hard per-request deadline, in seconds.
    #[arg(long, default_value_t = 2)]
    timeout_seconds: u64,

    /// YAML configuration file; when set it replaces the flags above.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file mapping registry host to pull credentials.
    #[arg(long)]
    pull_credentials: Option<PathBuf>,

    /// API server URL override (defaults to in-cluster discovery).
    #[arg(long)]
    api_server: Option<String>,

    /// Bearer token for the API server override.
    #[arg(long)]
    api_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GateConfig::from_file(path)?,
        None => GateConfig {
            service: ServiceConfig {
                notary: NotaryConfig {
                    url: args.notary_url.clone(),
                    ..Default::default()
                },
                allowed_registries: args.allowed_registries.clone(),
            },
            webhook: WebhookConfig {
                bind: args.bind.to_string(),
                timeout_secs: args.timeout_seconds,
            },
        },
    };

    let credentials: CredentialMap = match &args.pull_credentials {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => CredentialMap::new(),
    };

    tracing::info!(
        bind = %config.webhook.bind,
        notary = %config.service.notary.url,
        allowed_registries = config.service.allowed_registries.len(),
        timeout_secs = config.webhook.timeout_secs,
        "starting podgate admission webhook"
    );

    let transport = Arc::new(DistributionTransport::new());
    let repo_factory = Arc::new(NotaryRepoFactory::new());
    let engine = Arc::new(NotaryValidator::new(
        config.service.clone(),
        repo_factory,
        transport,
    ));
    let pod_validator = Arc::new(ContainerImageValidator::new(engine, credentials));

    let cluster: Arc<dyn ClusterClient> = match &args.api_server {
        Some(url) => Arc::new(ApiServerClient::new(
            url.clone(),
            args.api_token.clone().unwrap_or_default(),
        )),
        None => Arc::new(ApiServerClient::in_cluster()?),
    };

    let webhook = DefaultingWebhook::new(pod_validator, cluster, config.webhook.timeout());

    let bind: SocketAddr = config.webhook.bind.parse()?;
    WebhookServer::new(bind, webhook).serve().await?;

    Ok(())
}
