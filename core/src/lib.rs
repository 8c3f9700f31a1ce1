//! Podgate Core - Foundational Types and Abstractions
//!
//! This crate provides the foundational types shared across the podgate
//! workspace: the error model, service configuration, the validation label
//! contract, and lightweight views of the Kubernetes objects the webhook
//! touches.

pub mod config;
pub mod error;
pub mod k8s;
pub mod labels;

// Re-export commonly used types
pub use config::{GateConfig, NotaryConfig, ServiceConfig, WebhookConfig};
pub use error::{GateError, Result};

/// Podgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
