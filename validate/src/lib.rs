//! Image trust validation for podgate.
//!
//! This crate decides, for one container image reference plus optional pull
//! credentials, whether the digest served by the image's registry matches
//! the digest recorded by the trust authority. The flow for a single image:
//!
//! ```text
//! validate(image, credentials)
//!   ├── allow-list prefix match ──────────────► ok (no network)
//!   ├── strict reference parse
//!   ├── trust authority digest    (notary, first: a cheap "no trust data"
//!   │                              failure short-circuits the registry call)
//!   ├── registry digests          (anonymous first, credential retry)
//!   └── constant-time comparison  (+ deprecated manifest-config fallback)
//! ```
//!
//! The registry wire protocol and the trust authority client sit behind the
//! `ManifestTransport` and `TrustRepoFactory` traits so the engine can be
//! exercised hermetically.

pub mod engine;
pub mod oci;
pub mod pod;
pub mod trust;
pub mod trust_http;

// Re-export commonly used types
pub use engine::{ImageValidator, NotaryValidator};
pub use oci::{
    CredentialMap, DistributionTransport, FetchedManifest, ImageReference, ManifestTransport,
    RegistryAuth, RegistryCredentials, RegistryDigestFetcher, RegistryDigests, TransportError,
};
pub use pod::{ContainerImageValidator, PodValidator, ValidationResult};
pub use trust::{
    classify_trust_error, TrustClientError, TrustRepoClient, TrustRepoFactory, TrustTarget,
};
pub use trust_http::NotaryRepoFactory;
