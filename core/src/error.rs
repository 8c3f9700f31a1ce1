use thiserror::Error;

/// Podgate error types
///
/// Two classification kinds dominate the validation path and are never
/// reclassified once assigned: `ValidationFailed` means the input or the
/// observed state is definitively untrustworthy, `UnknownResult` means the
/// trust status could not be determined because of an infrastructure fault.
/// Outer layers may add message context but must keep the variant.
#[derive(Error, Debug)]
pub enum GateError {
    /// The input or the observed state is definitively untrustworthy or
    /// malformed (bad image syntax, missing or mismatched trust digest,
    /// malformed credential, unsupported media type). Never retried.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Trust status is indeterminate: registry unreachable, trust authority
    /// unreachable, corrupt digest encoding from a trusted source. Not proof
    /// of a bad image.
    #[error("unknown result: {0}")]
    UnknownResult(String),

    /// Admission request exceeded its deadline.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Kubernetes API interaction failed.
    #[error("cluster error: {0}")]
    ClusterError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl GateError {
    /// True when the image is definitively untrusted or the input malformed.
    pub fn is_validation_failed(&self) -> bool {
        matches!(self, GateError::ValidationFailed(_))
    }

    /// True for indeterminate infrastructure failures.
    pub fn is_unknown_result(&self) -> bool {
        matches!(self, GateError::UnknownResult(_))
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for GateError {
    fn from(err: serde_yaml::Error) -> Self {
        GateError::SerializationError(err.to_string())
    }
}

/// Result type alias for podgate operations
pub type Result<T> = std::result::Result<T, GateError>;
