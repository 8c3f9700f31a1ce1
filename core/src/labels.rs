//! Validation label contract stamped onto admitted Pods.

/// Label key carrying the validation verdict.
pub const POD_VALIDATION_LABEL: &str = "pods.podgate.dev/validate";

/// Trust was proven for every checked container image.
pub const VALIDATION_STATUS_SUCCESS: &str = "success";

/// At least one image failed trust verification.
pub const VALIDATION_STATUS_REJECT: &str = "reject";

/// Trust status is indeterminate; a downstream consumer decides.
pub const VALIDATION_STATUS_PENDING: &str = "pending";
