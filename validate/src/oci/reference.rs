//! Strict OCI image reference parsing.
//!
//! Admission input must be fully qualified: a registry domain is required,
//! and so is a tag and/or digest. `nginx:latest` is rejected,
//! `docker.io/library/nginx:1.25` is accepted. There is no defaulting of
//! registry or tag; an unqualified reference is a terminal validation
//! failure, never retried.

use podgate_core::error::{GateError, Result};

/// Parsed, strictly validated image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname (e.g. "ghcr.io", "registry.example.com:5000")
    pub registry: String,
    /// Repository path (e.g. "library/nginx", "team/app")
    pub repository: String,
    /// Tag, if present
    pub tag: Option<String>,
    /// Digest ("algorithm:hex"), if present
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string under strict rules.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(GateError::ValidationFailed(
                "empty image reference".to_string(),
            ));
        }

        // Digest comes after the last '@'.
        let (name_tag, digest) = match reference.rsplit_once('@') {
            Some((head, digest_part)) => {
                if !digest_part.contains(':') {
                    return Err(GateError::ValidationFailed(format!(
                        "invalid digest format in reference '{reference}': expected algorithm:hex"
                    )));
                }
                (head, Some(digest_part.to_string()))
            }
            None => (reference, None),
        };

        // Tag is everything after the last ':' that follows the last '/'.
        // A ':' before the last '/' belongs to the registry port.
        let (name, tag) = match name_tag.rfind('/') {
            Some(slash) => match name_tag[slash + 1..].rfind(':') {
                Some(colon) => (
                    &name_tag[..slash + 1 + colon],
                    Some(name_tag[slash + 2 + colon..].to_string()),
                ),
                None => (name_tag, None),
            },
            // No '/' means no registry component; rejected below.
            None => (name_tag, None),
        };

        let (registry, repository) = match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                (first.to_string(), rest.to_string())
            }
            _ => {
                return Err(GateError::ValidationFailed(format!(
                    "image reference '{reference}' must include a registry domain"
                )));
            }
        };

        if repository.is_empty() {
            return Err(GateError::ValidationFailed(format!(
                "empty repository in reference '{reference}'"
            )));
        }

        if let Some(ref t) = tag {
            if t.is_empty() {
                return Err(GateError::ValidationFailed(format!(
                    "empty tag in reference '{reference}'"
                )));
            }
        }

        if tag.is_none() && digest.is_none() {
            return Err(GateError::ValidationFailed(format!(
                "image reference '{reference}' must include a tag or digest"
            )));
        }

        Ok(ImageReference {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// The repository's fully qualified name: "registry/repository".
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// The identifier used for trust lookups: digest when pinned, else tag.
    pub fn identifier(&self) -> &str {
        self.digest
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or_default()
    }

    /// Get the full reference string.
    pub fn full_reference(&self) -> String {
        let mut s = self.name();
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}
