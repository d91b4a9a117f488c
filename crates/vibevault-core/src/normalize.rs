//! URL normalization
//!
//! A link's `normalized_url` and `domain` are derived once, when the link is
//! created, and never recomputed afterwards.

use url::Url;

use crate::error::{VaultError, VaultResult};

/// Canonical forms derived from a submitted URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// Scheme, host, path and query; fragment removed
    pub normalized: String,
    /// Hostname only (empty for URLs without a host)
    pub domain: String,
}

/// Parse and normalize a raw URL
pub fn normalize_url(raw: &str) -> VaultResult<NormalizedUrl> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(VaultError::Validation("URL is required".to_string()));
    }

    let mut parsed = Url::parse(raw)
        .map_err(|e| VaultError::Validation(format!("Invalid URL format '{}': {}", raw, e)))?;

    let domain = parsed.host_str().unwrap_or_default().to_string();
    parsed.set_fragment(None);

    Ok(NormalizedUrl {
        normalized: parsed.to_string(),
        domain,
    })
}
