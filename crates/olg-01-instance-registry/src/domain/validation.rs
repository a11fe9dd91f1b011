//! # Registration Validation
//!
//! Field rules applied before an instance reaches the store.

use super::errors::RegistryError;
use crate::config::RegistryConfig;
use reqwest::Url;
use shared_crypto::Ed25519PublicKey;
use shared_types::{normalize_domain, InstanceRegistration};

/// Longest accepted name or domain.
pub const MAX_FIELD_LEN: usize = 255;

/// Validate every field of a registration.
pub fn validate_registration(
    registration: &InstanceRegistration,
    config: &RegistryConfig,
) -> Result<(), RegistryError> {
    validate_name(&registration.name)?;
    validate_domain(&registration.domain)?;
    validate_api_url(&registration.api_url, config.require_https)?;
    validate_public_key(&registration.public_key)?;
    Ok(())
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    let name = name.trim();
    if name.is_empty() || name.len() > MAX_FIELD_LEN {
        return Err(RegistryError::InvalidField {
            field: "name",
            reason: format!("must be 1..={MAX_FIELD_LEN} characters"),
        });
    }
    Ok(())
}

/// Domains are host names with an optional port, compared after
/// normalization.
pub fn validate_domain(domain: &str) -> Result<(), RegistryError> {
    let domain = normalize_domain(domain);
    let invalid = |reason: &str| RegistryError::InvalidField {
        field: "domain",
        reason: reason.to_string(),
    };

    if domain.is_empty() || domain.len() > MAX_FIELD_LEN {
        return Err(invalid("must be 1..=255 characters"));
    }

    let (host, port) = match domain.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (domain.as_str(), None),
    };
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(invalid("port must be a number"));
        }
    }
    let labels_ok = host.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return Err(invalid("must be a valid host name"));
    }
    Ok(())
}

/// Only absolute http(s) URLs with a host are accepted.
pub fn validate_api_url(api_url: &str, require_https: bool) -> Result<(), RegistryError> {
    let raw = api_url.trim();
    let invalid = || RegistryError::InvalidApiUrl(raw.to_string());

    let url = Url::parse(raw).map_err(|_| invalid())?;
    match url.scheme() {
        "https" => {}
        "http" if !require_https => {}
        _ => return Err(invalid()),
    }
    // The parser folds `https:///path` into a host named `path`.
    let authority = raw.split_once("://").map(|(_, rest)| rest).unwrap_or_default();
    if authority.starts_with('/') || url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    Ok(())
}

fn validate_public_key(public_key: &str) -> Result<(), RegistryError> {
    Ed25519PublicKey::from_hex(public_key)
        .map(|_| ())
        .map_err(|e| RegistryError::InvalidPublicKey(e.to_string()))
}
