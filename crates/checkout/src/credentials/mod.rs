//! Key and certificate loading.
//!
//! # Lifecycle
//!
//! 1. At startup, [`load`] reads each item from its environment variable, then
//!    falls back to the configured local file.
//! 2. The parsed material is frozen into a [`Credentials`] value and shared
//!    read-only (behind `Arc`) with the decryptor and the session validator.
//! 3. Nothing is reloaded at runtime; a restart picks up new material.
//!
//! # Security invariants
//!
//! - Key material is **never** logged; only its source and presence are.
//! - A missing or unparsable payment-processing key is reported once here as a
//!   warning. Payments still work, through encrypted-token pass-through.

pub mod material;

pub use material::{Credentials, MerchantIdentity};

use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::crypto::{DecryptError, KeyError, MerchantKey};

/// Errors produced while loading credential material.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The value is neither PEM nor base64-wrapped PEM.
    #[error("value is neither PEM nor base64-encoded PEM")]
    NotPem,

    /// The file exists but could not be read.
    #[error("failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Where a piece of material was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Environment(&'static str),
    File(String),
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Environment(var) => write!(f, "env:{var}"),
            Source::File(path) => write!(f, "file:{path}"),
        }
    }
}

/// Load every credential named in `cfg`.
///
/// Never fails: each missing or broken item is logged and left absent.
pub fn load(cfg: &Config) -> Credentials {
    let apple_pay_key = match locate(
        cfg.apple_pay_key.as_deref(),
        "APPLE_PAY_KEY",
        &cfg.apple_pay_key_path,
    ) {
        Ok(Some((pem, source))) => match MerchantKey::from_pem(&pem) {
            Ok(key) => {
                info!(%source, "payment-processing key loaded");
                Some(Arc::new(key))
            }
            Err(e) => {
                warn!(%source, error = %e, "payment-processing key unparsable");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "payment-processing key unreadable");
            None
        }
    };
    if apple_pay_key.is_none() {
        warn!(
            reason = %DecryptError::KeyUnavailable,
            "server-side token decryption disabled; payments will forward the encrypted token"
        );
    }

    let cert = locate_logged(
        cfg.merchant_id_cert.as_deref(),
        "MERCHANT_ID_CERT",
        &cfg.merchant_id_cert_path,
    );
    let key = locate_logged(
        cfg.merchant_id_key.as_deref(),
        "MERCHANT_ID_KEY",
        &cfg.merchant_id_key_path,
    );
    let (cert_found, key_found) = (cert.is_some(), key.is_some());
    let merchant_identity = match (cert, key) {
        (Some(cert_pem), Some(key_pem)) => Some(MerchantIdentity::new(cert_pem, key_pem)),
        (None, None) => None,
        _ => {
            warn!("merchant identity incomplete (need both MERCHANT_ID_CERT and MERCHANT_ID_KEY)");
            None
        }
    };
    if merchant_identity.is_none() {
        warn!("merchant identity not loaded; merchant validation will return mock sessions");
    }

    Credentials::new(apple_pay_key, merchant_identity).with_identity_parts(cert_found, key_found)
}

/// Resolve one item: environment value first, then `path` if it exists.
fn locate(
    env_value: Option<&str>,
    env_name: &'static str,
    path: &str,
) -> Result<Option<(String, Source)>, CredentialError> {
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Ok(Some((decode_pem_value(value)?, Source::Environment(env_name))));
    }
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|e| CredentialError::Unreadable {
        path: path.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(Some((text, Source::File(path.to_owned()))))
}

fn locate_logged(env_value: Option<&str>, env_name: &'static str, path: &str) -> Option<String> {
    match locate(env_value, env_name, path) {
        Ok(Some((pem, source))) => {
            info!(%source, item = env_name, "credential loaded");
            Some(pem)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(item = env_name, error = %e, "credential unreadable");
            None
        }
    }
}

/// Interpret a configuration value as PEM text.
///
/// Inline PEM (containing `-----BEGIN`) is returned as-is; anything else is
/// treated as base64-wrapped PEM. Embedded whitespace in the base64 form is
/// ignored.
pub fn decode_pem_value(value: &str) -> Result<String, CredentialError> {
    if value.contains("-----BEGIN") {
        return Ok(value.replace("\\n", "\n"));
    }
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|_| CredentialError::NotPem)?;
    let text = String::from_utf8(bytes).map_err(|_| CredentialError::NotPem)?;
    if !text.contains("-----BEGIN") {
        return Err(CredentialError::NotPem);
    }
    Ok(text)
}
