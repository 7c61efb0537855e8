//! [`MerchantKey`]: the payment-processing EC private key (P-256).
//!
//! Parsed once at startup and shared read-only by every decryption. Accepts
//! PKCS#8 (`PRIVATE KEY`) and SEC1 (`EC PRIVATE KEY`) PEM; other PEM sections
//! such as `EC PARAMETERS` or certificates are skipped.

use std::io::BufReader;

use p256::{pkcs8::DecodePrivateKey, PublicKey, SecretKey};
use rustls_pki_types::PrivateKeyDer;
use thiserror::Error;

/// Errors produced while parsing merchant key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The PEM text could not be read.
    #[error("unreadable PEM: {0}")]
    Pem(String),

    /// The PEM text contained no private-key section.
    #[error("no private key found in PEM data")]
    NoKey,

    /// A private key was found but it is not an EC key.
    #[error("unsupported private key type: {0}")]
    UnsupportedKeyType(&'static str),

    /// The key DER is not a valid P-256 private key.
    #[error("invalid P-256 private key: {0}")]
    InvalidKey(String),
}

/// The merchant's payment-processing private key.
#[derive(Clone)]
pub struct MerchantKey {
    secret: SecretKey,
}

impl MerchantKey {
    /// Parse a P-256 private key from PEM text.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::NoKey`] if no key section is present,
    /// [`KeyError::UnsupportedKeyType`] for RSA keys, and
    /// [`KeyError::InvalidKey`] if the DER is not a P-256 key.
    pub fn from_pem(pem: &str) -> Result<Self, KeyError> {
        let der = rustls_pemfile::private_key(&mut BufReader::new(pem.as_bytes()))
            .map_err(|e| KeyError::Pem(e.to_string()))?
            .ok_or(KeyError::NoKey)?;

        let secret = match &der {
            PrivateKeyDer::Pkcs8(k) => SecretKey::from_pkcs8_der(k.secret_pkcs8_der())
                .map_err(|e| KeyError::InvalidKey(e.to_string()))?,
            PrivateKeyDer::Sec1(k) => SecretKey::from_sec1_der(k.secret_sec1_der())
                .map_err(|e| KeyError::InvalidKey(e.to_string()))?,
            PrivateKeyDer::Pkcs1(_) => return Err(KeyError::UnsupportedKeyType("RSA")),
            _ => return Err(KeyError::UnsupportedKeyType("unknown")),
        };

        Ok(Self { secret })
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl From<SecretKey> for MerchantKey {
    fn from(secret: SecretKey) -> Self {
        Self { secret }
    }
}

impl std::fmt::Debug for MerchantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("MerchantKey([REDACTED])")
    }
}
